use super::Error;

/// Allowance for the signature, control block and envelope framing.
pub const WITNESS_PADDING: u64 = 100;
/// Allowance for the non-witness part of the reveal transaction.
pub const TX_OVERHEAD: u64 = 200;

/// Linear reveal fee: `ceil((content + padding + overhead) * rate / 4)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn reveal_fee(content_len: usize, fee_rate: f64) -> Result<u64, Error> {
  if !fee_rate.is_finite() || fee_rate <= 0.0 {
    return Err(Error::InvalidFeeRate(fee_rate));
  }

  let size = content_len as u64 + WITNESS_PADDING + TX_OVERHEAD;

  Ok(((size as f64 * fee_rate) / 4.0).ceil() as u64)
}

/// Amount the funding address has to receive so that the reveal output,
/// after the fee is taken, stays strictly above the dust limit and never
/// drops below a floor of two dust outputs.
pub fn required_amount(fee: u64, dust_limit: u64) -> u64 {
  fee.saturating_add(dust_limit).max(dust_limit.saturating_mul(2)).saturating_add(1)
}
