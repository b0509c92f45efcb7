use bitcoin::blockdata::constants::COIN_VALUE;

const MAX_MONEY_BTC: f64 = 21_000_000.0;

/// Converts a node-reported BTC amount to satoshis, rounding half up.
///
/// Returns `None` for negative, non-finite or larger than max money inputs.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn btc_to_sats(btc: f64) -> Option<u64> {
  if !btc.is_finite() || !(0.0..=MAX_MONEY_BTC).contains(&btc) {
    return None;
  }

  Some((btc * COIN_VALUE as f64 + 0.5).floor() as u64)
}

#[allow(clippy::cast_precision_loss)]
pub fn sats_to_btc(sats: u64) -> f64 {
  sats as f64 / COIN_VALUE as f64
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn btc_to_sats_rounds_to_nearest() {
    assert_eq!(btc_to_sats(0.0), Some(0));
    assert_eq!(btc_to_sats(1.0), Some(100_000_000));
    assert_eq!(btc_to_sats(0.00001093), Some(1093));
    assert_eq!(btc_to_sats(0.1 + 0.2), Some(30_000_000));
    assert_eq!(btc_to_sats(21_000_000.0), Some(2_100_000_000_000_000));
  }

  #[test]
  fn btc_to_sats_rounds_half_up() {
    assert_eq!(btc_to_sats(0.00001092999), Some(1093));
    assert_eq!(btc_to_sats(0.0000109249), Some(1092));
    assert_eq!(btc_to_sats(0.000000006), Some(1));
    assert_eq!(btc_to_sats(0.000000004), Some(0));
  }

  #[test]
  fn btc_to_sats_rejects_invalid() {
    assert_eq!(btc_to_sats(-0.00000001), None);
    assert_eq!(btc_to_sats(f64::NAN), None);
    assert_eq!(btc_to_sats(f64::INFINITY), None);
    assert_eq!(btc_to_sats(21_000_000.1), None);
  }

  #[test]
  fn sats_to_btc_is_exact() {
    assert_eq!(sats_to_btc(100_000_000), 1.0);
    assert_eq!(sats_to_btc(546), 0.00000546);
    assert_eq!(btc_to_sats(sats_to_btc(1093)), Some(1093));
  }
}
