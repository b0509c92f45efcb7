/// Caller or data-integrity errors raised by the transaction engine. None of
/// these are retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
  #[error("invalid key encoding: {0}")]
  InvalidKeyEncoding(String),

  #[error("invalid key length: {0} bytes (must be 32)")]
  InvalidKeyLength(usize),

  #[error(
    "output amount ({funded} - {fee} sats) below dust limit ({dust_limit} sats)"
  )]
  DustOutput { funded: u64, fee: u64, dust_limit: u64 },

  #[error("invalid address {address}: {message}")]
  InvalidAddress { address: String, message: String },

  #[error("invalid fee rate {0}: must be a positive finite number")]
  InvalidFeeRate(f64),

  #[error("invalid txid {txid}: {message}")]
  InvalidTxid { txid: String, message: String },

  #[error("script construction failed: {0}")]
  Script(String),

  #[error("taproot construction failed: {0}")]
  Taproot(String),

  #[error("signing failed: {0}")]
  Signing(String),
}
