//! Encodings shared by the transaction engine and the reconciler: private
//! key import/export, content type sniffing and amount conversion.

pub mod amount;
pub mod key;
pub mod media;

pub use self::{
  amount::{btc_to_sats, sats_to_btc},
  key::{x_only_public_key, KeyPair},
  media::sniff_content_type,
};
