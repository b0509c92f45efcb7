use {
  bitcoin::{BlockHash, Txid},
  serde::{Deserialize, Serialize},
  std::fmt::{self, Display, Formatter},
};

/// Entry of `listunspent`. `amount` is in BTC exactly as the node reports it;
/// convert with [`crate::codec::btc_to_sats`] before comparing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnspentOutput {
  pub txid: Txid,
  pub vout: u32,
  #[serde(default)]
  pub address: Option<String>,
  pub amount: f64,
  pub confirmations: i64,
  #[serde(rename = "scriptPubKey", default)]
  pub script_pub_key: String,
  #[serde(default)]
  pub spendable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
  pub hash: BlockHash,
  pub height: u64,
  pub time: i64,
  #[serde(rename = "previousblockhash", default)]
  pub previous_block_hash: Option<BlockHash>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescanResult {
  pub start_height: u64,
  #[serde(default)]
  pub stop_height: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashOrHeight {
  Hash(BlockHash),
  Height(u64),
}

impl Display for HashOrHeight {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self {
      Self::Hash(hash) => write!(f, "{hash}"),
      Self::Height(height) => write!(f, "{height}"),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DescriptorInfo {
  pub(crate) checksum: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ImportDescriptorResult {
  pub(crate) success: bool,
  #[serde(default)]
  pub(crate) error: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unspent_output_from_node_json() {
    let utxo: UnspentOutput = serde_json::from_str(
      r#"{
        "txid": "1111111111111111111111111111111111111111111111111111111111111111",
        "vout": 1,
        "address": "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx",
        "label": "api_server_insc_wallet_1_lbl",
        "scriptPubKey": "0014751e76e8199196d454941c45d1b3a323f1433bd6",
        "amount": 0.00001093,
        "confirmations": 0,
        "spendable": false,
        "solvable": false,
        "safe": true
      }"#,
    )
    .unwrap();

    assert_eq!(utxo.vout, 1);
    assert_eq!(utxo.amount, 0.00001093);
    assert_eq!(utxo.confirmations, 0);
    assert_eq!(
      utxo.address.as_deref(),
      Some("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx")
    );
  }

  #[test]
  fn block_header_from_node_json() {
    let header: BlockHeader = serde_json::from_str(
      r#"{
        "hash": "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f4943",
        "confirmations": 2500000,
        "height": 0,
        "version": 1,
        "time": 1296688602,
        "nonce": 414098458,
        "bits": "1d00ffff",
        "difficulty": 1
      }"#,
    )
    .unwrap();

    assert_eq!(header.height, 0);
    assert_eq!(header.time, 1_296_688_602);
    assert_eq!(header.previous_block_hash, None);
  }
}
