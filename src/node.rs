//! Typed access to the full node's JSON-RPC interface. Each call returns
//! `Result<_, RpcError>`; nothing panics or escapes past this boundary.

use bitcoin::{BlockHash, Txid};

pub use self::{
  client::{BitcoinRpcClient, NodeClientConfig},
  error::RpcError,
  types::{BlockHeader, HashOrHeight, RescanResult, UnspentOutput},
};

mod client;
mod error;
mod types;

pub trait NodeRpc: Send + Sync {
  /// With `descriptors` set the wallet is blank, descriptor based and has
  /// private keys disabled, which is what a watch-only wallet needs.
  fn create_wallet(&self, wallet: &str, descriptors: bool) -> Result<(), RpcError>;

  /// Succeeds when the wallet is already loaded.
  fn load_wallet(&self, wallet: &str) -> Result<(), RpcError>;

  fn unload_wallet(&self, wallet: &str) -> Result<(), RpcError>;

  fn list_wallets(&self) -> Result<Vec<String>, RpcError>;

  fn get_descriptor_checksum(&self, descriptor: &str) -> Result<String, RpcError>;

  /// Imports an already checksummed descriptor, inactive and labeled after
  /// the wallet.
  fn import_descriptors(&self, wallet: &str, descriptor: &str) -> Result<(), RpcError>;

  /// Watches `address` from `wallet`: `addr(<address>)#<checksum>`.
  fn import_descriptor(&self, address: &str, wallet: &str) -> Result<(), RpcError> {
    let descriptor = format!("addr({address})");
    let checksum = self.get_descriptor_checksum(&descriptor)?;
    self.import_descriptors(wallet, &format!("{descriptor}#{checksum}"))
  }

  /// Balance in BTC, unconfirmed and watch-only included.
  fn get_balance(&self, wallet: &str) -> Result<f64, RpcError>;

  fn list_unspent(&self, wallet: &str, addresses: &[String])
    -> Result<Vec<UnspentOutput>, RpcError>;

  fn get_block_count(&self) -> Result<u64, RpcError>;

  fn get_block_hash(&self, height: u64) -> Result<BlockHash, RpcError>;

  fn get_block_header(&self, block: HashOrHeight) -> Result<BlockHeader, RpcError>;

  fn rescan_from_height(&self, wallet: &str, height: u64) -> Result<RescanResult, RpcError>;

  fn broadcast_raw_transaction(&self, hex: &str) -> Result<Txid, RpcError>;
}

impl<T: NodeRpc + ?Sized> NodeRpc for std::sync::Arc<T> {
  fn create_wallet(&self, wallet: &str, descriptors: bool) -> Result<(), RpcError> {
    (**self).create_wallet(wallet, descriptors)
  }

  fn load_wallet(&self, wallet: &str) -> Result<(), RpcError> {
    (**self).load_wallet(wallet)
  }

  fn unload_wallet(&self, wallet: &str) -> Result<(), RpcError> {
    (**self).unload_wallet(wallet)
  }

  fn list_wallets(&self) -> Result<Vec<String>, RpcError> {
    (**self).list_wallets()
  }

  fn get_descriptor_checksum(&self, descriptor: &str) -> Result<String, RpcError> {
    (**self).get_descriptor_checksum(descriptor)
  }

  fn import_descriptors(&self, wallet: &str, descriptor: &str) -> Result<(), RpcError> {
    (**self).import_descriptors(wallet, descriptor)
  }

  fn import_descriptor(&self, address: &str, wallet: &str) -> Result<(), RpcError> {
    (**self).import_descriptor(address, wallet)
  }

  fn get_balance(&self, wallet: &str) -> Result<f64, RpcError> {
    (**self).get_balance(wallet)
  }

  fn list_unspent(
    &self,
    wallet: &str,
    addresses: &[String],
  ) -> Result<Vec<UnspentOutput>, RpcError> {
    (**self).list_unspent(wallet, addresses)
  }

  fn get_block_count(&self) -> Result<u64, RpcError> {
    (**self).get_block_count()
  }

  fn get_block_hash(&self, height: u64) -> Result<BlockHash, RpcError> {
    (**self).get_block_hash(height)
  }

  fn get_block_header(&self, block: HashOrHeight) -> Result<BlockHeader, RpcError> {
    (**self).get_block_header(block)
  }

  fn rescan_from_height(&self, wallet: &str, height: u64) -> Result<RescanResult, RpcError> {
    (**self).rescan_from_height(wallet, height)
  }

  fn broadcast_raw_transaction(&self, hex: &str) -> Result<Txid, RpcError> {
    (**self).broadcast_raw_transaction(hex)
  }
}
