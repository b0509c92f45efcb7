//! A stand-in `bitcoind` speaking JSON-RPC over HTTP, covering the wallet,
//! chain and mempool calls the inscriber makes. Every request is recorded
//! with its wallet endpoint and raw positional params.

use {
  self::{
    server::Wallet,
    state::{State, Utxo},
  },
  bitcoin::{hashes::Hash, OutPoint, Transaction, Txid},
  jsonrpc_http_server::{CloseHandle, ServerBuilder},
  std::{
    sync::{Arc, Mutex, MutexGuard},
    thread,
  },
};

pub use self::state::Call;

mod server;
mod state;

pub const GENESIS_TIME: i64 = 1_600_000_000;
pub const BLOCK_INTERVAL: i64 = 600;

pub fn builder() -> Builder {
  Builder { height: 100 }
}

pub fn spawn() -> Handle {
  builder().build()
}

pub struct Builder {
  height: u64,
}

impl Builder {
  pub fn height(self, height: u64) -> Self {
    Self { height }
  }

  pub fn build(self) -> Handle {
    let state = Arc::new(Mutex::new(State::new(self.height)));

    let server = ServerBuilder::with_meta_extractor(server::io(state.clone()), Wallet::from_request)
      .threads(1)
      .start_http(&"127.0.0.1:0".parse().unwrap())
      .unwrap();

    let close_handle = server.close_handle();
    let port = server.address().port();

    thread::spawn(|| server.wait());

    Handle {
      close_handle: Some(close_handle),
      port,
      state,
    }
  }
}

pub struct Handle {
  close_handle: Option<CloseHandle>,
  port: u16,
  state: Arc<Mutex<State>>,
}

impl Handle {
  fn state(&self) -> MutexGuard<State> {
    self.state.lock().unwrap()
  }

  pub fn url(&self) -> String {
    format!("http://127.0.0.1:{}", self.port)
  }

  pub fn height(&self) -> u64 {
    self.state().height
  }

  /// Extends the chain and confirms everything waiting in the mempool.
  pub fn mine(&self, blocks: u64) {
    let mut state = self.state();
    let next = state.height + 1;
    state.height += blocks;
    for utxo in &mut state.utxos {
      utxo.height.get_or_insert(next);
    }
  }

  /// Sends `sats` to `address` in an unconfirmed transaction.
  pub fn pay(&self, address: &str, sats: u64) -> OutPoint {
    let mut state = self.state();

    let n = u8::try_from(state.utxos.len() + 1).unwrap();
    let outpoint = OutPoint {
      txid: Txid::from_byte_array([n; 32]),
      vout: 1,
    };

    state.utxos.push(Utxo {
      outpoint,
      address: address.into(),
      sats,
      height: None,
    });

    outpoint
  }

  pub fn calls(&self) -> Vec<Call> {
    self.state().calls.clone()
  }

  pub fn calls_to(&self, method: &str) -> Vec<Call> {
    self
      .calls()
      .into_iter()
      .filter(|call| call.method == method)
      .collect()
  }

  pub fn broadcasts(&self) -> Vec<Transaction> {
    self.state().broadcasts.clone()
  }

  pub fn loaded_wallets(&self) -> Vec<String> {
    self.state().loaded_wallets()
  }

  /// Wallet names `bitcoind` has on disk, loaded or not.
  pub fn wallets(&self) -> Vec<String> {
    self.state().wallets.keys().cloned().collect()
  }

  pub fn reject_broadcasts(&self, rejected: bool) {
    self.state().reject_broadcasts = rejected;
  }

  /// Answers the next `times` calls to `method` with an RPC error.
  pub fn fail(&self, method: &str, code: i64, message: &str, times: usize) {
    self
      .state()
      .failures
      .push((method.into(), code, message.into(), times));
  }

  /// The checksum `getdescriptorinfo` reports for `descriptor`.
  pub fn checksum(descriptor: &str) -> String {
    state::checksum(descriptor)
  }
}

impl Drop for Handle {
  fn drop(&mut self) {
    if let Some(close_handle) = self.close_handle.take() {
      close_handle.close();
    }
  }
}
