use crate::{engine, inscription::Status, node::RpcError, store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Step {
  #[display(fmt = "wallet creation")]
  CreateWallet,
  #[display(fmt = "wallet load")]
  LoadWallet,
  #[display(fmt = "descriptor import")]
  ImportDescriptor,
  #[display(fmt = "balance query")]
  Balance,
  #[display(fmt = "utxo listing")]
  ListUnspent,
  #[display(fmt = "rescan")]
  Rescan,
  #[display(fmt = "block height query")]
  BlockHeight,
  #[display(fmt = "block search")]
  BlockSearch,
  #[display(fmt = "broadcast")]
  Broadcast,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] engine::Error),

  #[error("{step} failed{}: {source}", wallet_suffix(.wallet))]
  Rpc {
    step: Step,
    wallet: Option<String>,
    source: RpcError,
  },

  #[error("inscription {id} is being scanned, try again later")]
  StateConflict { id: u64 },

  #[error("inscription {id} changed to {status} by another request")]
  ConcurrentUpdate { id: u64, status: Status },

  #[error("inscription {id} cannot move from {from} to {to}")]
  InvalidTransition { id: u64, from: Status, to: Status },

  #[error("{what} {id} not found")]
  NotFound { what: &'static str, id: u64 },

  #[error("content for inscription {id} does not match the committed content")]
  ContentMismatch { id: u64 },

  #[error("inscription {id}: {field} does not match the stored record")]
  OwnershipMismatch { id: u64, field: &'static str },

  #[error("invalid request: {0}")]
  InvalidRequest(String),

  #[error("block chain consistency check failed: {0}")]
  Consistency(String),

  #[error(transparent)]
  Store(#[from] store::Error),
}

impl Error {
  pub(crate) fn rpc(step: Step, wallet: Option<&str>) -> impl FnOnce(RpcError) -> Self {
    let wallet = wallet.map(str::to_owned);
    move |source| Self::Rpc {
      step,
      wallet,
      source,
    }
  }

  pub(crate) fn inscription_not_found(id: u64) -> Self {
    Self::NotFound {
      what: "inscription",
      id,
    }
  }
}

fn wallet_suffix(wallet: &Option<String>) -> String {
  wallet
    .as_ref()
    .map(|wallet| format!(" for wallet `{wallet}`"))
    .unwrap_or_default()
}
