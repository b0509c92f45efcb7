use {
  bitcoincore_rpc::jsonrpc,
  std::fmt::{self, Display, Formatter},
};

const RPC_WALLET_ALREADY_LOADED: i32 = -35;
const RPC_WALLET_ERROR: i32 = -4;
const RPC_VERIFY_ALREADY_IN_CHAIN: i32 = -27;
const RPC_IN_WARMUP: i32 = -28;
const HTTP_SERVICE_UNAVAILABLE: u16 = 503;

/// Every node failure, whatever layer it came from, normalized into one
/// record. Benign outcomes are classified by the predicates below and decided
/// at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
  pub method: String,
  pub wallet: Option<String>,
  pub code: Option<i32>,
  pub message: String,
  pub http_status: Option<u16>,
  /// No response arrived at all: refused, reset or timed out.
  pub unreachable: bool,
  pub raw: Option<String>,
}

impl RpcError {
  pub fn new(method: &str, wallet: Option<&str>, message: impl Into<String>) -> Self {
    Self {
      method: method.into(),
      wallet: wallet.map(Into::into),
      code: None,
      message: message.into(),
      http_status: None,
      unreachable: false,
      raw: None,
    }
  }

  pub fn with_code(mut self, code: i32) -> Self {
    self.code = Some(code);
    self
  }

  pub fn unreachable(mut self) -> Self {
    self.unreachable = true;
    self
  }

  pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
    self.raw = Some(raw.into());
    self
  }

  pub(crate) fn from_client(method: &str, wallet: Option<&str>, error: bitcoincore_rpc::Error) -> Self {
    let mut normalized = Self::new(method, wallet, error.to_string());

    match &error {
      bitcoincore_rpc::Error::JsonRpc(jsonrpc::Error::Rpc(rpc)) => {
        normalized.code = Some(rpc.code);
        normalized.message = rpc.message.clone();
        normalized.raw = Some(format!("{rpc:?}"));
      }
      bitcoincore_rpc::Error::JsonRpc(jsonrpc::Error::Transport(transport)) => {
        match transport.downcast_ref::<jsonrpc::simple_http::Error>() {
          Some(jsonrpc::simple_http::Error::HttpErrorCode(status)) => {
            normalized.http_status = Some(*status);
          }
          Some(jsonrpc::simple_http::Error::SocketError(_)) => normalized.unreachable = true,
          _ => {}
        }
        normalized.raw = Some(format!("{error:?}"));
      }
      bitcoincore_rpc::Error::Io(_) => {
        normalized.unreachable = true;
        normalized.raw = Some(format!("{error:?}"));
      }
      _ => normalized.raw = Some(format!("{error:?}")),
    }

    normalized
  }

  /// `loadwallet` on a wallet that is already loaded.
  pub fn is_already_loaded(&self) -> bool {
    self.code == Some(RPC_WALLET_ALREADY_LOADED) || self.message.contains("already loaded")
  }

  /// `createwallet` on a wallet whose database is already on disk.
  pub fn is_already_exists(&self) -> bool {
    (self.code == Some(RPC_WALLET_ERROR) || self.code.is_none())
      && self.message.contains("already exists")
  }

  /// `sendrawtransaction` for a transaction that has already confirmed.
  pub fn is_already_in_chain(&self) -> bool {
    self.code == Some(RPC_VERIFY_ALREADY_IN_CHAIN)
      || self.message.contains("already in block chain")
      || self.message.contains("already in utxo set")
  }

  /// Failures worth another attempt for idempotent calls: the node could
  /// not be reached or is still starting up. Rejected credentials and
  /// undecodable responses are final.
  pub fn is_transient(&self) -> bool {
    self.unreachable
      || self.code == Some(RPC_IN_WARMUP)
      || self.http_status == Some(HTTP_SERVICE_UNAVAILABLE)
  }
}

impl Display for RpcError {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "`{}`", self.method)?;

    if let Some(wallet) = &self.wallet {
      write!(f, " on wallet `{wallet}`")?;
    }

    write!(f, " failed")?;

    if let Some(code) = self.code {
      write!(f, " with code {code}")?;
    }

    if let Some(status) = self.http_status {
      write!(f, " (http {status})")?;
    }

    write!(f, ": {}", self.message)
  }
}

impl std::error::Error for RpcError {}
