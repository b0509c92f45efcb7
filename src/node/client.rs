use {
  super::{
    types::{DescriptorInfo, ImportDescriptorResult},
    BlockHeader, HashOrHeight, NodeRpc, RescanResult, RpcError, UnspentOutput,
  },
  bitcoin::{BlockHash, Txid},
  bitcoincore_rpc::{Auth, Client, RpcApi},
  serde::de::DeserializeOwned,
  serde_json::{json, Value},
  std::{thread, time::Duration},
};

const MAX_CONFIRMATIONS: u64 = 9_999_999;

#[derive(Debug, Clone)]
pub struct NodeClientConfig {
  pub rpc_url: String,
  pub auth: Auth,
  /// Extra attempts for idempotent calls (wallet load, descriptor import).
  pub retries: u32,
  pub retry_delay: Duration,
}

/// [`NodeRpc`] over bitcoind's JSON-RPC. Wallet scoped calls go to
/// `<rpc_url>/wallet/<name>`.
pub struct BitcoinRpcClient {
  config: NodeClientConfig,
  client: Client,
}

impl BitcoinRpcClient {
  pub fn new(config: NodeClientConfig) -> Result<Self, RpcError> {
    let client = Self::connect(&config.rpc_url, &config.auth)
      .map_err(|err| RpcError::from_client("connect", None, err))?;

    Ok(Self { config, client })
  }

  fn connect(url: &str, auth: &Auth) -> bitcoincore_rpc::Result<Client> {
    Client::new(url, auth.clone())
  }

  fn wallet_client(&self, wallet: &str) -> Result<Client, RpcError> {
    let url = format!("{}/wallet/{wallet}", self.config.rpc_url.trim_end_matches('/'));
    Self::connect(&url, &self.config.auth)
      .map_err(|err| RpcError::from_client("connect", Some(wallet), err))
  }

  fn call<T: DeserializeOwned>(
    &self,
    wallet: Option<&str>,
    method: &str,
    args: &[Value],
  ) -> Result<T, RpcError> {
    log::trace!("rpc {method} {args:?}");

    let result = match wallet {
      Some(wallet) => self.wallet_client(wallet)?.call(method, args),
      None => self.client.call(method, args),
    };

    result.map_err(|err| RpcError::from_client(method, wallet, err))
  }

  fn retry<T>(&self, mut f: impl FnMut() -> Result<T, RpcError>) -> Result<T, RpcError> {
    let mut attempt = 0;

    loop {
      match f() {
        Ok(value) => return Ok(value),
        Err(err) if attempt < self.config.retries && err.is_transient() => {
          attempt += 1;
          log::warn!(
            "{err}, retrying ({attempt}/{}) in {:?}",
            self.config.retries,
            self.config.retry_delay
          );
          thread::sleep(self.config.retry_delay);
        }
        Err(err) => return Err(err),
      }
    }
  }
}

impl NodeRpc for BitcoinRpcClient {
  fn create_wallet(&self, wallet: &str, descriptors: bool) -> Result<(), RpcError> {
    self.call::<Value>(
      None,
      "createwallet",
      &[
        json!(wallet),
        json!(descriptors),
        json!(descriptors),
        json!(""),
        json!(false),
        json!(descriptors),
      ],
    )?;
    Ok(())
  }

  fn load_wallet(&self, wallet: &str) -> Result<(), RpcError> {
    match self.retry(|| self.call::<Value>(None, "loadwallet", &[json!(wallet)])) {
      Ok(_) => Ok(()),
      Err(err) if err.is_already_loaded() => Ok(()),
      Err(err) => Err(err),
    }
  }

  fn unload_wallet(&self, wallet: &str) -> Result<(), RpcError> {
    self.call::<Value>(None, "unloadwallet", &[json!(wallet)])?;
    Ok(())
  }

  fn list_wallets(&self) -> Result<Vec<String>, RpcError> {
    self.call(None, "listwallets", &[])
  }

  fn get_descriptor_checksum(&self, descriptor: &str) -> Result<String, RpcError> {
    Ok(
      self
        .call::<DescriptorInfo>(None, "getdescriptorinfo", &[json!(descriptor)])?
        .checksum,
    )
  }

  fn import_descriptors(&self, wallet: &str, descriptor: &str) -> Result<(), RpcError> {
    let request = json!([{
      "desc": descriptor,
      "active": false,
      "label": format!("{wallet}_lbl"),
      "timestamp": "now",
      "internal": false,
    }]);

    let results = self.retry(|| {
      self.call::<Vec<ImportDescriptorResult>>(Some(wallet), "importdescriptors", &[request.clone()])
    })?;

    match results.first() {
      Some(result) if result.success => Ok(()),
      Some(result) => Err(
        RpcError::new(
          "importdescriptors",
          Some(wallet),
          result
            .error
            .as_ref()
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("descriptor import was not successful"),
        )
        .with_raw(format!("{:?}", result.error)),
      ),
      None => Err(RpcError::new(
        "importdescriptors",
        Some(wallet),
        "empty import result",
      )),
    }
  }

  fn get_balance(&self, wallet: &str) -> Result<f64, RpcError> {
    self.call(
      Some(wallet),
      "getbalance",
      &[json!("*"), json!(0), json!(true)],
    )
  }

  fn list_unspent(
    &self,
    wallet: &str,
    addresses: &[String],
  ) -> Result<Vec<UnspentOutput>, RpcError> {
    self.call(
      Some(wallet),
      "listunspent",
      &[json!(0), json!(MAX_CONFIRMATIONS), json!(addresses)],
    )
  }

  fn get_block_count(&self) -> Result<u64, RpcError> {
    self.call(None, "getblockcount", &[])
  }

  fn get_block_hash(&self, height: u64) -> Result<BlockHash, RpcError> {
    self.call(None, "getblockhash", &[json!(height)])
  }

  fn get_block_header(&self, block: HashOrHeight) -> Result<BlockHeader, RpcError> {
    let hash = match block {
      HashOrHeight::Hash(hash) => hash,
      HashOrHeight::Height(height) => self.get_block_hash(height)?,
    };

    self.call(None, "getblockheader", &[json!(hash), json!(true)])
  }

  fn rescan_from_height(&self, wallet: &str, height: u64) -> Result<RescanResult, RpcError> {
    self.call(Some(wallet), "rescanblockchain", &[json!(height)])
  }

  fn broadcast_raw_transaction(&self, hex: &str) -> Result<Txid, RpcError> {
    self.call(None, "sendrawtransaction", &[json!(hex)])
  }
}
