use {
  super::{BLOCK_INTERVAL, GENESIS_TIME},
  bitcoin::{
    consensus,
    hashes::{sha256, Hash},
    Address, Amount, BlockHash, OutPoint, Transaction,
  },
  jsonrpc_core::{Error, ErrorCode, Value},
  serde::{de::DeserializeOwned, Serialize},
  serde_json::json,
  std::{collections::BTreeMap, str::FromStr},
};

const RPC_WALLET_ERROR: i64 = -4;
const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;
const RPC_INVALID_PARAMETER: i64 = -8;
const RPC_WALLET_NOT_FOUND: i64 = -18;
const RPC_WALLET_NOT_SPECIFIED: i64 = -19;
const RPC_DESERIALIZATION_ERROR: i64 = -22;
const RPC_VERIFY_REJECTED: i64 = -26;
const RPC_WALLET_ALREADY_LOADED: i64 = -35;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
  pub method: String,
  pub wallet: Option<String>,
  pub params: Value,
}

#[derive(Debug, Default)]
pub(crate) struct WalletState {
  loaded: bool,
  watched: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Utxo {
  pub(crate) outpoint: OutPoint,
  pub(crate) address: String,
  pub(crate) sats: u64,
  pub(crate) height: Option<u64>,
}

#[derive(Debug)]
pub(crate) struct State {
  pub(crate) height: u64,
  pub(crate) wallets: BTreeMap<String, WalletState>,
  pub(crate) utxos: Vec<Utxo>,
  pub(crate) broadcasts: Vec<Transaction>,
  pub(crate) calls: Vec<Call>,
  pub(crate) reject_broadcasts: bool,
  pub(crate) failures: Vec<(String, i64, String, usize)>,
}

pub(crate) fn checksum(descriptor: &str) -> String {
  hex::encode(&sha256::Hash::hash(descriptor.as_bytes()).to_byte_array()[..4])
}

fn error(code: i64, message: impl Into<String>) -> Error {
  Error {
    code: ErrorCode::from(code),
    message: message.into(),
    data: None,
  }
}

fn param<T: DeserializeOwned>(params: &[Value], index: usize) -> Result<T, Error> {
  serde_json::from_value(params.get(index).cloned().unwrap_or(Value::Null))
    .map_err(|err| Error::invalid_params(format!("param {index}: {err}")))
}

fn block_hash(height: u64) -> BlockHash {
  let mut bytes = [0; 32];
  bytes[..8].copy_from_slice(&(height + 1).to_be_bytes());
  BlockHash::from_byte_array(bytes)
}

fn block_time(height: u64) -> i64 {
  GENESIS_TIME + i64::try_from(height).unwrap() * BLOCK_INTERVAL
}

impl State {
  pub(crate) fn new(height: u64) -> Self {
    Self {
      height,
      wallets: BTreeMap::new(),
      utxos: Vec::new(),
      broadcasts: Vec::new(),
      calls: Vec::new(),
      reject_broadcasts: false,
      failures: Vec::new(),
    }
  }

  pub(crate) fn loaded_wallets(&self) -> Vec<String> {
    self
      .wallets
      .iter()
      .filter(|(_, wallet)| wallet.loaded)
      .map(|(name, _)| name.clone())
      .collect()
  }

  pub(crate) fn call(
    &mut self,
    method: &str,
    wallet: Option<String>,
    params: Vec<Value>,
  ) -> Result<Value, Error> {
    self.calls.push(Call {
      method: method.into(),
      wallet: wallet.clone(),
      params: Value::Array(params.clone()),
    });

    if let Some(failure) = self
      .failures
      .iter_mut()
      .find(|(failing, _, _, times)| failing == method && *times > 0)
    {
      failure.3 -= 1;
      return Err(error(failure.1, failure.2.clone()));
    }

    match method {
      "createwallet" => self.create_wallet(&params),
      "loadwallet" => self.load_wallet(&params),
      "unloadwallet" => self.unload_wallet(wallet, &params),
      "listwallets" => Ok(json!(self.loaded_wallets())),
      "getdescriptorinfo" => self.get_descriptor_info(&params),
      "importdescriptors" => self.import_descriptors(wallet, &params),
      "getbalance" => self.get_balance(wallet),
      "listunspent" => self.list_unspent(wallet, &params),
      "getblockcount" => Ok(json!(self.height)),
      "getblockhash" => self.get_block_hash(&params),
      "getblockheader" => self.get_block_header(&params),
      "rescanblockchain" => self.rescan_blockchain(wallet, &params),
      "sendrawtransaction" => self.send_raw_transaction(&params),
      _ => Err(Error::method_not_found()),
    }
  }

  fn loaded_wallet(&mut self, wallet: Option<String>) -> Result<&mut WalletState, Error> {
    let name = wallet.ok_or_else(|| {
      error(
        RPC_WALLET_NOT_SPECIFIED,
        "Wallet file not specified (must request wallet RPC through /wallet/<filename> uri-path).",
      )
    })?;

    self
      .wallets
      .get_mut(&name)
      .filter(|wallet| wallet.loaded)
      .ok_or_else(|| {
        error(
          RPC_WALLET_NOT_FOUND,
          format!("Requested wallet does not exist or is not loaded: {name}"),
        )
      })
  }

  fn create_wallet(&mut self, params: &[Value]) -> Result<Value, Error> {
    let name: String = param(params, 0)?;

    if self.wallets.contains_key(&name) {
      return Err(error(
        RPC_WALLET_ERROR,
        format!("Wallet file verification failed. Failed to create database path '{name}'. Database already exists."),
      ));
    }

    self.wallets.insert(
      name.clone(),
      WalletState {
        loaded: true,
        watched: Vec::new(),
      },
    );

    Ok(json!({ "name": name, "warning": "" }))
  }

  fn load_wallet(&mut self, params: &[Value]) -> Result<Value, Error> {
    let name: String = param(params, 0)?;

    let wallet = self.wallets.get_mut(&name).ok_or_else(|| {
      error(
        RPC_WALLET_NOT_FOUND,
        format!("Wallet file verification failed. Failed to load database path '{name}'. Path does not exist."),
      )
    })?;

    if wallet.loaded {
      return Err(error(
        RPC_WALLET_ALREADY_LOADED,
        format!("Wallet file verification failed. Wallet \"{name}\" is already loaded."),
      ));
    }

    wallet.loaded = true;

    Ok(json!({ "name": name, "warning": "" }))
  }

  fn unload_wallet(&mut self, wallet: Option<String>, params: &[Value]) -> Result<Value, Error> {
    let name = match params.first() {
      Some(Value::String(name)) => Some(name.clone()),
      _ => wallet,
    };

    self.loaded_wallet(name)?.loaded = false;

    Ok(json!({ "warning": "" }))
  }

  fn get_descriptor_info(&mut self, params: &[Value]) -> Result<Value, Error> {
    let descriptor: String = param(params, 0)?;

    Ok(json!({
      "descriptor": format!("{descriptor}#{}", checksum(&descriptor)),
      "checksum": checksum(&descriptor),
      "isrange": false,
      "issolvable": false,
      "hasprivatekeys": false,
    }))
  }

  fn import_descriptors(&mut self, wallet: Option<String>, params: &[Value]) -> Result<Value, Error> {
    let requests: Vec<Value> = param(params, 0)?;
    let wallet = self.loaded_wallet(wallet)?;

    let results = requests
      .iter()
      .map(|request| {
        let descriptor = request["desc"].as_str().unwrap_or_default();

        let Some((body, given)) = descriptor.split_once('#') else {
          return json!({
            "success": false,
            "error": { "code": RPC_INVALID_ADDRESS_OR_KEY, "message": "Missing checksum" },
          });
        };

        if given != checksum(body) {
          return json!({
            "success": false,
            "error": {
              "code": RPC_INVALID_ADDRESS_OR_KEY,
              "message": format!("Provided checksum '{given}' does not match computed checksum '{}'", checksum(body)),
            },
          });
        }

        match body
          .strip_prefix("addr(")
          .and_then(|rest| rest.strip_suffix(')'))
        {
          Some(address) => {
            wallet.watched.push(address.into());
            json!({ "success": true })
          }
          None => json!({
            "success": false,
            "error": { "code": RPC_INVALID_ADDRESS_OR_KEY, "message": "Unsupported descriptor" },
          }),
        }
      })
      .collect::<Vec<Value>>();

    Ok(Value::Array(results))
  }

  fn watched_utxos(&mut self, wallet: Option<String>) -> Result<Vec<Utxo>, Error> {
    let watched = self.loaded_wallet(wallet)?.watched.clone();

    Ok(
      self
        .utxos
        .iter()
        .filter(|utxo| watched.contains(&utxo.address))
        .cloned()
        .collect(),
    )
  }

  fn get_balance(&mut self, wallet: Option<String>) -> Result<Value, Error> {
    let sats = self
      .watched_utxos(wallet)?
      .iter()
      .map(|utxo| utxo.sats)
      .sum::<u64>();

    Ok(json!(Amount::from_sat(sats).to_btc()))
  }

  fn list_unspent(&mut self, wallet: Option<String>, params: &[Value]) -> Result<Value, Error> {
    let addresses: Option<Vec<String>> = param(params, 2)?;
    let label = format!("{}_lbl", wallet.clone().unwrap_or_default());
    let tip = self.height;

    let utxos = self
      .watched_utxos(wallet)?
      .into_iter()
      .filter(|utxo| {
        addresses
          .as_ref()
          .map(|addresses| addresses.is_empty() || addresses.contains(&utxo.address))
          .unwrap_or(true)
      })
      .map(|utxo| {
        let script_pub_key = Address::from_str(&utxo.address)
          .map(|address| hex::encode(address.assume_checked().script_pubkey().as_bytes()))
          .unwrap_or_default();

        json!({
          "txid": utxo.outpoint.txid,
          "vout": utxo.outpoint.vout,
          "address": utxo.address,
          "label": label,
          "scriptPubKey": script_pub_key,
          "amount": Amount::from_sat(utxo.sats).to_btc(),
          "confirmations": utxo.height.map(|height| tip + 1 - height).unwrap_or(0),
          "spendable": false,
          "solvable": false,
          "safe": true,
        })
      })
      .collect::<Vec<Value>>();

    Ok(Value::Array(utxos))
  }

  fn get_block_hash(&mut self, params: &[Value]) -> Result<Value, Error> {
    let height: u64 = param(params, 0)?;

    if height > self.height {
      return Err(error(RPC_INVALID_PARAMETER, "Block height out of range"));
    }

    Ok(json!(block_hash(height)))
  }

  fn get_block_header(&mut self, params: &[Value]) -> Result<Value, Error> {
    let hash: BlockHash = param(params, 0)?;

    let height = (0..=self.height)
      .find(|height| block_hash(*height) == hash)
      .ok_or_else(|| error(RPC_INVALID_ADDRESS_OR_KEY, "Block not found"))?;

    let mut header = json!({
      "hash": hash,
      "confirmations": self.height + 1 - height,
      "height": height,
      "version": 536870912,
      "time": block_time(height),
      "mediantime": block_time(height),
      "nonce": 0,
      "bits": "207fffff",
      "difficulty": 1,
      "nTx": 1,
    });

    if let Some(previous) = height.checked_sub(1) {
      header["previousblockhash"] = json!(block_hash(previous));
    }

    if height < self.height {
      header["nextblockhash"] = json!(block_hash(height + 1));
    }

    Ok(header)
  }

  fn rescan_blockchain(&mut self, wallet: Option<String>, params: &[Value]) -> Result<Value, Error> {
    let start: Option<u64> = param(params, 0)?;
    self.loaded_wallet(wallet)?;

    Ok(json!({
      "start_height": start.unwrap_or(0),
      "stop_height": self.height,
    }))
  }

  fn send_raw_transaction(&mut self, params: &[Value]) -> Result<Value, Error> {
    let hex: String = param(params, 0)?;

    if self.reject_broadcasts {
      return Err(error(RPC_VERIFY_REJECTED, "mempool full"));
    }

    let transaction: Transaction = hex::decode(&hex)
      .ok()
      .and_then(|bytes| consensus::deserialize(&bytes).ok())
      .ok_or_else(|| error(RPC_DESERIALIZATION_ERROR, "TX decode failed"))?;

    let txid = transaction.txid();

    if !self
      .broadcasts
      .iter()
      .any(|broadcast| broadcast.txid() == txid)
    {
      self.broadcasts.push(transaction);
    }

    Ok(json!(txid))
  }
}
