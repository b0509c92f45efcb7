use {
  crate::{
    codec::{sats_to_btc, KeyPair},
    engine::{Engine, EngineConfig},
    inscription::{Inscription, NewInscription},
    node::{BlockHeader, HashOrHeight, NodeRpc, RescanResult, RpcError, UnspentOutput},
    reconcile::{Reconciler, ReconcilerConfig},
    store::{InscriptionStore, RedbStore, StoredContent},
  },
  bitcoin::{consensus, hashes::Hash, BlockHash, Network, Transaction, Txid},
  std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex},
  },
  tempfile::NamedTempFile,
};

pub(crate) const RECIPIENT: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";
pub(crate) const SENDER: &str = "tb1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3q0sl5k7";
pub(crate) const CHECKSUM: &str = "checksum0";

pub(crate) fn txid(n: u64) -> Txid {
  let hex = format!("{n:x}");

  if hex.is_empty() || hex.len() > 1 {
    panic!();
  }

  hex.repeat(64).parse().unwrap()
}

pub(crate) fn key() -> KeyPair {
  KeyPair::from_raw(&[7; 32], Network::Testnet).unwrap()
}

pub(crate) fn engine() -> Engine {
  Engine::new(EngineConfig {
    network: Network::Testnet,
    ..Default::default()
  })
}

pub(crate) fn new_inscription(sender: &str, height: u64) -> NewInscription {
  NewInscription {
    key_wif: key().wif().into(),
    address: "tb1p_funding".into(),
    required_amount: 1093,
    fee: 155,
    content_len: 112,
    recipient_address: RECIPIENT.into(),
    sender_address: sender.into(),
    fee_rate: 1.5,
    created_at: 1_700_000_000,
    created_block: height,
  }
}

fn block_hash(height: u64) -> BlockHash {
  let mut bytes = [0; 32];
  bytes[..8].copy_from_slice(&(height + 1).to_le_bytes());
  BlockHash::from_byte_array(bytes)
}

#[derive(Default)]
struct Wallet {
  loaded: bool,
  descriptors: Vec<String>,
}

impl Wallet {
  fn watches(&self, address: &str) -> bool {
    self
      .descriptors
      .iter()
      .any(|descriptor| descriptor.starts_with(&format!("addr({address})#")))
  }
}

#[derive(Default)]
struct State {
  calls: Vec<String>,
  chain: Vec<BlockHeader>,
  wallets: BTreeMap<String, Wallet>,
  utxos: Vec<UnspentOutput>,
  broadcasts: Vec<String>,
  failures: HashMap<String, RpcError>,
  failing_wallets: HashSet<String>,
}

/// In-process stand-in for bitcoind. Keeps wallets, watched descriptors,
/// a header chain and injected UTXOs, and records every call it receives.
pub(crate) struct FakeNode {
  state: Mutex<State>,
}

impl FakeNode {
  pub(crate) fn new() -> Self {
    Self::with_chain(&(0..=100).map(|height| 1_600_000_000 + height * 600).collect::<Vec<i64>>())
  }

  pub(crate) fn with_chain(times: &[i64]) -> Self {
    let chain = times
      .iter()
      .enumerate()
      .map(|(height, time)| {
        let height = height as u64;
        BlockHeader {
          hash: block_hash(height),
          height,
          time: *time,
          previous_block_hash: height.checked_sub(1).map(block_hash),
        }
      })
      .collect();

    Self {
      state: Mutex::new(State {
        chain,
        ..Default::default()
      }),
    }
  }

  pub(crate) fn calls(&self) -> Vec<String> {
    self.state.lock().unwrap().calls.clone()
  }

  pub(crate) fn calls_to(&self, method: &str) -> usize {
    self
      .calls()
      .iter()
      .filter(|call| call.split(' ').next() == Some(method))
      .count()
  }

  pub(crate) fn clear_calls(&self) {
    self.state.lock().unwrap().calls.clear();
  }

  pub(crate) fn broadcasts(&self) -> Vec<String> {
    self.state.lock().unwrap().broadcasts.clone()
  }

  pub(crate) fn wallet_loaded(&self, wallet: &str) -> bool {
    self
      .state
      .lock()
      .unwrap()
      .wallets
      .get(wallet)
      .map(|wallet| wallet.loaded)
      .unwrap_or(false)
  }

  pub(crate) fn fail(&self, method: &str) {
    self.fail_with(method, RpcError::new(method, None, "injected failure").with_code(-1));
  }

  pub(crate) fn fail_with(&self, method: &str, error: RpcError) {
    self
      .state
      .lock()
      .unwrap()
      .failures
      .insert(method.into(), error);
  }

  pub(crate) fn fail_for_wallet(&self, wallet: &str) {
    self
      .state
      .lock()
      .unwrap()
      .failing_wallets
      .insert(wallet.into());
  }

  pub(crate) fn corrupt_height(&self, height: usize, reported: u64) {
    self.state.lock().unwrap().chain[height].height = reported;
  }

  pub(crate) fn add_utxo(&self, utxo: UnspentOutput) {
    self.state.lock().unwrap().utxos.push(utxo);
  }

  fn begin(&self, call: String, wallet: Option<&str>) -> Result<std::sync::MutexGuard<State>, RpcError> {
    let mut state = self.state.lock().unwrap();

    let method = call.split(' ').next().unwrap_or_default().to_owned();
    state.calls.push(call);

    if let Some(error) = state.failures.get(&method) {
      return Err(error.clone());
    }

    if let Some(wallet) = wallet {
      if state.failing_wallets.contains(wallet) {
        return Err(
          RpcError::new(&method, Some(wallet), "injected wallet failure").with_code(-1),
        );
      }
    }

    Ok(state)
  }
}

fn not_loaded(method: &str, wallet: &str) -> RpcError {
  RpcError::new(
    method,
    Some(wallet),
    format!("Requested wallet does not exist or is not loaded: {wallet}"),
  )
  .with_code(-18)
}

fn loaded_wallet<'a>(
  state: &'a mut State,
  method: &str,
  wallet: &str,
) -> Result<&'a mut Wallet, RpcError> {
  state
    .wallets
    .get_mut(wallet)
    .filter(|wallet| wallet.loaded)
    .ok_or_else(|| not_loaded(method, wallet))
}

impl NodeRpc for FakeNode {
  fn create_wallet(&self, wallet: &str, _descriptors: bool) -> Result<(), RpcError> {
    let mut state = self.begin(format!("createwallet {wallet}"), Some(wallet))?;

    if state.wallets.contains_key(wallet) {
      return Err(
        RpcError::new(
          "createwallet",
          None,
          "Wallet file verification failed. Failed to create database path. Database already exists.",
        )
        .with_code(-4),
      );
    }

    state.wallets.insert(
      wallet.into(),
      Wallet {
        loaded: true,
        descriptors: Vec::new(),
      },
    );

    Ok(())
  }

  fn load_wallet(&self, wallet: &str) -> Result<(), RpcError> {
    let mut state = self.begin(format!("loadwallet {wallet}"), Some(wallet))?;

    match state.wallets.get_mut(wallet) {
      Some(wallet) => {
        wallet.loaded = true;
        Ok(())
      }
      None => Err(RpcError::new("loadwallet", Some(wallet), "Wallet file not found").with_code(-18)),
    }
  }

  fn unload_wallet(&self, wallet: &str) -> Result<(), RpcError> {
    let mut state = self.begin(format!("unloadwallet {wallet}"), Some(wallet))?;
    loaded_wallet(&mut state, "unloadwallet", wallet)?.loaded = false;
    Ok(())
  }

  fn list_wallets(&self) -> Result<Vec<String>, RpcError> {
    let state = self.begin("listwallets".into(), None)?;
    Ok(
      state
        .wallets
        .iter()
        .filter(|(_, wallet)| wallet.loaded)
        .map(|(name, _)| name.clone())
        .collect(),
    )
  }

  fn get_descriptor_checksum(&self, descriptor: &str) -> Result<String, RpcError> {
    self.begin(format!("getdescriptorinfo {descriptor}"), None)?;
    Ok(CHECKSUM.into())
  }

  fn import_descriptors(&self, wallet: &str, descriptor: &str) -> Result<(), RpcError> {
    let mut state = self.begin(format!("importdescriptors {wallet} {descriptor}"), Some(wallet))?;
    let wallet = loaded_wallet(&mut state, "importdescriptors", wallet)?;
    if !wallet.descriptors.iter().any(|existing| existing == descriptor) {
      wallet.descriptors.push(descriptor.into());
    }
    Ok(())
  }

  fn get_balance(&self, wallet: &str) -> Result<f64, RpcError> {
    let mut state = self.begin(format!("getbalance {wallet}"), Some(wallet))?;
    loaded_wallet(&mut state, "getbalance", wallet)?;

    let watched = &state.wallets[wallet];

    Ok(
      state
        .utxos
        .iter()
        .filter(|utxo| {
          utxo
            .address
            .as_deref()
            .map(|address| watched.watches(address))
            .unwrap_or(false)
        })
        .map(|utxo| utxo.amount)
        .sum(),
    )
  }

  fn list_unspent(
    &self,
    wallet: &str,
    addresses: &[String],
  ) -> Result<Vec<UnspentOutput>, RpcError> {
    let mut state = self.begin(format!("listunspent {wallet}"), Some(wallet))?;
    loaded_wallet(&mut state, "listunspent", wallet)?;

    let watched = &state.wallets[wallet];

    Ok(
      state
        .utxos
        .iter()
        .filter(|utxo| {
          utxo
            .address
            .as_ref()
            .map(|address| addresses.contains(address) && watched.watches(address))
            .unwrap_or(false)
        })
        .cloned()
        .collect(),
    )
  }

  fn get_block_count(&self) -> Result<u64, RpcError> {
    let state = self.begin("getblockcount".into(), None)?;
    Ok(state.chain.len().saturating_sub(1) as u64)
  }

  fn get_block_hash(&self, height: u64) -> Result<BlockHash, RpcError> {
    let state = self.begin(format!("getblockhash {height}"), None)?;
    state
      .chain
      .get(height as usize)
      .map(|header| header.hash)
      .ok_or_else(|| RpcError::new("getblockhash", None, "Block height out of range").with_code(-8))
  }

  fn get_block_header(&self, block: HashOrHeight) -> Result<BlockHeader, RpcError> {
    let state = self.begin(format!("getblockheader {block}"), None)?;

    let header = match block {
      HashOrHeight::Height(height) => state.chain.get(height as usize),
      HashOrHeight::Hash(hash) => state.chain.iter().find(|header| header.hash == hash),
    };

    header
      .cloned()
      .ok_or_else(|| RpcError::new("getblockheader", None, "Block not found").with_code(-5))
  }

  fn rescan_from_height(&self, wallet: &str, height: u64) -> Result<RescanResult, RpcError> {
    let mut state = self.begin(format!("rescanblockchain {wallet} {height}"), Some(wallet))?;
    loaded_wallet(&mut state, "rescanblockchain", wallet)?;

    Ok(RescanResult {
      start_height: height,
      stop_height: Some(state.chain.len().saturating_sub(1) as u64),
    })
  }

  fn broadcast_raw_transaction(&self, hex: &str) -> Result<Txid, RpcError> {
    let mut state = self.begin("sendrawtransaction".into(), None)?;

    let transaction: Transaction = hex::decode(hex)
      .ok()
      .and_then(|bytes| consensus::deserialize(&bytes).ok())
      .ok_or_else(|| RpcError::new("sendrawtransaction", None, "TX decode failed").with_code(-22))?;

    state.broadcasts.push(hex.into());

    Ok(transaction.txid())
  }
}

/// A reconciler wired to a [`FakeNode`] and a temporary redb store.
pub(crate) struct Context {
  pub(crate) node: Arc<FakeNode>,
  pub(crate) reconciler: Reconciler<Arc<FakeNode>, RedbStore>,
  _dbfile: NamedTempFile,
}

impl Context {
  pub(crate) fn new() -> Self {
    let dbfile = NamedTempFile::new().unwrap();
    let node = Arc::new(FakeNode::new());

    Self {
      reconciler: Reconciler::new(
        engine(),
        node.clone(),
        RedbStore::open(dbfile.path()).unwrap(),
        ReconcilerConfig::default(),
      ),
      node,
      _dbfile: dbfile,
    }
  }

  pub(crate) fn store(&self) -> &RedbStore {
    self.reconciler.store()
  }

  pub(crate) fn inscription(&self, id: u64) -> Inscription {
    self.store().get_inscription(id).unwrap().unwrap()
  }

  /// Records an inscription for `content` at height 100, the way a commit
  /// request would, without touching the node.
  pub(crate) fn commit(&self, content: &[u8]) -> Inscription {
    let commit = self
      .reconciler
      .engine()
      .build_commit(content, 2.0, RECIPIENT, None)
      .unwrap();

    let id = self
      .store()
      .create_inscription(NewInscription {
        key_wif: commit.key().wif().into(),
        address: commit.address().to_string(),
        required_amount: commit.required_amount(),
        fee: commit.fee(),
        content_len: content.len() as u64,
        recipient_address: RECIPIENT.into(),
        sender_address: SENDER.into(),
        fee_rate: 2.0,
        created_at: 1_700_000_000,
        created_block: 100,
      })
      .unwrap();

    self
      .store()
      .store_content(
        id,
        &StoredContent::new(content.to_vec(), None, commit.content_type()),
      )
      .unwrap();

    self.inscription(id)
  }

  pub(crate) fn fund(&self, inscription: &Inscription, confirmations: i64) {
    self.fund_utxo(inscription, inscription.required_amount, confirmations);
  }

  pub(crate) fn fund_with(&self, inscription: &Inscription, sats: u64) {
    self.fund_utxo(inscription, sats, 1);
  }

  fn fund_utxo(&self, inscription: &Inscription, sats: u64, confirmations: i64) {
    self.node.add_utxo(UnspentOutput {
      txid: txid(9),
      vout: 0,
      address: Some(inscription.address.clone()),
      amount: sats_to_btc(sats),
      confirmations,
      script_pub_key: String::new(),
      spendable: false,
    });
  }
}
