use {
  crate::{
    codec::btc_to_sats,
    engine::Engine,
    inscription::{Inscription, Status},
    node::{NodeRpc, RpcError, UnspentOutput},
    store::InscriptionStore,
  },
  bitcoin::{consensus, Transaction, Txid},
  serde::Serialize,
};

pub use self::{
  block_search::find_block_near_time,
  error::{Error, Step},
  sweep::{SweepEntry, SweepReport},
};

mod block_search;
mod error;
mod sweep;

pub const DEFAULT_WALLET_PREFIX: &str = "api_server";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
  pub wallet_prefix: String,
}

impl Default for ReconcilerConfig {
  fn default() -> Self {
    Self {
      wallet_prefix: DEFAULT_WALLET_PREFIX.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentCheck {
  pub is_paid: bool,
  pub utxo: Option<UnspentOutput>,
}

impl PaymentCheck {
  fn paid(utxo: Option<UnspentOutput>) -> Self {
    Self {
      is_paid: true,
      utxo,
    }
  }

  fn unpaid() -> Self {
    Self {
      is_paid: false,
      utxo: None,
    }
  }
}

/// Drives inscriptions through `pending → paid → reveal_ready → completed`
/// against a node, one isolated watch-only wallet per inscription.
pub struct Reconciler<N, S> {
  engine: Engine,
  node: N,
  store: S,
  config: ReconcilerConfig,
}

impl<N: NodeRpc, S: InscriptionStore> Reconciler<N, S> {
  pub fn new(engine: Engine, node: N, store: S, config: ReconcilerConfig) -> Self {
    Self {
      engine,
      node,
      store,
      config,
    }
  }

  pub fn engine(&self) -> &Engine {
    &self.engine
  }

  pub fn node(&self) -> &N {
    &self.node
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn wallet_name(&self, id: u64) -> String {
    format!("{}_insc_wallet_{id}", self.config.wallet_prefix)
  }

  /// Unloads the inscription's wallet once nothing will poll it again.
  /// Failures are logged, never returned.
  pub fn release_wallet(&self, id: u64) {
    let wallet = self.wallet_name(id);
    match self.node.unload_wallet(&wallet) {
      Ok(()) => log::debug!("unloaded wallet {wallet}"),
      Err(err) => log::warn!("failed to unload wallet {wallet}: {err}"),
    }
  }

  pub fn current_height(&self) -> Result<u64, Error> {
    self
      .node
      .get_block_count()
      .map_err(Error::rpc(Step::BlockHeight, None))
  }

  fn inscription(&self, id: u64) -> Result<Inscription, Error> {
    self
      .store
      .get_inscription(id)?
      .ok_or_else(|| Error::inscription_not_found(id))
  }

  /// Creates, loads and arms the inscription's watch-only wallet. Every step
  /// is idempotent, so a failed attempt is simply repeated later.
  pub fn ensure_wallet(&self, id: u64, address: &str) -> Result<String, Error> {
    let wallet = self.wallet_name(id);

    match self.node.create_wallet(&wallet, true) {
      Ok(()) => log::info!("created wallet {wallet}"),
      Err(err) if err.is_already_exists() => log::debug!("wallet {wallet} already exists"),
      Err(err) => return Err(Error::rpc(Step::CreateWallet, Some(&wallet))(err)),
    }

    self
      .node
      .load_wallet(&wallet)
      .map_err(Error::rpc(Step::LoadWallet, Some(&wallet)))?;

    self
      .node
      .import_descriptor(address, &wallet)
      .map_err(Error::rpc(Step::ImportDescriptor, Some(&wallet)))?;

    log::info!("wallet {wallet} is watching {address}");

    Ok(wallet)
  }

  /// Looks for a qualifying payment to the inscription's funding address.
  ///
  /// Already paid inscriptions return immediately without touching the node.
  /// When nothing is found the wallet is rescanned from the last checked
  /// height while the inscription is marked `scanning`; it is always put
  /// back to `pending` afterwards.
  pub fn check_payment(
    &self,
    inscription: &Inscription,
    current_height: u64,
  ) -> Result<PaymentCheck, Error> {
    let id = inscription.id;

    if inscription.status.is_paid() {
      return Ok(PaymentCheck::paid(None));
    }

    if inscription.status == Status::Scanning {
      return Err(Error::StateConflict { id });
    }

    let wallet = self.ensure_wallet(id, &inscription.address)?;

    let balance = self
      .node
      .get_balance(&wallet)
      .map_err(Error::rpc(Step::Balance, Some(&wallet)))?;

    log::debug!("wallet {wallet} balance {balance} BTC");

    if let Some(utxo) = self.find_payment_utxo(&wallet, inscription)? {
      if self
        .store
        .transition_status(id, Status::Pending, Status::Paid)?
      {
        log::info!(
          "inscription {id} paid by {}:{} ({} BTC)",
          utxo.txid,
          utxo.vout,
          utxo.amount
        );
        return Ok(PaymentCheck::paid(Some(utxo)));
      }

      return match self.inscription(id)?.status {
        Status::Scanning => Err(Error::StateConflict { id }),
        _ => Ok(PaymentCheck::paid(Some(utxo))),
      };
    }

    if !self
      .store
      .transition_status(id, Status::Pending, Status::Scanning)?
    {
      return Err(Error::StateConflict { id });
    }

    let scanned = self.rescan(&wallet, inscription, current_height);

    let restored = self
      .store
      .transition_status(id, Status::Scanning, Status::Pending);

    scanned?;
    restored?;

    Ok(PaymentCheck::unpaid())
  }

  fn rescan(&self, wallet: &str, inscription: &Inscription, current_height: u64) -> Result<(), Error> {
    let start = inscription.last_checked_block.min(current_height);

    let result = self
      .node
      .rescan_from_height(wallet, start)
      .map_err(Error::rpc(Step::Rescan, Some(wallet)))?;

    log::info!(
      "rescanned wallet {wallet} from {} to {:?}",
      result.start_height,
      result.stop_height
    );

    self.store.record_block_check(inscription.id, current_height)?;

    Ok(())
  }

  /// First wallet UTXO paying the funding address at least the required
  /// amount. Unconfirmed outputs qualify.
  pub fn find_payment_utxo(
    &self,
    wallet: &str,
    inscription: &Inscription,
  ) -> Result<Option<UnspentOutput>, Error> {
    let utxos = self
      .node
      .list_unspent(wallet, &[inscription.address.clone()])
      .map_err(Error::rpc(Step::ListUnspent, Some(wallet)))?;

    Ok(select_payment(utxos, &inscription.address, inscription.required_amount))
  }

  /// Rebuilds the commit from the stored key and the re-supplied content,
  /// signs the reveal spending `commit_txid:vout` and moves to
  /// `reveal_ready`. The content must hash to what was stored at commit time
  /// and must re-derive the stored funding address.
  pub fn advance_to_reveal(
    &self,
    inscription: &Inscription,
    commit_txid: Txid,
    vout: u32,
    funded: u64,
    content: &[u8],
  ) -> Result<String, Error> {
    let id = inscription.id;
    let current = self.inscription(id)?;

    match current.status {
      Status::Pending | Status::Paid => {}
      Status::Scanning => return Err(Error::StateConflict { id }),
      Status::RevealReady if current.commit_txid == Some(commit_txid.to_string()) => {
        if let Some(hex) = current.reveal_tx_hex {
          return Ok(hex);
        }
      }
      from => {
        return Err(Error::InvalidTransition {
          id,
          from,
          to: Status::RevealReady,
        })
      }
    }

    let stored = self.store.fetch_content(id)?.ok_or(Error::NotFound {
      what: "content for inscription",
      id,
    })?;

    if !stored.matches(content) {
      return Err(Error::ContentMismatch { id });
    }

    let commit = self.engine.build_commit(
      content,
      current.fee_rate,
      &current.recipient_address,
      Some(&current.key_wif),
    )?;

    if commit.address().to_string() != current.address {
      return Err(Error::ContentMismatch { id });
    }

    let reveal_tx_hex = commit.build_reveal_hex(commit_txid, vout, funded)?;

    if !self
      .store
      .prepare_reveal(id, current.status, &commit_txid.to_string(), &reveal_tx_hex)?
    {
      let latest = self.inscription(id)?;

      if latest.status == Status::RevealReady && latest.commit_txid == Some(commit_txid.to_string()) {
        if let Some(hex) = latest.reveal_tx_hex {
          return Ok(hex);
        }
      }

      return Err(Error::ConcurrentUpdate {
        id,
        status: latest.status,
      });
    }

    log::info!("inscription {id} reveal ready, spending {commit_txid}:{vout}");

    Ok(reveal_tx_hex)
  }

  /// Broadcasts the stored reveal and completes the inscription. A reveal the
  /// node already has in a block counts as broadcast. On any other failure
  /// the inscription stays `reveal_ready` and can be retried.
  pub fn broadcast_and_complete(&self, inscription: &Inscription) -> Result<Txid, Error> {
    let id = inscription.id;
    let current = self.inscription(id)?;

    match current.status {
      Status::RevealReady => {}
      Status::Completed => {
        if let Some(txid) = current.reveal_txid.as_deref().and_then(|txid| txid.parse().ok()) {
          return Ok(txid);
        }
      }
      from => {
        return Err(Error::InvalidTransition {
          id,
          from,
          to: Status::Completed,
        })
      }
    }

    let hex = current.reveal_tx_hex.as_deref().ok_or(Error::NotFound {
      what: "reveal transaction for inscription",
      id,
    })?;

    let txid = match self.node.broadcast_raw_transaction(hex) {
      Ok(txid) => txid,
      Err(err) if err.is_already_in_chain() => {
        log::info!("reveal for inscription {id} is already in the chain");
        reveal_txid(hex).map_err(Error::rpc(Step::Broadcast, None))?
      }
      Err(err) => return Err(Error::rpc(Step::Broadcast, None)(err)),
    };

    self.store.record_reveal_txid(id, &txid.to_string())?;
    self
      .store
      .transition_status(id, Status::RevealReady, Status::Completed)?;

    log::info!("inscription {id} completed with reveal {txid}");

    self.release_wallet(id);

    Ok(txid)
  }

  /// Moves one inscription as far along as it can go in a single pass and
  /// returns where it ended up.
  pub fn process_inscription(&self, id: u64, current_height: u64) -> Result<Status, Error> {
    let inscription = self.inscription(id)?;

    let check = self.check_payment(&inscription, current_height)?;
    if !check.is_paid {
      return Ok(Status::Pending);
    }

    let inscription = self.inscription(id)?;

    if inscription.status == Status::Paid {
      let utxo = match check.utxo {
        Some(utxo) => Some(utxo),
        None => {
          let wallet = self.ensure_wallet(id, &inscription.address)?;
          self.find_payment_utxo(&wallet, &inscription)?
        }
      };

      let Some(utxo) = utxo else {
        log::warn!("inscription {id} is paid but its payment output is gone");
        return Ok(Status::Paid);
      };

      let funded = btc_to_sats(utxo.amount).ok_or_else(|| {
        Error::Consistency(format!("node reported invalid amount {}", utxo.amount))
      })?;

      let content = self.store.fetch_content(id)?.ok_or(Error::NotFound {
        what: "content for inscription",
        id,
      })?;

      self.advance_to_reveal(&inscription, utxo.txid, utxo.vout, funded, &content.data)?;
    }

    let inscription = self.inscription(id)?;

    if inscription.status == Status::RevealReady {
      self.broadcast_and_complete(&inscription)?;
    }

    Ok(self.inscription(id)?.status)
  }
}

fn select_payment(
  utxos: Vec<UnspentOutput>,
  address: &str,
  required_amount: u64,
) -> Option<UnspentOutput> {
  utxos.into_iter().find(|utxo| {
    utxo.address.as_deref() == Some(address)
      && utxo.confirmations >= 0
      && btc_to_sats(utxo.amount)
        .map(|sats| sats >= required_amount)
        .unwrap_or(false)
  })
}

fn reveal_txid(hex: &str) -> Result<Txid, RpcError> {
  let bytes = hex::decode(hex)
    .map_err(|err| RpcError::new("sendrawtransaction", None, format!("stored reveal is not hex: {err}")))?;

  let transaction: Transaction = consensus::deserialize(&bytes).map_err(|err| {
    RpcError::new(
      "sendrawtransaction",
      None,
      format!("stored reveal does not decode: {err}"),
    )
  })?;

  Ok(transaction.txid())
}
