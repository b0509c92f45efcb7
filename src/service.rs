//! The request-level operations a front end exposes: commit creation, reveal
//! creation, payment checks and reveal broadcast. Each one validates the
//! caller against the stored record before handing over to the reconciler.

use {
  crate::{
    engine,
    inscription::{Inscription, NewInscription, Status},
    node::{NodeRpc, UnspentOutput},
    reconcile::{Error, Reconciler},
    store::{InscriptionStore, StoredContent},
    unix_now,
  },
  serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitResult {
  pub id: u64,
  pub payment_address: String,
  pub required_amount: u64,
  pub fee: u64,
  pub content_len: u64,
  pub content_type: String,
  pub recipient_address: String,
  pub sender_address: String,
  pub created_block: u64,
  /// Set when the watch-only wallet could not be prepared. The inscription
  /// is recorded anyway and the wallet is retried on the next payment check.
  pub wallet_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealResult {
  pub id: u64,
  pub commit_txid: String,
  pub reveal_tx_hex: String,
  pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentStatus {
  pub id: u64,
  pub payment_address: String,
  pub required_amount: u64,
  pub sender_address: String,
  pub status: Status,
  pub is_paid: bool,
  pub payment_utxo: Option<UnspentOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastResult {
  pub id: u64,
  pub txid: String,
}

/// An inscription as shown to callers. The private key never leaves the
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InscriptionSummary {
  pub id: u64,
  pub payment_address: String,
  pub required_amount: u64,
  pub fee: u64,
  pub content_len: u64,
  pub status: Status,
  pub commit_txid: Option<String>,
  pub reveal_tx_hex: Option<String>,
  pub reveal_txid: Option<String>,
  pub sender_address: String,
  pub recipient_address: String,
  pub created_at: String,
  pub created_block: u64,
  pub last_checked_block: u64,
}

impl From<Inscription> for InscriptionSummary {
  fn from(inscription: Inscription) -> Self {
    Self {
      created_at: inscription.created_at().to_rfc3339(),
      id: inscription.id,
      payment_address: inscription.address,
      required_amount: inscription.required_amount,
      fee: inscription.fee,
      content_len: inscription.content_len,
      status: inscription.status,
      commit_txid: inscription.commit_txid,
      reveal_tx_hex: inscription.reveal_tx_hex,
      reveal_txid: inscription.reveal_txid,
      sender_address: inscription.sender_address,
      recipient_address: inscription.recipient_address,
      created_block: inscription.created_block,
      last_checked_block: inscription.last_checked_block,
    }
  }
}

pub struct Service<N, S> {
  reconciler: Reconciler<N, S>,
}

impl<N: NodeRpc, S: InscriptionStore> Service<N, S> {
  pub fn new(reconciler: Reconciler<N, S>) -> Self {
    Self { reconciler }
  }

  pub fn reconciler(&self) -> &Reconciler<N, S> {
    &self.reconciler
  }

  fn store(&self) -> &S {
    self.reconciler.store()
  }

  fn owned_inscription(&self, id: u64, sender: &str) -> Result<Inscription, Error> {
    let inscription = self
      .store()
      .get_inscription(id)?
      .ok_or_else(|| Error::inscription_not_found(id))?;

    if inscription.sender_address != sender.trim() {
      return Err(Error::OwnershipMismatch {
        id,
        field: "sender address",
      });
    }

    Ok(inscription)
  }

  /// Builds a new commit for `content`, replacing any of the sender's
  /// inscriptions that were never paid.
  pub fn create_commit(
    &self,
    content: &[u8],
    filename: Option<String>,
    fee_rate: f64,
    recipient: &str,
    sender: &str,
  ) -> Result<CommitResult, Error> {
    let sender = sender.trim();

    if sender.is_empty() {
      return Err(Error::InvalidRequest("sender address is required".into()));
    }

    if content.is_empty() {
      return Err(Error::InvalidRequest("content is empty".into()));
    }

    let commit = self
      .reconciler
      .engine()
      .build_commit(content, fee_rate, recipient.trim(), None)?;

    let height = self.reconciler.current_height()?;

    for removed in self.store().delete_pending_for_sender(sender)? {
      self.reconciler.release_wallet(removed);
    }

    let new = NewInscription {
      key_wif: commit.key().wif().into(),
      address: commit.address().to_string(),
      required_amount: commit.required_amount(),
      fee: commit.fee(),
      content_len: content.len() as u64,
      recipient_address: commit.recipient().to_string(),
      sender_address: sender.into(),
      fee_rate,
      created_at: unix_now(),
      created_block: height,
    };

    let id = self.store().create_inscription(new)?;

    self.store().store_content(
      id,
      &StoredContent::new(content.to_vec(), filename, commit.content_type()),
    )?;

    log::info!(
      "inscription {id} created: pay {} sats to {}",
      commit.required_amount(),
      commit.address()
    );

    let wallet_error = match self
      .reconciler
      .ensure_wallet(id, &commit.address().to_string())
    {
      Ok(_) => None,
      Err(err) => {
        log::warn!("inscription {id}: {err}");
        Some(err.to_string())
      }
    };

    Ok(CommitResult {
      id,
      payment_address: commit.address().to_string(),
      required_amount: commit.required_amount(),
      fee: commit.fee(),
      content_len: content.len() as u64,
      content_type: commit.content_type().into(),
      recipient_address: commit.recipient().to_string(),
      sender_address: sender.into(),
      created_block: height,
      wallet_error,
    })
  }

  pub fn create_reveal(
    &self,
    id: u64,
    commit_txid: &str,
    vout: u32,
    funded: u64,
    content: &[u8],
  ) -> Result<RevealResult, Error> {
    let txid = engine::parse_txid(commit_txid)?;

    let inscription = self
      .store()
      .get_inscription(id)?
      .ok_or_else(|| Error::inscription_not_found(id))?;

    let reveal_tx_hex = self
      .reconciler
      .advance_to_reveal(&inscription, txid, vout, funded, content)?;

    Ok(RevealResult {
      id,
      commit_txid: txid.to_string(),
      reveal_tx_hex,
      status: Status::RevealReady,
    })
  }

  pub fn check_payment_status(
    &self,
    id: u64,
    payment_address: &str,
    required_amount: u64,
    sender: &str,
  ) -> Result<PaymentStatus, Error> {
    let inscription = self.owned_inscription(id, sender)?;

    if inscription.address != payment_address.trim() {
      return Err(Error::OwnershipMismatch {
        id,
        field: "payment address",
      });
    }

    if inscription.required_amount != required_amount {
      return Err(Error::OwnershipMismatch {
        id,
        field: "required amount",
      });
    }

    let height = self.reconciler.current_height()?;
    let check = self.reconciler.check_payment(&inscription, height)?;

    let status = self
      .store()
      .get_inscription(id)?
      .map(|current| current.status)
      .unwrap_or(inscription.status);

    Ok(PaymentStatus {
      id,
      payment_address: inscription.address,
      required_amount: inscription.required_amount,
      sender_address: inscription.sender_address,
      status,
      is_paid: check.is_paid,
      payment_utxo: check.utxo,
    })
  }

  pub fn broadcast_reveal(&self, id: u64, sender: &str) -> Result<BroadcastResult, Error> {
    let inscription = self.owned_inscription(id, sender)?;

    let txid = self.reconciler.broadcast_and_complete(&inscription)?;

    Ok(BroadcastResult {
      id,
      txid: txid.to_string(),
    })
  }

  pub fn get_inscription(&self, id: u64) -> Result<InscriptionSummary, Error> {
    self
      .store()
      .get_inscription(id)?
      .map(Into::into)
      .ok_or_else(|| Error::inscription_not_found(id))
  }

  pub fn get_inscriptions_by_sender(&self, sender: &str) -> Result<Vec<InscriptionSummary>, Error> {
    Ok(
      self
        .store()
        .get_inscriptions_by_sender(sender.trim())?
        .into_iter()
        .map(Into::into)
        .collect(),
    )
  }
}
