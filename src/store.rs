use {
  crate::inscription::{BlockCheck, Inscription, NewInscription, Status, StatusUpdate},
  bitcoin::hashes::{sha256, Hash},
  serde::{Deserialize, Serialize},
};

pub use self::redb::RedbStore;

pub mod redb;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] ::redb::Error),
  #[error("encoding error: {0}")]
  Encoding(#[from] bincode::Error),
  #[error("inscription {0} not found")]
  NotFound(u64),
  #[error("inscription {id} cannot move from {from} to {to}")]
  InvalidTransition { id: u64, from: Status, to: Status },
}

macro_rules! from_redb_error {
  ($($error:ty),*) => {
    $(
      impl From<$error> for Error {
        fn from(error: $error) -> Self {
          Self::Database(error.into())
        }
      }
    )*
  };
}

from_redb_error!(
  ::redb::DatabaseError,
  ::redb::TransactionError,
  ::redb::TableError,
  ::redb::StorageError,
  ::redb::CommitError
);

/// Uploaded bytes kept so the reveal can be rebuilt later, byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredContent {
  pub data: Vec<u8>,
  pub filename: Option<String>,
  pub content_type: String,
  pub sha256: [u8; 32],
}

impl StoredContent {
  pub fn new(data: Vec<u8>, filename: Option<String>, content_type: &str) -> Self {
    Self {
      sha256: sha256::Hash::hash(&data).to_byte_array(),
      data,
      filename,
      content_type: content_type.into(),
    }
  }

  pub fn matches(&self, content: &[u8]) -> bool {
    sha256::Hash::hash(content).to_byte_array() == self.sha256
  }
}

/// Durable state behind the reconciler. Every status write goes through a
/// single-row transaction, so concurrent callers observe compare-and-set
/// semantics on the status column.
pub trait InscriptionStore: Send + Sync {
  /// Inserts with status `pending` and an initial block check at the
  /// creation height.
  fn create_inscription(&self, inscription: NewInscription) -> Result<u64, Error>;

  fn get_inscription(&self, id: u64) -> Result<Option<Inscription>, Error>;

  fn get_inscriptions_by_sender(&self, sender: &str) -> Result<Vec<Inscription>, Error>;

  fn get_inscriptions_by_status(&self, statuses: &[Status]) -> Result<Vec<Inscription>, Error>;

  fn get_pending_inscriptions(&self) -> Result<Vec<Inscription>, Error> {
    self.get_inscriptions_by_status(&[Status::Pending])
  }

  /// Appends `(old, new)` to the history. No-op when the status is unchanged,
  /// [`Error::InvalidTransition`] when the move would go backwards.
  fn update_status(&self, id: u64, status: Status) -> Result<(), Error>;

  /// Moves `id` to `status` only if it is currently `expected` and the move
  /// goes forward. Returns `false` otherwise.
  fn transition_status(&self, id: u64, expected: Status, status: Status) -> Result<bool, Error>;

  fn status_history(&self, id: u64) -> Result<Vec<StatusUpdate>, Error>;

  /// Writes the commit outpoint's txid and the signed reveal and moves to
  /// `reveal_ready`, all in one transaction and only if the status is still
  /// `expected`. Returns `false`, leaving the row untouched, otherwise.
  fn prepare_reveal(
    &self,
    id: u64,
    expected: Status,
    commit_txid: &str,
    reveal_tx_hex: &str,
  ) -> Result<bool, Error>;

  fn record_reveal_txid(&self, id: u64, reveal_txid: &str) -> Result<(), Error>;

  /// No-op when `height` equals the last recorded check.
  fn record_block_check(&self, id: u64, height: u64) -> Result<(), Error>;

  fn block_checks(&self, id: u64) -> Result<Vec<BlockCheck>, Error>;

  /// Removes the sender's rows that are still `pending`, with their content
  /// and history. Returns the removed ids.
  fn delete_pending_for_sender(&self, sender: &str) -> Result<Vec<u64>, Error>;

  fn store_content(&self, id: u64, content: &StoredContent) -> Result<(), Error>;

  fn fetch_content(&self, id: u64) -> Result<Option<StoredContent>, Error>;
}
