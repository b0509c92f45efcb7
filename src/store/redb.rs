use {
  super::{Error, InscriptionStore, StoredContent},
  crate::{
    inscription::{BlockCheck, Inscription, NewInscription, Status, StatusUpdate},
    unix_now,
  },
  ::redb::{Database, ReadableTable, TableDefinition, WriteTransaction},
  serde::{de::DeserializeOwned, Serialize},
  std::path::Path,
};

type HistoryTable = TableDefinition<'static, (u64, u64), &'static [u8]>;

const INSCRIPTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("INSCRIPTIONS");
const INSCRIPTION_CONTENT: TableDefinition<u64, &[u8]> =
  TableDefinition::new("INSCRIPTION_CONTENT");
const STATUS_UPDATES: HistoryTable = TableDefinition::new("STATUS_UPDATES");
const BLOCK_CHECKS: HistoryTable = TableDefinition::new("BLOCK_CHECKS");
const STATISTIC_TO_COUNT: TableDefinition<u64, u64> = TableDefinition::new("STATISTIC_TO_COUNT");

#[derive(Copy, Clone)]
#[repr(u64)]
enum Statistic {
  Schema = 0,
  NextInscriptionId = 1,
}

impl Statistic {
  fn key(self) -> u64 {
    self.into()
  }
}

impl From<Statistic> for u64 {
  fn from(statistic: Statistic) -> Self {
    statistic as u64
  }
}

const SCHEMA_VERSION: u64 = 1;

/// [`InscriptionStore`] over a single redb file. Rows are bincode encoded.
pub struct RedbStore {
  database: Database,
}

impl RedbStore {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
    let database = Database::create(path.as_ref())?;

    let wtx = database.begin_write()?;
    {
      wtx.open_table(INSCRIPTIONS)?;
      wtx.open_table(INSCRIPTION_CONTENT)?;
      wtx.open_table(STATUS_UPDATES)?;
      wtx.open_table(BLOCK_CHECKS)?;
      let mut statistics = wtx.open_table(STATISTIC_TO_COUNT)?;
      if statistics.get(Statistic::Schema.key())?.is_none() {
        statistics.insert(Statistic::Schema.key(), SCHEMA_VERSION)?;
      }
    }
    wtx.commit()?;

    log::debug!("opened inscription store at {}", path.as_ref().display());

    Ok(Self { database })
  }

  fn update<T>(
    &self,
    id: u64,
    f: impl FnOnce(&mut Inscription) -> T,
  ) -> Result<T, Error> {
    let wtx = self.database.begin_write()?;
    let result = {
      let mut inscriptions = wtx.open_table(INSCRIPTIONS)?;
      let mut inscription: Inscription =
        get_row(&inscriptions, id)?.ok_or(Error::NotFound(id))?;
      let result = f(&mut inscription);
      inscriptions.insert(id, encode(&inscription)?.as_slice())?;
      result
    };
    wtx.commit()?;
    Ok(result)
  }

  /// Single transaction status write. `decide` sees the current status and
  /// says whether to move; `f` edits the row alongside the move.
  fn write_status(
    &self,
    id: u64,
    status: Status,
    decide: impl FnOnce(Status) -> Result<bool, Error>,
    f: impl FnOnce(&mut Inscription),
  ) -> Result<(Status, bool), Error> {
    let wtx = self.database.begin_write()?;

    let (old, moved) = {
      let mut inscriptions = wtx.open_table(INSCRIPTIONS)?;
      let mut inscription: Inscription =
        get_row(&inscriptions, id)?.ok_or(Error::NotFound(id))?;
      let old = inscription.status;
      let moved = decide(old)?;
      if moved {
        inscription.status = status;
        f(&mut inscription);
        inscriptions.insert(id, encode(&inscription)?.as_slice())?;
      }
      (old, moved)
    };

    if !moved {
      wtx.abort()?;
      return Ok((old, false));
    }

    append(
      &wtx,
      STATUS_UPDATES,
      id,
      &StatusUpdate {
        old,
        new: status,
        timestamp: unix_now(),
      },
    )?;

    wtx.commit()?;

    Ok((old, true))
  }

  fn scan(&self, mut filter: impl FnMut(&Inscription) -> bool) -> Result<Vec<Inscription>, Error> {
    let rtx = self.database.begin_read()?;
    let inscriptions = rtx.open_table(INSCRIPTIONS)?;

    let mut matching = Vec::new();
    for entry in inscriptions.iter()? {
      let (_, value) = entry?;
      let inscription: Inscription = decode(value.value())?;
      if filter(&inscription) {
        matching.push(inscription);
      }
    }

    Ok(matching)
  }

  fn history<T: DeserializeOwned>(
    &self,
    definition: HistoryTable,
    id: u64,
  ) -> Result<Vec<T>, Error> {
    let rtx = self.database.begin_read()?;
    let table = rtx.open_table(definition)?;

    let mut rows = Vec::new();
    for entry in table.range((id, 0)..=(id, u64::MAX))? {
      let (_, value) = entry?;
      rows.push(decode(value.value())?);
    }

    Ok(rows)
  }
}

fn encode(value: &impl Serialize) -> Result<Vec<u8>, Error> {
  Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
  Ok(bincode::deserialize(bytes)?)
}

fn get_row<T: DeserializeOwned>(
  table: &impl ReadableTable<u64, &'static [u8]>,
  id: u64,
) -> Result<Option<T>, Error> {
  match table.get(id)? {
    Some(guard) => Ok(Some(decode(guard.value())?)),
    None => Ok(None),
  }
}

fn append(
  wtx: &WriteTransaction,
  definition: HistoryTable,
  id: u64,
  row: &impl Serialize,
) -> Result<(), Error> {
  let mut table = wtx.open_table(definition)?;

  let sequence = match table.range((id, 0)..=(id, u64::MAX))?.next_back() {
    Some(entry) => entry?.0.value().1 + 1,
    None => 0,
  };

  table.insert((id, sequence), encode(row)?.as_slice())?;

  Ok(())
}

fn remove_history(
  wtx: &WriteTransaction,
  definition: HistoryTable,
  id: u64,
) -> Result<(), Error> {
  let mut table = wtx.open_table(definition)?;

  let mut keys = Vec::new();
  for entry in table.range((id, 0)..=(id, u64::MAX))? {
    keys.push(entry?.0.value());
  }

  for key in keys {
    table.remove(key)?;
  }

  Ok(())
}

impl InscriptionStore for RedbStore {
  fn create_inscription(&self, inscription: NewInscription) -> Result<u64, Error> {
    let wtx = self.database.begin_write()?;

    let id = {
      let mut statistics = wtx.open_table(STATISTIC_TO_COUNT)?;
      let id = statistics
        .get(Statistic::NextInscriptionId.key())?
        .map(|guard| guard.value())
        .unwrap_or(1);
      statistics.insert(Statistic::NextInscriptionId.key(), id + 1)?;
      id
    };

    let inscription = inscription.into_inscription(id);

    wtx
      .open_table(INSCRIPTIONS)?
      .insert(id, encode(&inscription)?.as_slice())?;

    append(
      &wtx,
      BLOCK_CHECKS,
      id,
      &BlockCheck {
        height: inscription.created_block,
        timestamp: inscription.created_at,
      },
    )?;

    wtx.commit()?;

    Ok(id)
  }

  fn get_inscription(&self, id: u64) -> Result<Option<Inscription>, Error> {
    let rtx = self.database.begin_read()?;
    let row = get_row(&rtx.open_table(INSCRIPTIONS)?, id);
    row
  }

  fn get_inscriptions_by_sender(&self, sender: &str) -> Result<Vec<Inscription>, Error> {
    self.scan(|inscription| inscription.sender_address == sender)
  }

  fn get_inscriptions_by_status(&self, statuses: &[Status]) -> Result<Vec<Inscription>, Error> {
    self.scan(|inscription| statuses.contains(&inscription.status))
  }

  fn update_status(&self, id: u64, status: Status) -> Result<(), Error> {
    self.write_status(
      id,
      status,
      |current| {
        if current == status {
          Ok(false)
        } else if current.can_transition_to(status) {
          Ok(true)
        } else {
          Err(Error::InvalidTransition {
            id,
            from: current,
            to: status,
          })
        }
      },
      |_| {},
    )?;

    Ok(())
  }

  fn transition_status(&self, id: u64, expected: Status, status: Status) -> Result<bool, Error> {
    let (current, moved) = self.write_status(
      id,
      status,
      |current| Ok(current == expected && current != status && current.can_transition_to(status)),
      |_| {},
    )?;

    Ok(moved || (current == expected && expected == status))
  }

  fn status_history(&self, id: u64) -> Result<Vec<StatusUpdate>, Error> {
    self.history(STATUS_UPDATES, id)
  }

  fn prepare_reveal(
    &self,
    id: u64,
    expected: Status,
    commit_txid: &str,
    reveal_tx_hex: &str,
  ) -> Result<bool, Error> {
    let (_, moved) = self.write_status(
      id,
      Status::RevealReady,
      |current| Ok(current == expected && current.can_transition_to(Status::RevealReady)),
      |inscription| {
        inscription.commit_txid = Some(commit_txid.trim().into());
        inscription.reveal_tx_hex = Some(reveal_tx_hex.into());
      },
    )?;

    Ok(moved)
  }

  fn record_reveal_txid(&self, id: u64, reveal_txid: &str) -> Result<(), Error> {
    self.update(id, |inscription| {
      inscription.reveal_txid = Some(reveal_txid.into());
    })
  }

  fn record_block_check(&self, id: u64, height: u64) -> Result<(), Error> {
    let wtx = self.database.begin_write()?;

    let changed = {
      let mut inscriptions = wtx.open_table(INSCRIPTIONS)?;
      let mut inscription: Inscription =
        get_row(&inscriptions, id)?.ok_or(Error::NotFound(id))?;
      let changed = inscription.last_checked_block != height;
      if changed {
        inscription.last_checked_block = height;
        inscriptions.insert(id, encode(&inscription)?.as_slice())?;
      }
      changed
    };

    if !changed {
      wtx.abort()?;
      return Ok(());
    }

    append(
      &wtx,
      BLOCK_CHECKS,
      id,
      &BlockCheck {
        height,
        timestamp: unix_now(),
      },
    )?;

    wtx.commit()?;

    Ok(())
  }

  fn block_checks(&self, id: u64) -> Result<Vec<BlockCheck>, Error> {
    self.history(BLOCK_CHECKS, id)
  }

  fn delete_pending_for_sender(&self, sender: &str) -> Result<Vec<u64>, Error> {
    let wtx = self.database.begin_write()?;

    let ids = {
      let mut inscriptions = wtx.open_table(INSCRIPTIONS)?;

      let mut ids = Vec::new();
      for entry in inscriptions.iter()? {
        let (key, value) = entry?;
        let inscription: Inscription = decode(value.value())?;
        if inscription.sender_address == sender && inscription.status == Status::Pending {
          ids.push(key.value());
        }
      }

      for id in &ids {
        inscriptions.remove(id)?;
      }

      let mut content = wtx.open_table(INSCRIPTION_CONTENT)?;
      for id in &ids {
        content.remove(id)?;
      }

      ids
    };

    for id in &ids {
      remove_history(&wtx, STATUS_UPDATES, *id)?;
      remove_history(&wtx, BLOCK_CHECKS, *id)?;
    }

    wtx.commit()?;

    if !ids.is_empty() {
      log::info!("removed abandoned pending inscriptions {ids:?} for sender {sender}");
    }

    Ok(ids)
  }

  fn store_content(&self, id: u64, content: &StoredContent) -> Result<(), Error> {
    let wtx = self.database.begin_write()?;
    wtx
      .open_table(INSCRIPTION_CONTENT)?
      .insert(id, encode(content)?.as_slice())?;
    wtx.commit()?;
    Ok(())
  }

  fn fetch_content(&self, id: u64) -> Result<Option<StoredContent>, Error> {
    let rtx = self.database.begin_read()?;
    let row = get_row(&rtx.open_table(INSCRIPTION_CONTENT)?, id);
    row
  }
}

#[cfg(test)]
mod tests {
  use {super::*, crate::test::*, pretty_assertions::assert_eq, tempfile::NamedTempFile};

  fn store() -> (NamedTempFile, RedbStore) {
    let dbfile = NamedTempFile::new().unwrap();
    let store = RedbStore::open(dbfile.path()).unwrap();
    (dbfile, store)
  }

  #[test]
  fn create_and_get() {
    let (_dbfile, store) = store();

    let first = store.create_inscription(new_inscription("sender", 100)).unwrap();
    let second = store.create_inscription(new_inscription("sender", 100)).unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 2);

    let inscription = store.get_inscription(first).unwrap().unwrap();
    assert_eq!(inscription, new_inscription("sender", 100).into_inscription(1));
    assert_eq!(inscription.status, Status::Pending);

    assert_eq!(store.get_inscription(3).unwrap(), None);
    assert_eq!(
      store.block_checks(first).unwrap(),
      vec![BlockCheck {
        height: 100,
        timestamp: new_inscription("sender", 100).created_at,
      }]
    );
  }

  #[test]
  fn reopen_keeps_rows_and_ids() {
    let dbfile = NamedTempFile::new().unwrap();

    {
      let store = RedbStore::open(dbfile.path()).unwrap();
      store.create_inscription(new_inscription("sender", 1)).unwrap();
    }

    let store = RedbStore::open(dbfile.path()).unwrap();
    assert!(store.get_inscription(1).unwrap().is_some());
    assert_eq!(store.create_inscription(new_inscription("sender", 1)).unwrap(), 2);
  }

  #[test]
  fn update_status_appends_history() {
    let (_dbfile, store) = store();
    let id = store.create_inscription(new_inscription("sender", 1)).unwrap();

    store.update_status(id, Status::Paid).unwrap();
    store.update_status(id, Status::Paid).unwrap();
    store.update_status(id, Status::RevealReady).unwrap();

    let history = store.status_history(id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!((history[0].old, history[0].new), (Status::Pending, Status::Paid));
    assert_eq!(
      (history[1].old, history[1].new),
      (Status::Paid, Status::RevealReady)
    );
    assert_eq!(
      store.get_inscription(id).unwrap().unwrap().status,
      Status::RevealReady
    );

    assert!(matches!(
      store.update_status(99, Status::Paid),
      Err(Error::NotFound(99))
    ));
  }

  #[test]
  fn transition_status_is_compare_and_set() {
    let (_dbfile, store) = store();
    let id = store.create_inscription(new_inscription("sender", 1)).unwrap();

    assert!(store
      .transition_status(id, Status::Pending, Status::Scanning)
      .unwrap());
    assert!(!store
      .transition_status(id, Status::Pending, Status::Scanning)
      .unwrap());
    assert!(!store
      .transition_status(id, Status::Pending, Status::Paid)
      .unwrap());
    assert!(store
      .transition_status(id, Status::Scanning, Status::Pending)
      .unwrap());
    assert!(store
      .transition_status(id, Status::Pending, Status::Pending)
      .unwrap());

    assert_eq!(store.status_history(id).unwrap().len(), 2);
  }

  #[test]
  fn status_never_moves_backwards() {
    let (_dbfile, store) = store();
    let id = store.create_inscription(new_inscription("sender", 1)).unwrap();

    store.update_status(id, Status::Completed).unwrap();

    assert!(matches!(
      store.update_status(id, Status::Pending),
      Err(Error::InvalidTransition {
        from: Status::Completed,
        to: Status::Pending,
        ..
      })
    ));
    assert!(!store
      .transition_status(id, Status::Completed, Status::Paid)
      .unwrap());
    assert!(!store
      .transition_status(id, Status::Completed, Status::Scanning)
      .unwrap());

    assert_eq!(
      store.get_inscription(id).unwrap().unwrap().status,
      Status::Completed
    );
    assert_eq!(store.status_history(id).unwrap().len(), 1);
  }

  #[test]
  fn scanning_only_returns_to_pending() {
    let (_dbfile, store) = store();
    let id = store.create_inscription(new_inscription("sender", 1)).unwrap();

    store.update_status(id, Status::Scanning).unwrap();

    assert!(store.update_status(id, Status::Paid).is_err());
    assert!(!store
      .transition_status(id, Status::Scanning, Status::RevealReady)
      .unwrap());
    assert!(store
      .transition_status(id, Status::Scanning, Status::Pending)
      .unwrap());
  }

  #[test]
  fn concurrent_transitions_only_one_wins() {
    let (_dbfile, store) = store();
    let id = store.create_inscription(new_inscription("sender", 1)).unwrap();

    let winners = std::thread::scope(|scope| {
      let handles = (0..8)
        .map(|_| scope.spawn(|| store.transition_status(id, Status::Pending, Status::Scanning)))
        .collect::<Vec<_>>();

      handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .filter(|won| *won)
        .count()
    });

    assert_eq!(winners, 1);
    assert_eq!(store.status_history(id).unwrap().len(), 1);
  }

  #[test]
  fn record_block_check_skips_same_height() {
    let (_dbfile, store) = store();
    let id = store.create_inscription(new_inscription("sender", 10)).unwrap();

    store.record_block_check(id, 10).unwrap();
    store.record_block_check(id, 12).unwrap();
    store.record_block_check(id, 12).unwrap();

    let heights = store
      .block_checks(id)
      .unwrap()
      .into_iter()
      .map(|check| check.height)
      .collect::<Vec<_>>();

    assert_eq!(heights, vec![10, 12]);
    assert_eq!(store.get_inscription(id).unwrap().unwrap().last_checked_block, 12);
  }

  #[test]
  fn prepare_reveal_writes_artifacts_with_status() {
    let (_dbfile, store) = store();
    let id = store.create_inscription(new_inscription("sender", 1)).unwrap();

    assert!(store
      .prepare_reveal(id, Status::Pending, " abcd \n", "0200")
      .unwrap());
    store.record_reveal_txid(id, "ef01").unwrap();

    let inscription = store.get_inscription(id).unwrap().unwrap();
    assert_eq!(inscription.status, Status::RevealReady);
    assert_eq!(inscription.commit_txid.as_deref(), Some("abcd"));
    assert_eq!(inscription.reveal_tx_hex.as_deref(), Some("0200"));
    assert_eq!(inscription.reveal_txid.as_deref(), Some("ef01"));
    assert_eq!(
      store.status_history(id).unwrap().last().map(|update| update.new),
      Some(Status::RevealReady)
    );
  }

  #[test]
  fn prepare_reveal_from_stale_status_changes_nothing() {
    let (_dbfile, store) = store();
    let id = store.create_inscription(new_inscription("sender", 1)).unwrap();

    assert!(store
      .prepare_reveal(id, Status::Pending, "7777", "winner")
      .unwrap());
    assert!(!store
      .prepare_reveal(id, Status::Pending, "8888", "loser")
      .unwrap());

    let inscription = store.get_inscription(id).unwrap().unwrap();
    assert_eq!(inscription.commit_txid.as_deref(), Some("7777"));
    assert_eq!(inscription.reveal_tx_hex.as_deref(), Some("winner"));
    assert_eq!(store.status_history(id).unwrap().len(), 1);

    store.update_status(id, Status::Completed).unwrap();
    assert!(!store
      .prepare_reveal(id, Status::Completed, "9999", "late")
      .unwrap());
    assert_eq!(
      store.get_inscription(id).unwrap().unwrap().reveal_tx_hex.as_deref(),
      Some("winner")
    );
  }

  #[test]
  fn concurrent_reveals_store_exactly_one() {
    let (_dbfile, store) = store();
    let id = store.create_inscription(new_inscription("sender", 1)).unwrap();

    let winners = std::thread::scope(|scope| {
      let handles = (0..8u8)
        .map(|n| {
          let store = &store;
          scope.spawn(move || {
            let hex = format!("{n:02x}");
            store
              .prepare_reveal(id, Status::Pending, &hex.repeat(32), &hex)
              .unwrap()
              .then_some(hex)
          })
        })
        .collect::<Vec<_>>();

      handles
        .into_iter()
        .filter_map(|handle| handle.join().unwrap())
        .collect::<Vec<_>>()
    });

    assert_eq!(winners.len(), 1);

    let inscription = store.get_inscription(id).unwrap().unwrap();
    assert_eq!(inscription.reveal_tx_hex.as_ref(), Some(&winners[0]));
    assert_eq!(inscription.commit_txid, Some(winners[0].repeat(32)));
  }

  #[test]
  fn queries() {
    let (_dbfile, store) = store();
    let a = store.create_inscription(new_inscription("alice", 1)).unwrap();
    let b = store.create_inscription(new_inscription("bob", 1)).unwrap();
    let c = store.create_inscription(new_inscription("alice", 1)).unwrap();

    store.update_status(c, Status::Paid).unwrap();

    let ids = |inscriptions: Vec<Inscription>| {
      inscriptions
        .into_iter()
        .map(|inscription| inscription.id)
        .collect::<Vec<_>>()
    };

    assert_eq!(ids(store.get_inscriptions_by_sender("alice").unwrap()), vec![a, c]);
    assert_eq!(ids(store.get_pending_inscriptions().unwrap()), vec![a, b]);
    assert_eq!(
      ids(
        store
          .get_inscriptions_by_status(&[Status::Paid, Status::RevealReady])
          .unwrap()
      ),
      vec![c]
    );
  }

  #[test]
  fn delete_pending_for_sender() {
    let (_dbfile, store) = store();
    let pending = store.create_inscription(new_inscription("alice", 1)).unwrap();
    let paid = store.create_inscription(new_inscription("alice", 1)).unwrap();
    let other = store.create_inscription(new_inscription("bob", 1)).unwrap();

    store.update_status(paid, Status::Paid).unwrap();
    store
      .store_content(pending, &StoredContent::new(b"x".to_vec(), None, "text/plain"))
      .unwrap();

    assert_eq!(store.delete_pending_for_sender("alice").unwrap(), vec![pending]);

    assert_eq!(store.get_inscription(pending).unwrap(), None);
    assert_eq!(store.fetch_content(pending).unwrap(), None);
    assert!(store.block_checks(pending).unwrap().is_empty());
    assert!(store.get_inscription(paid).unwrap().is_some());
    assert!(store.get_inscription(other).unwrap().is_some());

    assert!(store.delete_pending_for_sender("alice").unwrap().is_empty());
  }

  #[test]
  fn content_round_trip() {
    let (_dbfile, store) = store();
    let id = store.create_inscription(new_inscription("sender", 1)).unwrap();

    let content = StoredContent::new(vec![0, 1, 2, 255], Some("a.bin".into()), "application/octet-stream");
    store.store_content(id, &content).unwrap();

    assert_eq!(store.fetch_content(id).unwrap(), Some(content));
    assert_eq!(store.fetch_content(id + 1).unwrap(), None);
  }
}
