use {
  super::{Error, Reconciler},
  crate::{
    inscription::{Inscription, Status},
    node::NodeRpc,
    store::InscriptionStore,
  },
  rayon::prelude::*,
  serde::Serialize,
};

/// Statuses a sweep picks up.
pub const SWEEP_STATUSES: [Status; 3] = [Status::Pending, Status::Paid, Status::RevealReady];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepEntry {
  pub id: u64,
  pub from: Status,
  pub to: Option<Status>,
  pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub height: u64,
  pub processed: usize,
  pub completed: usize,
  pub failed: usize,
  pub entries: Vec<SweepEntry>,
}

impl<N: NodeRpc, S: InscriptionStore> Reconciler<N, S> {
  /// Runs [`Reconciler::process_inscription`] over every pending, paid and
  /// reveal-ready inscription in parallel. A failing inscription is recorded
  /// in the report and never stops the others.
  pub fn sweep(&self) -> Result<SweepReport, Error> {
    let height = self.current_height()?;
    let inscriptions = self.store().get_inscriptions_by_status(&SWEEP_STATUSES)?;

    log::info!(
      "sweeping {} inscriptions at height {height}",
      inscriptions.len()
    );

    let entries = inscriptions
      .par_iter()
      .map(|inscription| self.sweep_one(inscription, height))
      .collect::<Vec<SweepEntry>>();

    let report = SweepReport {
      height,
      processed: entries.len(),
      completed: entries
        .iter()
        .filter(|entry| entry.to == Some(Status::Completed))
        .count(),
      failed: entries.iter().filter(|entry| entry.error.is_some()).count(),
      entries,
    };

    log::info!(
      "sweep done: {} processed, {} completed, {} failed",
      report.processed,
      report.completed,
      report.failed
    );

    Ok(report)
  }

  fn sweep_one(&self, inscription: &Inscription, height: u64) -> SweepEntry {
    match self.process_inscription(inscription.id, height) {
      Ok(status) => SweepEntry {
        id: inscription.id,
        from: inscription.status,
        to: Some(status),
        error: None,
      },
      Err(err) => {
        match err {
          Error::StateConflict { .. } | Error::ConcurrentUpdate { .. } => log::warn!("inscription {}: {err}", inscription.id),
          _ => log::error!("failed to process inscription {}: {err}", inscription.id),
        }

        SweepEntry {
          id: inscription.id,
          from: inscription.status,
          to: None,
          error: Some(err.to_string()),
        }
      }
    }
  }
}
