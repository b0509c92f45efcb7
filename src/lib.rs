#![allow(clippy::too_many_arguments, clippy::result_large_err)]
#![deny(
  clippy::cast_lossless,
  clippy::cast_possible_truncation,
  clippy::cast_possible_wrap,
  clippy::cast_sign_loss
)]

use {
  self::{
    arguments::Arguments,
    chain::Chain,
    config::Config,
    options::Options,
    service::InscriptionSummary,
    subcommand::{Subcommand, SubcommandResult},
  },
  anyhow::{anyhow, Context, Error},
  bitcoin::Network,
  chrono::{DateTime, TimeZone, Utc},
  clap::Parser,
  serde::{Deserialize, Serialize},
  std::{
    env,
    fmt::{self, Display, Formatter},
    fs,
    path::{Path, PathBuf},
    process,
    str::FromStr,
    sync::atomic::{self, AtomicBool},
    thread,
    time::{Duration, Instant, SystemTime},
  },
};

pub use crate::{
  engine::{Commit, Engine, EngineConfig},
  inscription::{BlockCheck, Inscription, NewInscription, Status, StatusUpdate},
  node::{BitcoinRpcClient, NodeClientConfig, NodeRpc, RpcError},
  reconcile::{PaymentCheck, Reconciler, ReconcilerConfig, SweepReport},
  service::Service,
  store::{InscriptionStore, RedbStore, StoredContent},
};

#[cfg(test)]
mod test;

mod arguments;
mod chain;
pub mod codec;
mod config;
pub mod engine;
pub mod inscription;
mod logger;
pub mod node;
mod options;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod subcommand;

type Result<T = (), E = Error> = std::result::Result<T, E>;

static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

fn timestamp(seconds: i64) -> DateTime<Utc> {
  Utc
    .timestamp_opt(seconds, 0)
    .single()
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn unix_now() -> i64 {
  SystemTime::now()
    .duration_since(SystemTime::UNIX_EPOCH)
    .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
    .unwrap_or_default()
}

pub fn main() {
  let args = Arguments::parse();

  let log_dir = match args.options.log_dir() {
    Ok(dir) => dir,
    Err(err) => {
      eprintln!("error: failed to resolve log directory: {err}");
      process::exit(1);
    }
  };

  if let Err(err) = logger::init(args.options.log_level(), log_dir) {
    eprintln!("error: failed to initialize logger: {err}");
    process::exit(1);
  }

  if let Err(err) = ctrlc::set_handler(move || {
    if SHUTTING_DOWN.fetch_or(true, atomic::Ordering::Relaxed) {
      process::exit(1);
    }

    println!("Shutting down gracefully. Press <CTRL-C> again to shutdown immediately.");
  }) {
    log::warn!("failed to install <CTRL-C> handler: {err}");
  }

  match args.run() {
    Err(err) => {
      eprintln!("error: {err}");
      err
        .chain()
        .skip(1)
        .for_each(|cause| eprintln!("because: {cause}"));
      if env::var_os("RUST_BACKTRACE")
        .map(|val| val == "1")
        .unwrap_or_default()
      {
        eprintln!("{}", err.backtrace());
      }

      process::exit(1);
    }
    Ok(output) => output.print_json(),
  }
}
