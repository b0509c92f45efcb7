use {
  super::*,
  log::LevelFilter,
  log4rs::{
    append::{
      console::{ConsoleAppender, Target},
      rolling_file::{
        policy::compound::{
          roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
        },
        RollingFileAppender,
      },
    },
    config::{Appender, Config as LogConfig, Logger, Root},
    encode::pattern::PatternEncoder,
    Handle,
  },
};

const LOG_FILE: &str = "inscriber.log";
const ARCHIVE_PATTERN: &str = "inscriber.{}.log.gz";
const MAX_LOG_SIZE: u64 = 64 * 1024 * 1024;
const MAX_ARCHIVES: u32 = 16;
const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

fn level(level: &str) -> Result<LevelFilter> {
  LevelFilter::from_str(level).map_err(|_| anyhow!("invalid log level `{level}`"))
}

fn config(level: LevelFilter, log_dir: &Path) -> Result<LogConfig> {
  let roller = FixedWindowRoller::builder()
    .build(
      &log_dir.join(ARCHIVE_PATTERN).to_string_lossy(),
      MAX_ARCHIVES,
    )
    .map_err(|err| anyhow!(err))?;

  let file = RollingFileAppender::builder()
    .encoder(Box::new(PatternEncoder::new(PATTERN)))
    .build(
      log_dir.join(LOG_FILE),
      Box::new(CompoundPolicy::new(
        Box::new(SizeTrigger::new(MAX_LOG_SIZE)),
        Box::new(roller),
      )),
    )?;

  // stdout carries command output
  let console = ConsoleAppender::builder()
    .target(Target::Stderr)
    .encoder(Box::new(PatternEncoder::new(PATTERN)))
    .build();

  Ok(
    LogConfig::builder()
      .appender(Appender::builder().build("console", Box::new(console)))
      .appender(Appender::builder().build("file", Box::new(file)))
      .logger(Logger::builder().build("bitcoincore_rpc", LevelFilter::Warn))
      .logger(Logger::builder().build("jsonrpc", LevelFilter::Warn))
      .build(
        Root::builder()
          .appender("console")
          .appender("file")
          .build(level),
      )?,
  )
}

pub(crate) fn init(level_name: &str, log_dir: impl AsRef<Path>) -> Result<Handle> {
  let log_dir = log_dir.as_ref();

  fs::create_dir_all(log_dir)
    .with_context(|| format!("failed to create log dir `{}`", log_dir.display()))?;

  let handle = log4rs::init_config(config(level(level_name)?, log_dir)?)?;

  log::debug!("logging to {}", log_dir.join(LOG_FILE).display());

  Ok(handle)
}
