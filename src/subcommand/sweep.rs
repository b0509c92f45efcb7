use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Sweep {
  #[arg(
    long,
    help = "Keep sweeping every <INTERVAL> seconds until interrupted."
  )]
  pub(crate) interval: Option<u64>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Output {
  pub passes: u64,
  pub last: Option<SweepReport>,
}

impl Sweep {
  pub(crate) fn run(self, options: Options) -> SubcommandResult {
    let reconciler = options.reconciler()?;

    let Some(interval) = self.interval else {
      return Ok(Box::new(reconciler.sweep()?));
    };

    let mut output = Output {
      passes: 0,
      last: None,
    };

    while !SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
      match reconciler.sweep() {
        Ok(report) => output.last = Some(report),
        Err(err) => log::error!("sweep failed: {err}"),
      }

      output.passes += 1;

      sleep(Duration::from_secs(interval));
    }

    log::info!("sweep loop stopped after {} passes", output.passes);

    Ok(Box::new(output))
  }
}

/// Sleeps in short steps so an interrupt is noticed promptly.
fn sleep(duration: Duration) {
  let step = Duration::from_millis(200);
  let start = Instant::now();

  while start.elapsed() < duration && !SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
    thread::sleep(step.min(duration.saturating_sub(start.elapsed())));
  }
}
