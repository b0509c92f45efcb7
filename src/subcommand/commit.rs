use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Commit {
  #[arg(long, help = "Inscribe the contents of <FILE>.")]
  pub(crate) file: PathBuf,
  #[arg(long, help = "Pay <FEE_RATE> sats/vB for the reveal transaction.")]
  pub(crate) fee_rate: f64,
  #[arg(long, help = "Send the inscription to <RECIPIENT>.")]
  pub(crate) recipient: String,
  #[arg(long, help = "Record the request as coming from <SENDER>.")]
  pub(crate) sender: String,
}

impl Commit {
  pub(crate) fn run(self, options: Options) -> SubcommandResult {
    let content = fs::read(&self.file)
      .with_context(|| format!("io error reading {}", self.file.display()))?;

    let filename = self
      .file
      .file_name()
      .map(|name| name.to_string_lossy().into_owned());

    let result = options.service()?.create_commit(
      &content,
      filename,
      self.fee_rate,
      &self.recipient,
      &self.sender,
    )?;

    Ok(Box::new(result))
  }
}
