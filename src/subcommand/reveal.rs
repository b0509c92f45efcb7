use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Reveal {
  #[arg(long, help = "Reveal inscription <ID>.")]
  pub(crate) id: u64,
  #[arg(long, help = "Spend the commit output of transaction <COMMIT_TXID>.")]
  pub(crate) commit_txid: String,
  #[arg(long, default_value = "0", help = "Spend output <VOUT> of the commit.")]
  pub(crate) vout: u32,
  #[arg(long, help = "The commit output holds <AMOUNT> sats.")]
  pub(crate) amount: u64,
  #[arg(long, help = "Re-supply the committed content from <FILE>.")]
  pub(crate) file: PathBuf,
}

impl Reveal {
  pub(crate) fn run(self, options: Options) -> SubcommandResult {
    let content = fs::read(&self.file)
      .with_context(|| format!("io error reading {}", self.file.display()))?;

    let result = options.service()?.create_reveal(
      self.id,
      &self.commit_txid,
      self.vout,
      self.amount,
      &content,
    )?;

    Ok(Box::new(result))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn vout_defaults_to_zero() {
    let arguments = Arguments::try_parse_from([
      "inscriber",
      "reveal",
      "--id",
      "3",
      "--commit-txid",
      "abc",
      "--amount",
      "5000",
      "--file",
      "hello.txt",
    ])
    .unwrap();

    match arguments.subcommand {
      Subcommand::Reveal(reveal) => {
        assert_eq!(reveal.id, 3);
        assert_eq!(reveal.vout, 0);
        assert_eq!(reveal.amount, 5000);
      }
      subcommand => panic!("unexpected subcommand: {subcommand:?}"),
    }
  }
}
