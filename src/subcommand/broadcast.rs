use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Broadcast {
  #[arg(long, help = "Broadcast the reveal of inscription <ID>.")]
  pub(crate) id: u64,
  #[arg(long, help = "The inscription was requested by <SENDER>.")]
  pub(crate) sender: String,
}

impl Broadcast {
  pub(crate) fn run(self, options: Options) -> SubcommandResult {
    Ok(Box::new(
      options.service()?.broadcast_reveal(self.id, &self.sender)?,
    ))
  }
}
