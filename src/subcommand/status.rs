use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Status {
  #[arg(long, help = "Check inscription <ID>.")]
  pub(crate) id: u64,
  #[arg(long, help = "The inscription's payment address is <ADDRESS>.")]
  pub(crate) address: String,
  #[arg(long, help = "The inscription requires <AMOUNT> sats.")]
  pub(crate) amount: u64,
  #[arg(long, help = "The inscription was requested by <SENDER>.")]
  pub(crate) sender: String,
}

impl Status {
  pub(crate) fn run(self, options: Options) -> SubcommandResult {
    Ok(Box::new(options.service()?.check_payment_status(
      self.id,
      &self.address,
      self.amount,
      &self.sender,
    )?))
  }
}
