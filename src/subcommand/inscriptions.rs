use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Inscriptions {
  #[arg(help = "List inscriptions requested by <SENDER>.")]
  pub(crate) sender: String,
}

impl Inscriptions {
  pub(crate) fn run(self, options: Options) -> SubcommandResult {
    let inscriptions = options
      .open_store()?
      .get_inscriptions_by_sender(self.sender.trim())?
      .into_iter()
      .map(InscriptionSummary::from)
      .collect::<Vec<InscriptionSummary>>();

    Ok(Box::new(inscriptions))
  }
}
