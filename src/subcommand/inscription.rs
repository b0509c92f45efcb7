use super::*;

#[derive(Debug, Parser)]
pub(crate) struct ShowInscription {
  #[arg(help = "Show inscription <ID>.")]
  pub(crate) id: u64,
}

impl ShowInscription {
  pub(crate) fn run(self, options: Options) -> SubcommandResult {
    let store = options.open_store()?;

    let inscription = store
      .get_inscription(self.id)?
      .ok_or_else(|| anyhow!("inscription {} not found", self.id))?;

    Ok(Box::new(InscriptionSummary::from(inscription)))
  }
}
