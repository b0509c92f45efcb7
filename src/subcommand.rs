use super::*;

pub mod broadcast;
pub mod commit;
pub mod find_block;
pub mod inscription;
pub mod inscriptions;
pub mod reveal;
pub mod status;
pub mod sweep;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
  #[command(about = "Create a commit address for an inscription")]
  Commit(commit::Commit),
  #[command(about = "Sign the reveal transaction for a funded commit")]
  Reveal(reveal::Reveal),
  #[command(about = "Check whether an inscription has been paid")]
  Status(status::Status),
  #[command(about = "Broadcast a signed reveal transaction")]
  Broadcast(broadcast::Broadcast),
  #[command(about = "Drive every open inscription forward")]
  Sweep(sweep::Sweep),
  #[command(about = "Show an inscription")]
  Inscription(inscription::ShowInscription),
  #[command(about = "List a sender's inscriptions")]
  Inscriptions(inscriptions::Inscriptions),
  #[command(about = "Find the block closest to a unix timestamp")]
  FindBlock(find_block::FindBlock),
}

impl Subcommand {
  pub(crate) fn run(self, options: Options) -> SubcommandResult {
    match self {
      Self::Commit(commit) => commit.run(options),
      Self::Reveal(reveal) => reveal.run(options),
      Self::Status(status) => status.run(options),
      Self::Broadcast(broadcast) => broadcast.run(options),
      Self::Sweep(sweep) => sweep.run(options),
      Self::Inscription(inscription) => inscription.run(options),
      Self::Inscriptions(inscriptions) => inscriptions.run(options),
      Self::FindBlock(find_block) => find_block.run(options),
    }
  }
}

pub trait Output: Send {
  fn print_json(&self);
}

impl<T> Output for T
where
  T: Serialize + Send,
{
  fn print_json(&self) {
    if let Err(err) = serde_json::to_writer_pretty(std::io::stdout(), self) {
      eprintln!("error: failed to write output: {err}");
      return;
    }
    println!();
  }
}

pub(crate) type SubcommandResult = Result<Box<dyn Output>>;
