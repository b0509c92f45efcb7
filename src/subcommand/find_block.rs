use {super::*, crate::reconcile::find_block_near_time};

#[derive(Debug, Parser)]
pub(crate) struct FindBlock {
  #[arg(help = "Find the block whose timestamp is closest to <TIME> (unix seconds).")]
  pub(crate) time: i64,
  #[arg(long, help = "Check parent links from the result down to genesis.")]
  pub(crate) verify: bool,
}

impl FindBlock {
  pub(crate) fn run(self, options: Options) -> SubcommandResult {
    let client = options.bitcoin_rpc_client(&options.load_config()?)?;

    Ok(Box::new(find_block_near_time(
      &client,
      self.time,
      self.verify,
    )?))
  }
}
