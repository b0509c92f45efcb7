use {
  super::{Error, Step},
  crate::node::{BlockHeader, HashOrHeight, NodeRpc},
};

/// Binary searches `[0, tip]` for the block whose timestamp is closest to
/// `target` (unix seconds). Block times are only roughly monotonic, so the
/// result is an approximation suitable for bounding a rescan.
///
/// With `verify` set, walks parent hashes from the result down to genesis and
/// fails with [`Error::Consistency`] if any parent's height is not exactly one
/// less than its child's.
pub fn find_block_near_time<N: NodeRpc + ?Sized>(
  node: &N,
  target: i64,
  verify: bool,
) -> Result<BlockHeader, Error> {
  let rpc = |source| Error::Rpc {
    step: Step::BlockSearch,
    wallet: None,
    source,
  };

  let tip = node.get_block_count().map_err(rpc)?;

  let mut low = 0;
  let mut high = tip;
  let mut best: Option<BlockHeader> = None;

  while low <= high {
    let mid = low + (high - low) / 2;
    let header = node
      .get_block_header(HashOrHeight::Height(mid))
      .map_err(rpc)?;

    if best
      .as_ref()
      .map(|best| header.time.abs_diff(target) < best.time.abs_diff(target))
      .unwrap_or(true)
    {
      best = Some(header.clone());
    }

    if header.time < target {
      low = mid + 1;
    } else if mid == 0 {
      break;
    } else {
      high = mid - 1;
    }
  }

  let best = best.ok_or_else(|| Error::Consistency("no blocks to search".into()))?;

  log::info!(
    "block {} at height {} is closest to {target} (time {})",
    best.hash,
    best.height,
    best.time
  );

  if verify {
    verify_continuity(node, &best)?;
  }

  Ok(best)
}

fn verify_continuity<N: NodeRpc + ?Sized>(node: &N, start: &BlockHeader) -> Result<(), Error> {
  let mut current = start.clone();

  while current.height > 0 {
    let previous = current.previous_block_hash.ok_or_else(|| {
      Error::Consistency(format!(
        "block {} at height {} has no parent",
        current.hash, current.height
      ))
    })?;

    let parent = node
      .get_block_header(HashOrHeight::Hash(previous))
      .map_err(|source| Error::Rpc {
        step: Step::BlockSearch,
        wallet: None,
        source,
      })?;

    if parent.height + 1 != current.height {
      return Err(Error::Consistency(format!(
        "parent {} has height {}, child {} has height {}",
        parent.hash, parent.height, current.hash, current.height
      )));
    }

    current = parent;
  }

  log::debug!("verified chain continuity from height {}", start.height);

  Ok(())
}
