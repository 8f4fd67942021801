use std::collections::HashMap;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::models::{AddressOutcome, MergedResult};
use crate::stats::StatsFetcher;

/// Split a list into contiguous chunks. Fewer items than workers collapses
/// to a single chunk; otherwise every worker gets `len / workers` items and
/// the last one takes the remainder. Concatenating the chunks always
/// reproduces the input.
pub fn partition<T: Clone>(items: &[T], workers: usize) -> Vec<Vec<T>> {
    let workers = workers.max(1);
    if items.is_empty() {
        return Vec::new();
    }
    if items.len() < workers {
        return vec![items.to_vec()];
    }

    let offset = items.len() / workers;
    (0..workers)
        .map(|index| {
            let start = index * offset;
            let end = if index + 1 == workers {
                items.len()
            } else {
                start + offset
            };
            items[start..end].to_vec()
        })
        .collect()
}

/// Fans address chunks out across tokio tasks and merges their private
/// result maps once all of them have finished. Workers share nothing
/// mutable; the merge below is the only writer of the final map.
pub struct BatchCoordinator {
    fetcher: StatsFetcher,
    workers: usize,
    fail_fast: bool,
}

impl BatchCoordinator {
    pub fn new(fetcher: StatsFetcher, workers: usize, fail_fast: bool) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
            fail_fast,
        }
    }

    pub async fn run(&self, addresses: &[String]) -> Result<MergedResult> {
        let chunks = partition(addresses, self.workers);
        info!(
            "dispatching {} addresses across {} workers",
            addresses.len(),
            chunks.len()
        );

        let mut tasks = JoinSet::new();
        for (index, chunk) in chunks.into_iter().enumerate() {
            let fetcher = self.fetcher.clone();
            let fail_fast = self.fail_fast;
            tasks.spawn(async move { collect_chunk(fetcher, fail_fast, index + 1, chunk).await });
        }

        let mut merged = MergedResult::with_capacity(addresses.len());
        while let Some(joined) = tasks.join_next().await {
            match joined.context("stats worker panicked")? {
                Ok(results) => merged.extend(results),
                Err(err) => {
                    tasks.abort_all();
                    return Err(err);
                }
            }
        }
        Ok(merged)
    }
}

/// One worker: walk the chunk strictly in order, one address at a time.
/// Failures stay isolated to their address unless the run is fail-fast.
async fn collect_chunk(
    fetcher: StatsFetcher,
    fail_fast: bool,
    worker: usize,
    addresses: Vec<String>,
) -> Result<HashMap<String, AddressOutcome>> {
    info!("worker {} started with {} addresses", worker, addresses.len());

    let mut results = HashMap::with_capacity(addresses.len());
    for address in addresses {
        match fetcher.address_stats(&address).await {
            Ok(stats) => {
                results.insert(address, AddressOutcome::Stats(stats));
            }
            Err(err) if fail_fast => {
                return Err(err.context(format!("collecting stats for {}", address)));
            }
            Err(err) => {
                warn!("worker {}: {} failed: {:#}", worker, address, err);
                results.insert(
                    address,
                    AddressOutcome::Failed {
                        error: format!("{:#}", err),
                    },
                );
            }
        }
    }
    Ok(results)
}
