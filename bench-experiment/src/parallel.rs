use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::Result;

/// Parallel evaluation configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Enable parallel evaluation
    pub enabled: bool,
    /// Number of threads to use (None = use rayon default)
    pub num_threads: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_threads: None,
        }
    }
}

/// Partitions handed to each worker thread.
const PARTITIONS_PER_THREAD: usize = 4;

/// Apply `work` to contiguous ranges covering `0..count`.
///
/// `split` receives the desired number of ranges and returns them. When
/// parallelism is disabled, `work` runs once over the whole range on the
/// calling thread. Results come back in range order; the first error wins.
pub fn map_partitions<T, S, F>(
    count: usize,
    split: S,
    work: F,
    config: &ParallelConfig,
) -> Result<Vec<T>>
where
    T: Send,
    S: Fn(usize) -> Vec<Range<usize>> + Send + Sync,
    F: Fn(Range<usize>) -> Result<T> + Send + Sync,
{
    if !config.enabled || count < 2 {
        return Ok(vec![work(0..count)?]);
    }

    let run_all = || {
        split(rayon::current_num_threads() * PARTITIONS_PER_THREAD)
            .into_par_iter()
            .map(&work)
            .collect::<Result<Vec<T>>>()
    };
    match config.num_threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(run_all),
        None => run_all(),
    }
}
