use std::fmt;

use rayon::prelude::*;
use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};

use crate::forest::Forest;
use crate::node::NodeId;
use crate::removal::RemovalStrategy;
use crate::sync::RawLock;

#[derive(Debug)]
pub enum PartitionError {
    NoThreads,
    ThreadPool(ThreadPoolBuildError),
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionError::NoThreads => {
                write!(f, "partitioned removal needs at least one thread")
            }
            PartitionError::ThreadPool(err) => {
                write!(f, "failed to build removal pool: {}", err)
            }
        }
    }
}

impl std::error::Error for PartitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PartitionError::NoThreads => None,
            PartitionError::ThreadPool(err) => Some(err),
        }
    }
}

impl From<ThreadPoolBuildError> for PartitionError {
    fn from(err: ThreadPoolBuildError) -> Self {
        PartitionError::ThreadPool(err)
    }
}

impl<T: Sync, L: RawLock> Forest<T, L> {
    /// Remove every node in `nodes`, split into `threads` contiguous blocks that are
    /// processed in parallel on a dedicated pool of `threads` workers.
    ///
    /// Within a block, nodes are removed in slice order. With one thread everything runs
    /// on the calling thread. `strategy` must be thread safe when `threads > 1`.
    pub fn remove_partitioned(
        &self,
        nodes: &[NodeId],
        threads: usize,
        strategy: RemovalStrategy,
    ) -> Result<(), PartitionError> {
        if threads == 0 {
            return Err(PartitionError::NoThreads);
        }
        debug_assert!(
            threads == 1 || strategy.is_thread_safe(),
            "{} cannot run on {} threads",
            strategy,
            threads
        );
        debug_println!(
            "removing {} nodes on {} threads with {}",
            nodes.len(),
            threads,
            strategy
        );

        if threads == 1 || nodes.len() <= 1 {
            for &id in nodes {
                self.remove(id, strategy);
            }
            return Ok(());
        }

        let block_len = nodes.len().div_ceil(threads);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("forest-remove-{}", i))
            .build()?;
        pool.install(|| {
            nodes.par_chunks(block_len).for_each(|block| {
                for &id in block {
                    self.remove(id, strategy);
                }
            });
        });
        Ok(())
    }
}
