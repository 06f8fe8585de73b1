//! Batch planning
//!
//! Case cost is unknown and roughly uncorrelated with declaration order, so
//! sources are shuffled before being cut into one batch per worker. The RNG
//! has a fixed seed: the same inputs always produce the same batches, run
//! after run.
//!
//! `StdRng` is ChaCha12 under rand 0.8 but rand does not promise to keep it
//! that way across releases. Batch assignment is reproducible for a given
//! `Cargo.lock`; bumping rand may reshuffle every job.

use crate::harness::queue::{FlagSet, WorkItem};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Seed for the batch shuffle
pub const SHUFFLE_SEED: u64 = 1;

/// Splits jobs into near-equal batches
pub struct BatchPlanner {
    parallelism: usize,
    rng: StdRng,
}

impl BatchPlanner {
    /// Create a planner targeting `parallelism` batches per job
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
            rng: StdRng::seed_from_u64(SHUFFLE_SEED),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Batch size for `count` sources: `ceil(count / parallelism)`, at least 1
    pub fn batch_size(&self, count: usize) -> usize {
        count.div_ceil(self.parallelism).max(1)
    }

    /// Shuffle and partition `sources` into work items sharing `flags`.
    ///
    /// The RNG carries over between calls, so a run's sequence of jobs is
    /// reproducible as a whole.
    pub fn plan(&mut self, mut sources: Vec<String>, flags: FlagSet) -> Vec<WorkItem> {
        if sources.is_empty() {
            return Vec::new();
        }

        sources.shuffle(&mut self.rng);

        let size = self.batch_size(sources.len());
        sources
            .chunks(size)
            .filter_map(|chunk| WorkItem::new(chunk.to_vec(), flags.clone()))
            .collect()
    }
}
