use rand::Rng;

use crate::sync::{spin_hint, yield_now};

const SPIN_LIMIT: u32 = 6;
const YIELD_LIMIT: u32 = 10;

/// Waiting strategy for try-and-retry loops.
///
/// The first few rounds spin for an exponentially growing, jittered number of
/// iterations; after that every round yields the thread. The jitter keeps two
/// neighbours that keep knocking each other out from retrying in lockstep.
pub(crate) struct Backoff {
    step: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn snooze(&mut self) {
        if self.step <= SPIN_LIMIT {
            let spins = rand::rng().random_range(1..=1u32 << self.step);
            for _ in 0..spins {
                spin_hint();
            }
        } else {
            yield_now();
        }
        if self.step <= YIELD_LIMIT {
            self.step += 1;
        }
    }

    pub fn rounds(&self) -> u32 {
        self.step
    }
}
