//! State shared by all sessions of one run

use crate::nonce::NonceCodec;
use crate::partition::Partitioner;
use crate::types::{Candidate, SearchConfig, Solution, WorkRange};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Result of submitting a reported candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arbitration {
    /// The candidate is now the run's solution
    Accepted,
    /// Another session recorded a solution first
    Discarded {
        /// The solution already on record
        winner: Solution,
    },
}

/// Process-wide coordinator state
///
/// Config and partitioning are immutable. The solution record is the only
/// field that needs cross-session consistency and sits behind the one lock.
#[derive(Debug)]
pub struct CoordinatorState {
    config: SearchConfig,
    partitioner: Partitioner,
    connected: AtomicUsize,
    found: AtomicBool,
    solution: Mutex<Option<Solution>>,
}

impl CoordinatorState {
    /// Create the state for `total_workers` workers
    ///
    /// Fails with [`Error::SpaceOverflow`] or a config error before any
    /// worker is accepted if the space cannot be partitioned.
    pub fn new(config: SearchConfig, total_workers: usize) -> Result<Self> {
        let codec = NonceCodec::new(config.nonce_length(), config.charset().clone())?;
        let partitioner = Partitioner::new(codec, total_workers)?;

        Ok(Self {
            config,
            partitioner,
            connected: AtomicUsize::new(0),
            found: AtomicBool::new(false),
            solution: Mutex::new(None),
        })
    }

    /// The search configuration sent to every worker
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Number of workers the run waits for
    pub fn total_workers(&self) -> usize {
        self.partitioner.total_workers()
    }

    /// Number of workers registered so far
    pub fn connected_workers(&self) -> usize {
        self.connected.load(Ordering::Acquire)
    }

    /// Size of the whole search space
    pub fn search_space(&self) -> u64 {
        self.partitioner.space()
    }

    /// Claim the next unused worker ordinal
    pub fn register(&self) -> Result<usize> {
        let total = self.total_workers();
        self.connected
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < total).then_some(n + 1))
            .map_err(|_| Error::invalid_state(format!("All {} worker slots are taken", total)))
    }

    /// Nonce range of worker `ordinal`
    pub fn work_range(&self, ordinal: usize) -> Result<WorkRange> {
        self.partitioner.work_range(ordinal)
    }

    /// Record `candidate` as the solution unless one is already recorded
    ///
    /// First caller to take the lock wins, regardless of where the candidate
    /// lies in the search space.
    pub fn submit(&self, worker: usize, candidate: Candidate) -> Arbitration {
        let mut solution = self.solution.lock();
        match *solution {
            Some(winner) => Arbitration::Discarded { winner },
            None => {
                *solution = Some(Solution { worker, candidate });
                self.found.store(true, Ordering::Release);
                Arbitration::Accepted
            }
        }
    }

    /// Whether a solution has been recorded
    pub fn is_found(&self) -> bool {
        self.found.load(Ordering::Acquire)
    }

    /// The recorded solution, if any
    pub fn solution(&self) -> Option<Solution> {
        *self.solution.lock()
    }
}
