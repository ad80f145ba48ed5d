//! Coordinator: accepts a fixed number of workers and arbitrates their reports
//!
//! The run moves through `awaiting workers -> sessions active -> done`. Each
//! accepted connection gets its own task; arbitration happens inside the
//! sessions through [`CoordinatorState::submit`].

pub mod session;
pub mod state;

pub use session::{
    run_session, SessionEvent, SessionOutcome, SessionPhase, SessionSummary, WorkerLink,
};
pub use state::{Arbitration, CoordinatorState};

use crate::protocol::CoordinatorCodec;
use crate::types::{SearchConfig, Solution};
use crate::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{error, info, warn};

/// Terminal outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A worker's report was recorded
    Solved(Solution),
    /// No session recorded a solution
    NoSolution,
}

/// Final report of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Solved or not
    pub outcome: RunOutcome,
    /// One summary per accepted worker, ordered by ordinal
    pub sessions: Vec<SessionSummary>,
}

impl RunReport {
    /// The recorded solution, if any
    pub fn solution(&self) -> Option<Solution> {
        match self.outcome {
            RunOutcome::Solved(solution) => Some(solution),
            RunOutcome::NoSolution => None,
        }
    }

    /// Number of sessions that exhausted their range
    pub fn exhausted_sessions(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.outcome == SessionOutcome::Exhausted)
            .count()
    }

    /// Number of sessions that ended with a transport failure
    pub fn failed_sessions(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| matches!(s.outcome, SessionOutcome::Failed { .. }))
            .count()
    }
}

/// Coordinator bound to a listening socket
pub struct Coordinator {
    listener: TcpListener,
    state: Arc<CoordinatorState>,
}

impl Coordinator {
    /// Validate the run and start listening on `addr`
    ///
    /// Partitioning is checked before the socket is bound.
    pub async fn bind(addr: SocketAddr, config: SearchConfig, total_workers: usize) -> Result<Self> {
        let state = Arc::new(CoordinatorState::new(config, total_workers)?);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::transport(format!("Failed to bind to {}: {}", addr, e)))?;

        info!("Listening on {}", listener.local_addr()?);
        Ok(Self { listener, state })
    }

    /// Address the coordinator listens on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared run state
    pub fn state(&self) -> &Arc<CoordinatorState> {
        &self.state
    }

    /// Accept exactly `total_workers` workers and wait for every session
    ///
    /// Failed accepts are logged and do not use up a worker slot.
    pub async fn run(self) -> Result<RunReport> {
        let total = self.state.total_workers();
        let nonce_length = self.state.config().nonce_length();
        let mut sessions: Vec<(usize, JoinHandle<SessionSummary>)> = Vec::with_capacity(total);

        info!("Waiting for {} workers", total);
        while sessions.len() < total {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept worker connection: {}", e);
                    continue;
                }
            };

            let ordinal = self.state.register()?;
            info!("Worker {} connected from {}", ordinal, peer);

            let link = Framed::new(stream, CoordinatorCodec::new(nonce_length));
            let handle = tokio::spawn(run_session(Arc::clone(&self.state), ordinal, link));
            sessions.push((ordinal, handle));
        }
        info!("All {} workers connected", total);

        let mut summaries = Vec::with_capacity(total);
        for (ordinal, handle) in sessions {
            match handle.await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!("Session task for worker {} failed: {}", ordinal, e);
                    summaries.push(SessionSummary {
                        ordinal,
                        range: self.state.work_range(ordinal).ok(),
                        outcome: SessionOutcome::Failed {
                            phase: SessionPhase::AwaitingEvent,
                            error: e.to_string(),
                            transport: false,
                        },
                    });
                }
            }
        }
        summaries.sort_by_key(|s| s.ordinal);

        let outcome = match self.state.solution() {
            Some(solution) => RunOutcome::Solved(solution),
            None => RunOutcome::NoSolution,
        };

        Ok(RunReport {
            outcome,
            sessions: summaries,
        })
    }
}
