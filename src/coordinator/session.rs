//! Per-worker session state machine
//!
//! A session assigns the config and range, waits for one event from the
//! worker, arbitrates a report and finally sends the stop signal.

use super::state::{Arbitration, CoordinatorState};
use crate::protocol::{CoordinatorCodec, ServerMessage};
use crate::types::{Candidate, SearchConfig, WorkRange};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// What a worker did after receiving its range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The worker found a nonce meeting the difficulty
    Report(Candidate),
    /// The worker closed its side without reporting
    Exhausted,
}

/// Connection to one worker as seen by its session
///
/// `await_event` blocks without a timeout; a worker that never reports and
/// never closes keeps its session waiting.
#[async_trait]
pub trait WorkerLink: Send {
    /// Send the search config followed by the work range
    async fn assign(&mut self, config: &SearchConfig, range: WorkRange) -> Result<()>;

    /// Wait for the worker's report or end of stream
    async fn await_event(&mut self) -> Result<SessionEvent>;

    /// Send the stop signal and close the connection
    async fn stop(&mut self) -> Result<()>;
}

#[async_trait]
impl<T> WorkerLink for Framed<T, CoordinatorCodec>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn assign(&mut self, config: &SearchConfig, range: WorkRange) -> Result<()> {
        self.feed(ServerMessage::Config(config.clone())).await?;
        self.send(ServerMessage::Range(range)).await
    }

    async fn await_event(&mut self) -> Result<SessionEvent> {
        match self.next().await {
            Some(Ok(candidate)) => Ok(SessionEvent::Report(candidate)),
            Some(Err(e)) => Err(e),
            None => Ok(SessionEvent::Exhausted),
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.send(ServerMessage::Stop).await?;
        SinkExt::<ServerMessage>::close(self).await
    }
}

/// Step of the session a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Computing and sending the config and range
    Assigning,
    /// Waiting for a report or end of stream
    AwaitingEvent,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Assigning => write!(f, "assigning"),
            SessionPhase::AwaitingEvent => write!(f, "awaiting event"),
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The worker's report became the solution
    Won(Candidate),
    /// The worker reported after another session had won
    Discarded(Candidate),
    /// The worker searched its range without a solution
    Exhausted,
    /// The session failed; the range stays unexplored
    Failed {
        /// Step that failed
        phase: SessionPhase,
        /// Error message
        error: String,
        /// The connection broke, as opposed to a local error
        transport: bool,
    },
}

/// Final record of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Worker ordinal
    pub ordinal: usize,
    /// Assigned range, absent if it could not be computed
    pub range: Option<WorkRange>,
    /// How the session ended
    pub outcome: SessionOutcome,
}

/// Drive one worker session to completion
///
/// Always attempts to send the stop signal, whatever happened before.
pub async fn run_session<L: WorkerLink>(
    state: Arc<CoordinatorState>,
    ordinal: usize,
    mut link: L,
) -> SessionSummary {
    let span = info_span!("session", ordinal);
    async move {
        let mut range = None;
        let outcome = match serve(&state, ordinal, &mut link, &mut range).await {
            Ok(outcome) => outcome,
            Err((phase, e)) => {
                let transport = e.is_transport();
                if transport {
                    warn!(category = e.category(), "Worker {} failed while {}: {}", ordinal, phase, e);
                } else {
                    error!(category = e.category(), "Worker {} failed while {}: {}", ordinal, phase, e);
                }
                SessionOutcome::Failed {
                    phase,
                    error: e.to_string(),
                    transport,
                }
            }
        };

        if let Err(e) = link.stop().await {
            debug!("Could not send stop signal to worker {}: {}", ordinal, e);
        }
        info!("Worker {} disconnected", ordinal);

        SessionSummary {
            ordinal,
            range,
            outcome,
        }
    }
    .instrument(span)
    .await
}

async fn serve<L: WorkerLink>(
    state: &CoordinatorState,
    ordinal: usize,
    link: &mut L,
    assigned: &mut Option<WorkRange>,
) -> std::result::Result<SessionOutcome, (SessionPhase, Error)> {
    let range = state
        .work_range(ordinal)
        .map_err(|e| (SessionPhase::Assigning, e))?;
    *assigned = Some(range);

    info!("Worker {}: range {}", ordinal, range);
    link.assign(state.config(), range)
        .await
        .map_err(|e| (SessionPhase::Assigning, e))?;

    let event = link
        .await_event()
        .await
        .map_err(|e| (SessionPhase::AwaitingEvent, e))?;

    Ok(match event {
        SessionEvent::Exhausted => {
            info!("Worker {} exhausted its range without a solution", ordinal);
            SessionOutcome::Exhausted
        }
        SessionEvent::Report(candidate) => match state.submit(ordinal, candidate) {
            Arbitration::Accepted => {
                info!(
                    nonce = %candidate.nonce,
                    hash = candidate.hash,
                    "Solution found by worker {}",
                    ordinal
                );
                info!(
                    "Full text: {}{}",
                    String::from_utf8_lossy(state.config().text()),
                    candidate.nonce
                );
                SessionOutcome::Won(candidate)
            }
            Arbitration::Discarded { winner } => {
                info!(
                    nonce = %candidate.nonce,
                    hash = candidate.hash,
                    "Worker {} reported after worker {} already won, discarding",
                    ordinal,
                    winner.worker
                );
                SessionOutcome::Discarded(candidate)
            }
        },
    })
}
