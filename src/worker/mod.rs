//! Worker: receives a range, searches it and reports back
//!
//! Connection state machine:
//! `connecting -> receive config -> receive range -> searching ->
//! {reporting | exhausted} -> await stop -> closed`.

pub mod search;

pub use search::{search_range, SearchResult, PROGRESS_INTERVAL};

use crate::protocol::{ServerMessage, WorkerCodec};
use crate::types::{Candidate, SearchConfig, WorkRange};
use crate::{Error, Result};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// How the worker's search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// A candidate was found and sent to the coordinator
    Reported(Candidate),
    /// The whole range was searched without a solution
    Exhausted,
}

/// Summary of one worker run
#[derive(Debug, Clone)]
pub struct WorkerReport {
    /// The range the coordinator assigned
    pub range: WorkRange,
    /// Reported or exhausted
    pub outcome: WorkerOutcome,
    /// Search statistics
    pub search: SearchResult,
}

/// Connect to the coordinator at `addr` and run one search
pub async fn connect_and_run(addr: SocketAddr) -> Result<WorkerReport> {
    info!("Connecting to coordinator {}", addr);
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| Error::transport(format!("Failed to connect to {}: {}", addr, e)))?;
    info!("Connected to coordinator");

    run_worker(stream).await
}

/// Run the worker protocol over an established connection
pub async fn run_worker<T>(stream: T) -> Result<WorkerReport>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut framed = Framed::new(stream, WorkerCodec::new());

    let config = receive_config(&mut framed).await?;
    info!(
        text_length = config.text().len(),
        nonce_length = config.nonce_length(),
        difficulty = config.difficulty(),
        "Configuration received"
    );

    let range = receive_range(&mut framed).await?;
    info!("Assigned range {}", range);

    let search = tokio::task::spawn_blocking(move || search_range(&config, &range))
        .await
        .map_err(|e| Error::invalid_state(format!("Search task failed: {}", e)))
        .and_then(|result| result)
        .map_err(|e| {
            // The coordinator sees a clean close and counts the range as exhausted
            warn!(
                category = e.category(),
                "Range {} was not searched, disconnecting: {}",
                range,
                e
            );
            e
        })?;

    let outcome = match search.found {
        Some(candidate) => {
            framed.send(candidate).await?;
            debug!("Report sent");
            WorkerOutcome::Reported(candidate)
        }
        None => {
            // End of stream at a frame boundary tells the coordinator the
            // range is exhausted; the read half stays open for the stop byte.
            framed.get_mut().shutdown().await?;
            debug!("Write half closed");
            WorkerOutcome::Exhausted
        }
    };

    await_stop(&mut framed).await?;
    info!("Stop signal received, disconnecting");

    Ok(WorkerReport {
        range,
        outcome,
        search,
    })
}

async fn receive_config<T>(framed: &mut Framed<T, WorkerCodec>) -> Result<SearchConfig>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    match framed.next().await {
        Some(Ok(ServerMessage::Config(config))) => Ok(config),
        Some(Ok(other)) => Err(Error::protocol(format!("Expected config, got {:?}", other))),
        Some(Err(e)) => Err(e),
        None => Err(Error::transport("Connection closed before config")),
    }
}

async fn receive_range<T>(framed: &mut Framed<T, WorkerCodec>) -> Result<WorkRange>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    match framed.next().await {
        Some(Ok(ServerMessage::Range(range))) => Ok(range),
        Some(Ok(other)) => Err(Error::protocol(format!("Expected range, got {:?}", other))),
        Some(Err(e)) => Err(e),
        None => Err(Error::transport("Connection closed before range")),
    }
}

async fn await_stop<T>(framed: &mut Framed<T, WorkerCodec>) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    match framed.next().await {
        Some(Ok(ServerMessage::Stop)) => Ok(()),
        Some(Ok(other)) => Err(Error::protocol(format!("Expected stop, got {:?}", other))),
        Some(Err(e)) => Err(e),
        None => Err(Error::transport("Connection closed before stop signal")),
    }
}
