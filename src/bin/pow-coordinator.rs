//! Distributed proof-of-work coordinator

use anyhow::Context;
use distributed_pow::{
    config::{load_text, CoordinatorConfig},
    coordinator::{Coordinator, RunOutcome, RunReport, SessionOutcome},
    utils::init_tracing,
    SearchConfig, APP_NAME, APP_VERSION,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CoordinatorConfig::load().await?;

    if config.print_config {
        println!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    init_tracing(config.log_level, config.log_format);
    info!("Starting {} v{} coordinator", APP_NAME, APP_VERSION);

    let text = load_text(&config.text_file)
        .await
        .with_context(|| format!("Failed to read text file {}", config.text_file.display()))?;
    let search = SearchConfig::new(text, config.nonce_length, config.difficulty, config.charset())?;

    info!("Text: {} bytes", search.text().len());
    info!("Nonce length: {}", search.nonce_length());
    info!("Difficulty: {} trailing zeros", search.difficulty());
    info!("Expected workers: {}", config.num_workers);
    info!("Charset: {} ({} symbols)", search.charset(), search.charset().len());
    info!("Search space: {} nonces", search.search_space()?);

    let coordinator = Coordinator::bind(config.socket_addr()?, search, config.num_workers).await?;
    let report = coordinator.run().await?;

    log_report(&report);
    Ok(())
}

fn log_report(report: &RunReport) {
    for session in &report.sessions {
        let range = session
            .range
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        match &session.outcome {
            SessionOutcome::Won(c) => info!("Worker {} {}: won with {}", session.ordinal, range, c.nonce),
            SessionOutcome::Discarded(c) => {
                info!("Worker {} {}: late report {} discarded", session.ordinal, range, c.nonce)
            }
            SessionOutcome::Exhausted => info!("Worker {} {}: exhausted", session.ordinal, range),
            SessionOutcome::Failed { phase, error, .. } => {
                warn!("Worker {} {}: failed while {}: {}", session.ordinal, range, phase, error)
            }
        }
    }

    match report.outcome {
        RunOutcome::Solved(solution) => info!(
            worker = solution.worker,
            nonce = %solution.candidate.nonce,
            hash = solution.candidate.hash,
            "Finished: solution found"
        ),
        RunOutcome::NoSolution => info!(
            exhausted = report.exhausted_sessions(),
            failed = report.failed_sessions(),
            "Finished: no solution found"
        ),
    }
}
