//! Distributed proof-of-work worker

use distributed_pow::{
    config::WorkerConfig,
    utils::{format_duration, format_hash_rate, init_tracing},
    worker::{connect_and_run, WorkerOutcome},
    APP_NAME, APP_VERSION,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::load()?;

    if config.print_config {
        println!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    init_tracing(config.log_level, config.log_format);
    info!("Starting {} v{} worker", APP_NAME, APP_VERSION);

    let report = connect_and_run(config.coordinator_addr()?).await?;

    match report.outcome {
        WorkerOutcome::Reported(candidate) => info!(
            nonce = %candidate.nonce,
            hash = candidate.hash,
            "Reported solution"
        ),
        WorkerOutcome::Exhausted => info!("Range {} completed without a solution", report.range),
    }
    info!(
        "{} attempts in {} ({})",
        report.search.attempts,
        format_duration(report.search.elapsed),
        format_hash_rate(report.search.hash_rate())
    );
    info!("Disconnected");

    Ok(())
}
