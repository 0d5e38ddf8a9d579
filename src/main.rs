//! calsieve - republish a calendar feed without its all-day events.
//!
//! Configured entirely through the environment, see `calsieve_core::config`.
//! Meant to be run on a schedule (cron, CI job); every run is independent.

use anyhow::Result;
use calsieve_core::{DirPublisher, Pipeline, Reporter, SieveConfig, Stage, TracingReporter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let reporter = TracingReporter;

    let config = SieveConfig::load().inspect_err(|e| reporter.stage_failed(Stage::Config, e))?;
    tracing::info!(
        source = %config.source_url,
        output = %config.output_dir.display(),
        "starting run"
    );

    let publisher = DirPublisher::from_config(&config);
    let summary = Pipeline::new(&config, &publisher, &reporter).run().await?;

    tracing::info!(
        included = summary.stats.included,
        total = summary.stats.total,
        bytes_fetched = summary.bytes_fetched,
        bytes_written = summary.bytes_written,
        "calendar updated"
    );

    Ok(())
}
