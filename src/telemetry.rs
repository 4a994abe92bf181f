use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence over `log_level` when set. JSON output carries
/// the current span so every event is tagged with the run id.
pub fn init_telemetry(log_level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow!("Invalid log level '{log_level}': {e}"))?;

    let registry = tracing_subscriber::registry().with(filter);
    let initialized = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    initialized.map_err(|e| anyhow!("Failed to initialize telemetry: {e}"))?;

    tracing::debug!("ci-migrator telemetry initialized");
    Ok(())
}

/// Span wrapping every step of one migration run
pub fn create_migration_span(run_id: &str, repository_url: &str) -> tracing::Span {
    tracing::info_span!(
        "migration_run",
        run.id = run_id,
        repository.url = repository_url,
        otel.kind = "internal"
    )
}
