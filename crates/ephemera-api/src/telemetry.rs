//! Tracing subscriber setup shared by the server and the CLI.

use ephemera_core::config::LogFormat;
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const DEFAULT_FILTER: &str = "ephemera=debug,tower_http=debug";

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    Stderr,
}

/// Install the global subscriber for the server. `RUST_LOG` overrides the default filter.
pub fn init_telemetry(format: LogFormat) -> Result<(), anyhow::Error> {
    init_with_filter(format, DEFAULT_FILTER, LogTarget::Stdout)
}

/// Same as [`init_telemetry`] with a caller-chosen fallback filter and target.
pub fn init_with_filter(
    format: LogFormat,
    default_filter: &str,
    target: LogTarget,
) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let writer = match target {
        LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
    };
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .try_init()?,
    }

    tracing::debug!(format = ?format, "Tracing initialized");
    Ok(())
}
