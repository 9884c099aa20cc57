use chrono::{DateTime, Duration, SecondsFormat, Utc};
use clap::ValueEnum;
use ephemera_api::telemetry::LogTarget;
use ephemera_core::config::LogFormat;
use ephemera_core::FileListEntry;

/// Output format for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render live entries as an aligned table with their expiry instants. An expiry
/// past the end of the calendar shows as `never`.
pub fn format_table(entries: &[FileListEntry], expire: Duration) -> String {
    if entries.is_empty() {
        return "No live files.".to_string();
    }

    let id_width = entries
        .iter()
        .map(|entry| entry.id.to_string().len())
        .max()
        .unwrap_or(0)
        .max("ID".len());

    let row = |id: &str, created: &str, expires: &str| {
        format!("{:<id_width$}  {:<20}  {}", id, created, expires)
    };

    let mut lines = vec![row("ID", "CREATED AT", "EXPIRES AT")];
    lines.extend(entries.iter().map(|entry| {
        row(
            &entry.id.to_string(),
            &timestamp(entry.created_at),
            &entry
                .created_at
                .checked_add_signed(expire)
                .map(timestamp)
                .unwrap_or_else(|| "never".to_string()),
        )
    }));
    lines.join("\n")
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays clean for
/// downloaded content and JSON output.
pub fn init_tracing(format: LogFormat) -> Result<(), anyhow::Error> {
    ephemera_api::telemetry::init_with_filter(format, "ephemera=warn", LogTarget::Stderr)
}
