//! Ephemera CLI: operate on the configured storage backend directly.
//!
//! Reads the same environment as the server (`STORAGE_BACKEND`, `LOCAL_STORAGE_PATH`,
//! `DATABASE_URL`, `FILE_EXPIRE_SECONDS`, `PASSWORD_SCHEME`, ...).

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use ephemera_api::setup::setup_files;
use ephemera_cli::{format_table, init_tracing, OutputFormat};
use ephemera_core::{Config, FileId};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ephemera", about = "Time-limited file storage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and print its id
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Leave the file out of listings
        #[arg(long)]
        private: bool,
        /// Password required to delete the file
        #[arg(long, default_value = "")]
        password: String,
        /// MIME type stored with the file
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
    },
    /// Download a live file
    Download {
        /// File id
        id: FileId,
        /// Write content here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete a live file
    Delete {
        /// File id
        id: FileId,
        /// Password given at upload
        #[arg(long, default_value = "")]
        password: String,
    },
    /// List live files
    List {
        /// Output format: table or json
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format())?;

    let files = setup_files(&config).await?;

    match cli.command {
        Commands::Upload {
            file,
            private,
            password,
            content_type,
        } => {
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let id = files
                .upload(content, private, &password, &content_type, Utc::now())
                .await?;
            println!("{}", id);
        }
        Commands::Download { id, output } => {
            let (content, meta) = files.download(id, Utc::now()).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &content)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!(
                        file.id = %id,
                        content_type = %meta.content_type(),
                        path = %path.display(),
                        "File saved"
                    );
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&content).context("Failed to write to stdout")?;
                    stdout.flush().context("Failed to flush stdout")?;
                }
            }
        }
        Commands::Delete { id, password } => {
            let deleted = files.delete(id, &password, Utc::now()).await?;
            println!("Deleted {}", deleted);
        }
        Commands::List { format } => {
            let mut entries = files.list(Utc::now()).await?;
            entries.sort_by_key(|entry| entry.id.value());
            match format {
                OutputFormat::Table => println!("{}", format_table(&entries, files.expire())),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&entries).context("Serialize listing")?
                ),
            }
        }
    }

    Ok(())
}
