//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::Result;
use ephemera_core::Config;
use ephemera_services::Files;
use std::sync::Arc;

/// Build the orchestrator over the configured backend and password scheme.
pub async fn setup_files(config: &Config) -> Result<Files> {
    let storage = storage::setup_storage(config).await?;
    let scheme = config.password_scheme().build();

    tracing::info!(
        scheme = scheme.name(),
        file_expire_seconds = config.file_expire().num_seconds(),
        "File service configured"
    );

    Ok(Files::new(storage, scheme, config.file_expire()))
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    tracing::info!(environment = %config.environment(), "Configuration loaded");

    let files = setup_files(&config).await?;
    let state = Arc::new(AppState::new(files, config.clone()));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
