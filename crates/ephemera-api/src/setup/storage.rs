//! Storage setup and initialization

use anyhow::{Context, Result};
use ephemera_core::{Config, StorageBackend};
use ephemera_db::{setup_database, PgFileStorage};
use ephemera_storage::{FileStorage, MemoryStorage};
use std::sync::Arc;

/// Build the adapter selected by `STORAGE_BACKEND`.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn FileStorage>> {
    tracing::info!(backend = %config.storage_backend(), "Initializing storage...");

    let storage: Arc<dyn FileStorage> = match config.storage_backend() {
        StorageBackend::Memory => {
            tracing::warn!("Memory storage selected: files are lost on restart");
            Arc::new(MemoryStorage::new())
        }
        StorageBackend::Local => local_storage(config).await?,
        StorageBackend::Postgres => {
            let pool = setup_database(config).await?;
            Arc::new(PgFileStorage::new(pool))
        }
    };

    tracing::info!(
        backend = ?storage.backend_type(),
        "Storage initialized successfully"
    );

    Ok(storage)
}

#[cfg(feature = "storage-local")]
async fn local_storage(config: &Config) -> Result<Arc<dyn FileStorage>> {
    let storage = ephemera_storage::LocalStorage::new(config.local_storage_path())
        .await
        .with_context(|| {
            format!(
                "Failed to open local storage at {}",
                config.local_storage_path().display()
            )
        })?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "storage-local"))]
async fn local_storage(_config: &Config) -> Result<Arc<dyn FileStorage>> {
    anyhow::bail!("Local storage support not compiled in; enable the storage-local feature")
}
