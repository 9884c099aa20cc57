//! Storage abstraction trait
//!
//! This module defines the FileStorage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use ephemera_core::{FileId, FileListEntry, FileMetadata};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(FileId),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage contract
///
/// Persists raw content and metadata keyed by an adapter-assigned [`FileId`]. Adapters
/// know nothing about expiry or passwords; those rules live in the orchestrator.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist content and metadata, returning the newly assigned id.
    async fn store(&self, content: Vec<u8>, meta: FileMetadata) -> StorageResult<FileId>;

    /// Fetch content and metadata.
    async fn fetch(&self, id: FileId) -> StorageResult<(Vec<u8>, FileMetadata)>;

    /// Fetch metadata only, without transferring content.
    async fn fetch_meta(&self, id: FileId) -> StorageResult<FileMetadata>;

    /// Delete a record and return its id.
    async fn delete(&self, id: FileId) -> StorageResult<FileId>;

    /// Enumerate every stored record, live or not. Order is unspecified.
    async fn list(&self) -> StorageResult<Vec<FileListEntry>>;

    /// Enumerate stored records that were not uploaded as private, live or not.
    async fn list_public(&self) -> StorageResult<Vec<FileListEntry>>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
