//! Files orchestrator
//!
//! Enforces expiry and password authorization on top of a storage adapter. The
//! orchestrator stores nothing itself and holds only immutable configuration, so a
//! single instance can be cloned and shared across tasks freely.
//!
//! A record created at `T` with expiry `D` is live while `now < T + D`. The boundary
//! instant `T + D` counts as expired for every operation. When `T + D` falls outside
//! the representable date range the record never expires.

use chrono::{DateTime, Duration, Utc};
use ephemera_core::{
    AppError, CredentialError, FileId, FileListEntry, FileMetadata, PasswordScheme, StorageBackend,
};
use ephemera_storage::{FileStorage, StorageError};
use std::sync::Arc;

/// Failures surfaced by [`Files`]. Nothing is retried or swallowed.
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    #[error("File {0} not found")]
    NotFound(FileId),

    #[error("File {0} has expired")]
    Expired(FileId),

    #[error("Password does not match for file {0}")]
    AuthFailed(FileId),

    #[error(transparent)]
    Storage(StorageError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl From<StorageError> for FilesError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => FilesError::NotFound(id),
            other => FilesError::Storage(other),
        }
    }
}

impl From<FilesError> for AppError {
    fn from(err: FilesError) -> Self {
        match err {
            FilesError::NotFound(_) => AppError::NotFound(err.to_string()),
            FilesError::Expired(_) => AppError::Expired(err.to_string()),
            FilesError::AuthFailed(_) => AppError::AuthFailed(err.to_string()),
            FilesError::Storage(e) => AppError::Storage(e.to_string()),
            FilesError::Credential(e) => AppError::Internal(e.to_string()),
        }
    }
}

pub type FilesResult<T> = Result<T, FilesError>;

/// Expiry- and password-aware front for a storage adapter.
#[derive(Clone)]
pub struct Files {
    storage: Arc<dyn FileStorage>,
    scheme: Arc<dyn PasswordScheme>,
    expire: Duration,
}

impl Files {
    pub fn new(
        storage: Arc<dyn FileStorage>,
        scheme: Arc<dyn PasswordScheme>,
        expire: Duration,
    ) -> Self {
        Self {
            storage,
            scheme,
            expire,
        }
    }

    /// Time-to-live applied to every record.
    pub fn expire(&self) -> Duration {
        self.expire
    }

    pub fn backend_type(&self) -> StorageBackend {
        self.storage.backend_type()
    }

    /// Instant at which a record created at `created_at` stops being served, or
    /// `None` if that instant is past the end of the calendar.
    pub fn expires_at(&self, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        created_at.checked_add_signed(self.expire)
    }

    fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.expires_at(created_at).is_some_and(|at| now >= at)
    }

    /// Round trip to the adapter with an id it never allocates.
    pub async fn check_storage(&self) -> FilesResult<()> {
        match self.storage.fetch_meta(FileId::new(-1)).await {
            Ok(_) | Err(StorageError::NotFound(_)) => Ok(()),
            Err(e) => Err(FilesError::Storage(e)),
        }
    }

    /// Store `content` with fresh metadata stamped at `now`.
    #[tracing::instrument(
        skip(self, content, password),
        fields(size_bytes = content.len(), scheme = self.scheme.name())
    )]
    pub async fn upload(
        &self,
        content: Vec<u8>,
        is_private: bool,
        password: &str,
        content_type: &str,
        now: DateTime<Utc>,
    ) -> FilesResult<FileId> {
        let credential = self.scheme.seal(password)?;
        let meta = FileMetadata::new(is_private, content_type, now, credential);

        let id = self
            .storage
            .store(content, meta)
            .await
            .map_err(FilesError::Storage)?;

        tracing::info!(file.id = %id, "File uploaded");
        Ok(id)
    }

    /// Fetch a live record.
    ///
    /// An unknown id is reported as `NotFound`, never as `Expired`.
    #[tracing::instrument(skip(self), fields(file.id = %id))]
    pub async fn download(
        &self,
        id: FileId,
        now: DateTime<Utc>,
    ) -> FilesResult<(Vec<u8>, FileMetadata)> {
        let (content, meta) = self.storage.fetch(id).await?;

        if self.is_expired(meta.created_at(), now) {
            tracing::debug!(
                file.id = %id,
                created_at = %meta.created_at(),
                "Download of expired file"
            );
            return Err(FilesError::Expired(id));
        }

        Ok((content, meta))
    }

    /// Delete a live record after checking its password.
    ///
    /// Checks run in order NOT_FOUND, EXPIRED, AUTH_FAILED; the first failure wins and
    /// nothing is deleted.
    #[tracing::instrument(skip(self, password), fields(file.id = %id))]
    pub async fn delete(
        &self,
        id: FileId,
        password: &str,
        now: DateTime<Utc>,
    ) -> FilesResult<FileId> {
        let meta = self.storage.fetch_meta(id).await?;

        if self.is_expired(meta.created_at(), now) {
            return Err(FilesError::Expired(id));
        }

        if !self.scheme.verify(meta.credential(), password) {
            tracing::debug!(file.id = %id, "Delete rejected: password mismatch");
            return Err(FilesError::AuthFailed(id));
        }

        let deleted = self.storage.delete(id).await?;
        tracing::info!(file.id = %deleted, "File deleted");
        Ok(deleted)
    }

    /// Every record still live at `now`. Empty when nothing is live.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, now: DateTime<Utc>) -> FilesResult<Vec<FileListEntry>> {
        let all = self.storage.list().await.map_err(FilesError::Storage)?;

        let live: Vec<FileListEntry> = all
            .into_iter()
            .filter(|entry| !self.is_expired(entry.created_at, now))
            .collect();

        tracing::debug!(live = live.len(), "Listed files");
        Ok(live)
    }

    /// Live records that were not uploaded as private.
    #[tracing::instrument(skip(self))]
    pub async fn list_public(&self, now: DateTime<Utc>) -> FilesResult<Vec<FileListEntry>> {
        let public = self
            .storage
            .list_public()
            .await
            .map_err(FilesError::Storage)?;

        Ok(public
            .into_iter()
            .filter(|entry| !self.is_expired(entry.created_at, now))
            .collect())
    }
}
