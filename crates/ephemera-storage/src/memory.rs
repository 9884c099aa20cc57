//! In-memory storage implementation
//!
//! Used by tests and by deployments that accept losing every file on restart.

use crate::traits::{FileStorage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use ephemera_core::{FileId, FileListEntry, FileMetadata};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct StoredFile {
    content: Vec<u8>,
    meta: FileMetadata,
}

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<FileId, StoredFile>,
    next_id: i64,
}

/// Storage that keeps files in a process-local map.
///
/// Ids start at 0 and increase by one per store; deleted ids are never handed out again.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held (live or expired).
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .files
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("memory storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn store(&self, content: Vec<u8>, meta: FileMetadata) -> StorageResult<FileId> {
        let mut inner = self.lock()?;
        let id = FileId::new(inner.next_id);
        inner.next_id += 1;
        let size = content.len();
        inner.files.insert(id, StoredFile { content, meta });

        tracing::debug!(file.id = %id, size_bytes = size, "Memory storage store successful");
        Ok(id)
    }

    async fn fetch(&self, id: FileId) -> StorageResult<(Vec<u8>, FileMetadata)> {
        let inner = self.lock()?;
        inner
            .files
            .get(&id)
            .map(|stored| (stored.content.clone(), stored.meta.clone()))
            .ok_or(StorageError::NotFound(id))
    }

    async fn fetch_meta(&self, id: FileId) -> StorageResult<FileMetadata> {
        let inner = self.lock()?;
        inner
            .files
            .get(&id)
            .map(|stored| stored.meta.clone())
            .ok_or(StorageError::NotFound(id))
    }

    async fn delete(&self, id: FileId) -> StorageResult<FileId> {
        let mut inner = self.lock()?;
        inner
            .files
            .remove(&id)
            .map(|_| id)
            .ok_or(StorageError::NotFound(id))
    }

    async fn list(&self) -> StorageResult<Vec<FileListEntry>> {
        let inner = self.lock()?;
        Ok(inner
            .files
            .iter()
            .map(|(id, stored)| FileListEntry::new(*id, stored.meta.created_at()))
            .collect())
    }

    async fn list_public(&self) -> StorageResult<Vec<FileListEntry>> {
        let inner = self.lock()?;
        Ok(inner
            .files
            .iter()
            .filter(|(_, stored)| !stored.meta.is_private())
            .map(|(id, stored)| FileListEntry::new(*id, stored.meta.created_at()))
            .collect())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ephemera_core::Credential;

    fn meta() -> FileMetadata {
        FileMetadata::new(
            false,
            "text/plain",
            Utc::now(),
            Credential::Plaintext {
                password: String::new(),
            },
        )
    }

    #[tokio::test]
    async fn test_memory_storage_store_fetch() {
        let storage = MemoryStorage::new();
        let m = meta();

        let id = storage.store(b"hoge".to_vec(), m.clone()).await.unwrap();
        let (content, fetched) = storage.fetch(id).await.unwrap();

        assert_eq!(content, b"hoge");
        assert_eq!(fetched, m);
        assert_eq!(storage.fetch_meta(id).await.unwrap(), m);
    }

    #[tokio::test]
    async fn test_memory_storage_ids_not_reused_after_delete() {
        let storage = MemoryStorage::new();

        let first = storage.store(b"a".to_vec(), meta()).await.unwrap();
        storage.delete(first).await.unwrap();
        let second = storage.store(b"b".to_vec(), meta()).await.unwrap();

        assert_ne!(first, second);
        assert!(storage.fetch(first).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_memory_storage_double_delete_is_not_found() {
        let storage = MemoryStorage::new();
        let id = storage.store(b"a".to_vec(), meta()).await.unwrap();

        assert_eq!(storage.delete(id).await.unwrap(), id);
        assert!(matches!(
            storage.delete(id).await,
            Err(StorageError::NotFound(missing)) if missing == id
        ));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_memory_storage_len_survives_poisoned_lock() {
        let storage = std::sync::Arc::new(MemoryStorage::new());
        storage.store(b"a".to_vec(), meta()).await.unwrap();

        let poisoner = storage.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(storage.inner.is_poisoned());
        assert_eq!(storage.len(), 1);
        assert!(matches!(
            storage.fetch(FileId::new(0)).await,
            Err(StorageError::Backend(_))
        ));
    }
}
