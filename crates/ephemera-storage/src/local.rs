use crate::traits::{FileStorage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use ephemera_core::{FileId, FileListEntry, FileMetadata};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const CONTENT_EXT: &str = "bin";
const META_EXT: &str = "json";

/// Local filesystem storage implementation
///
/// Each record is a pair of files under `base_path`: `<id>.bin` with the raw content
/// and `<id>.json` with the serialized metadata. The metadata file is written last
/// and removed first, so its presence is what makes a record exist.
#[derive(Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    next_id: AtomicI64,
}

impl LocalStorage {
    /// Open (or create) a storage directory.
    ///
    /// The id counter resumes after the highest id found on disk.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::Config(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let next_id = Self::scan_ids(&base_path)
            .await?
            .into_iter()
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);

        tracing::info!(
            path = %base_path.display(),
            next_id,
            "Local storage opened"
        );

        Ok(LocalStorage {
            base_path,
            next_id: AtomicI64::new(next_id),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, id: FileId, ext: &str) -> PathBuf {
        self.base_path.join(format!("{}.{}", id.value(), ext))
    }

    /// Ids of every metadata file in `dir`. Unrelated files are ignored.
    async fn scan_ids(dir: &Path) -> StorageResult<Vec<i64>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(META_EXT) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i64>().ok())
            {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Write through a temporary file and rename into place.
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let result = Self::write_then_rename(&tmp, path, data).await;
        if result.is_err() {
            remove_if_present(&tmp).await;
        }
        result
    }

    async fn write_then_rename(tmp: &Path, path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(tmp).await.map_err(|e| {
            StorageError::Backend(format!("Failed to create file {}: {}", tmp.display(), e))
        })?;
        file.write_all(data).await.map_err(|e| {
            StorageError::Backend(format!("Failed to write file {}: {}", tmp.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::Backend(format!("Failed to sync file {}: {}", tmp.display(), e))
        })?;

        fs::rename(tmp, path).await.map_err(|e| {
            StorageError::Backend(format!(
                "Failed to move {} to {}: {}",
                tmp.display(),
                path.display(),
                e
            ))
        })
    }

    /// Every record whose metadata satisfies `keep`.
    async fn list_where<F>(&self, keep: F) -> StorageResult<Vec<FileListEntry>>
    where
        F: Fn(&FileMetadata) -> bool,
    {
        let mut entries = Vec::new();
        for raw_id in Self::scan_ids(&self.base_path).await? {
            let id = FileId::new(raw_id);
            match self.read_meta(id).await {
                Ok(meta) if keep(&meta) => entries.push(FileListEntry::new(id, meta.created_at())),
                Ok(_) => {}
                // Deleted while listing.
                Err(StorageError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(entries)
    }

    async fn read_meta(&self, id: FileId) -> StorageResult<FileMetadata> {
        let path = self.path_for(id, META_EXT);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(|e| {
            StorageError::Serialization(format!(
                "Invalid metadata in {}: {}",
                path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    #[tracing::instrument(skip(self, content, meta), fields(size_bytes = content.len()))]
    async fn store(&self, content: Vec<u8>, meta: FileMetadata) -> StorageResult<FileId> {
        let id = FileId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let start = std::time::Instant::now();

        let meta_json = serde_json::to_vec(&meta)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let content_path = self.path_for(id, CONTENT_EXT);
        self.write_atomic(&content_path, &content).await?;
        if let Err(e) = self
            .write_atomic(&self.path_for(id, META_EXT), &meta_json)
            .await
        {
            remove_if_present(&content_path).await;
            return Err(e);
        }

        tracing::info!(
            file.id = %id,
            size_bytes = content.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage store successful"
        );

        Ok(id)
    }

    #[tracing::instrument(skip(self), fields(file.id = %id))]
    async fn fetch(&self, id: FileId) -> StorageResult<(Vec<u8>, FileMetadata)> {
        let meta = self.read_meta(id).await?;

        let path = self.path_for(id, CONTENT_EXT);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            // Deleted between the two reads.
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound(id)),
            Err(e) => {
                return Err(StorageError::Backend(format!(
                    "Failed to read file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok((content, meta))
    }

    #[tracing::instrument(skip(self), fields(file.id = %id))]
    async fn fetch_meta(&self, id: FileId) -> StorageResult<FileMetadata> {
        self.read_meta(id).await
    }

    #[tracing::instrument(skip(self), fields(file.id = %id))]
    async fn delete(&self, id: FileId) -> StorageResult<FileId> {
        match fs::remove_file(self.path_for(id, META_EXT)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound(id)),
            Err(e) => return Err(e.into()),
        }

        let content_path = self.path_for(id, CONTENT_EXT);
        if let Err(e) = fs::remove_file(&content_path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    error = %e,
                    path = %content_path.display(),
                    "Failed to remove content file; record already unlinked"
                );
            }
        }

        tracing::info!(file.id = %id, "Local storage delete successful");
        Ok(id)
    }

    async fn list(&self) -> StorageResult<Vec<FileListEntry>> {
        self.list_where(|_| true).await
    }

    async fn list_public(&self) -> StorageResult<Vec<FileListEntry>> {
        self.list_where(|meta| !meta.is_private()).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Best-effort removal of a partially written file.
async fn remove_if_present(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(error = %e, path = %path.display(), "Failed to clean up file");
        }
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ephemera_core::Credential;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn meta() -> FileMetadata {
        FileMetadata::new(
            true,
            "image/png",
            Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap(),
            Credential::SaltedHash {
                salt: "salt".to_string(),
                hash: "hash".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_local_storage_store_fetch() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let id = storage.store(b"hoge".to_vec(), meta()).await.unwrap();
        let (content, fetched) = storage.fetch(id).await.unwrap();

        assert_eq!(content, b"hoge");
        assert_eq!(fetched, meta());
        assert_eq!(storage.fetch_meta(id).await.unwrap(), meta());
        assert!(dir.path().join(format!("{}.bin", id)).exists());
        assert!(dir.path().join(format!("{}.json", id)).exists());
    }

    #[tokio::test]
    async fn test_local_storage_missing_id() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let missing = FileId::new(99);
        assert!(storage.fetch(missing).await.unwrap_err().is_not_found());
        assert!(storage.fetch_meta(missing).await.unwrap_err().is_not_found());
        assert!(storage.delete(missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_local_storage_resumes_ids_after_reopen() {
        let dir = tempdir().unwrap();
        let first = {
            let storage = LocalStorage::new(dir.path()).await.unwrap();
            storage.store(b"a".to_vec(), meta()).await.unwrap();
            storage.store(b"b".to_vec(), meta()).await.unwrap()
        };

        let reopened = LocalStorage::new(dir.path()).await.unwrap();
        let next = reopened.store(b"c".to_vec(), meta()).await.unwrap();

        assert_eq!(next.value(), first.value() + 1);
        assert_eq!(reopened.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_local_storage_concurrent_delete_has_one_winner() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let id = storage.store(b"race".to_vec(), meta()).await.unwrap();

        let (a, b) = tokio::join!(storage.delete(id), storage.delete(id));

        let wins = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        assert!(a.is_err_and(|e| e.is_not_found()) || b.is_err_and(|e| e.is_not_found()));
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_storage_failed_metadata_write_leaves_no_content() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        // A directory where the metadata file should go makes the rename fail.
        std::fs::create_dir(dir.path().join("0.json")).unwrap();

        assert!(storage.store(b"orphan".to_vec(), meta()).await.is_err());

        assert!(!dir.path().join("0.bin").exists());
        assert!(!dir.path().join("0.bin.tmp").exists());
        assert!(!dir.path().join("0.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_local_storage_list_public_skips_private() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let created = meta().created_at();

        storage.store(b"hidden".to_vec(), meta()).await.unwrap();
        let public_meta = FileMetadata::new(
            false,
            "text/plain",
            created,
            Credential::Plaintext {
                password: String::new(),
            },
        );
        let public = storage.store(b"shown".to_vec(), public_meta).await.unwrap();

        assert_eq!(
            storage.list_public().await.unwrap(),
            vec![FileListEntry::new(public, created)]
        );
        assert_eq!(storage.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_local_storage_list_ignores_foreign_files() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("README.txt"), b"not a record").unwrap();
        std::fs::write(dir.path().join("notes.json"), b"{}").unwrap();

        let id = storage.store(b"x".to_vec(), meta()).await.unwrap();
        let listed = storage.list().await.unwrap();

        assert_eq!(listed, vec![FileListEntry::new(id, meta().created_at())]);
    }
}
