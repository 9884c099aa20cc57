//! Files repository: the storage contract over the `files` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ephemera_core::{Credential, FileId, FileListEntry, FileMetadata, StorageBackend};
use ephemera_storage::{FileStorage, StorageError, StorageResult};
use sqlx::{PgPool, Postgres};

/// Row type for the metadata columns of the files table.
#[derive(Debug, sqlx::FromRow)]
struct FileMetaRow {
    created_at: DateTime<Utc>,
    is_private: bool,
    content_type: String,
    auth_scheme: String,
    salt: String,
    hashed_password: String,
}

impl FileMetaRow {
    fn into_metadata(self, id: FileId) -> StorageResult<FileMetadata> {
        let credential = Credential::from_parts(&self.auth_scheme, self.salt, self.hashed_password)
            .ok_or_else(|| {
                StorageError::Serialization(format!(
                    "Unknown auth scheme '{}' for file {}",
                    self.auth_scheme, id
                ))
            })?;
        Ok(FileMetadata::new(
            self.is_private,
            self.content_type,
            self.created_at,
            credential,
        ))
    }
}

/// Row type for full fetches.
#[derive(Debug, sqlx::FromRow)]
struct FileRow {
    #[sqlx(flatten)]
    meta: FileMetaRow,
    content: Vec<u8>,
}

#[derive(Debug, sqlx::FromRow)]
struct FileListRow {
    id: i64,
    created_at: DateTime<Utc>,
}

fn db_error(action: &'static str) -> impl FnOnce(sqlx::Error) -> StorageError {
    move |e| StorageError::Backend(format!("Failed to {}: {}", action, e))
}

/// PostgreSQL-backed file storage.
///
/// Ids come from the `BIGSERIAL` primary key. Every operation is a single statement,
/// so concurrent deletes of one id resolve to one `DELETE ... RETURNING` hit and
/// NOT_FOUND for everyone else.
#[derive(Clone)]
pub struct PgFileStorage {
    pool: PgPool,
}

impl PgFileStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FileStorage for PgFileStorage {
    #[tracing::instrument(skip(self, content, meta), fields(db.table = "files", db.operation = "insert", size_bytes = content.len()))]
    async fn store(&self, content: Vec<u8>, meta: FileMetadata) -> StorageResult<FileId> {
        let (salt, secret) = meta.credential().to_parts();
        let id: i64 = sqlx::query_scalar::<Postgres, i64>(
            r#"
            INSERT INTO files (created_at, is_private, content_type, auth_scheme, salt, hashed_password, content)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(meta.created_at())
        .bind(meta.is_private())
        .bind(meta.content_type())
        .bind(meta.credential().kind())
        .bind(salt)
        .bind(secret)
        .bind(&content)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("insert file"))?;

        Ok(FileId::new(id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %id))]
    async fn fetch(&self, id: FileId) -> StorageResult<(Vec<u8>, FileMetadata)> {
        let row: Option<FileRow> = sqlx::query_as::<Postgres, FileRow>(
            r#"
            SELECT created_at, is_private, content_type, auth_scheme, salt, hashed_password, content
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("fetch file"))?;

        let row = row.ok_or(StorageError::NotFound(id))?;
        Ok((row.content, row.meta.into_metadata(id)?))
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %id))]
    async fn fetch_meta(&self, id: FileId) -> StorageResult<FileMetadata> {
        let row: Option<FileMetaRow> = sqlx::query_as::<Postgres, FileMetaRow>(
            r#"
            SELECT created_at, is_private, content_type, auth_scheme, salt, hashed_password
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("fetch file metadata"))?;

        row.ok_or(StorageError::NotFound(id))?.into_metadata(id)
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: FileId) -> StorageResult<FileId> {
        let deleted: Option<i64> =
            sqlx::query_scalar::<Postgres, i64>("DELETE FROM files WHERE id = $1 RETURNING id")
                .bind(id.value())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("delete file"))?;

        deleted
            .map(FileId::new)
            .ok_or(StorageError::NotFound(id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    async fn list(&self) -> StorageResult<Vec<FileListEntry>> {
        let rows: Vec<FileListRow> =
            sqlx::query_as::<Postgres, FileListRow>("SELECT id, created_at FROM files")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("list files"))?;

        Ok(rows
            .into_iter()
            .map(|row| FileListEntry::new(FileId::new(row.id), row.created_at))
            .collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    async fn list_public(&self) -> StorageResult<Vec<FileListEntry>> {
        let rows: Vec<FileListRow> = sqlx::query_as::<Postgres, FileListRow>(
            "SELECT id, created_at FROM files WHERE NOT is_private",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list public files"))?;

        Ok(rows
            .into_iter()
            .map(|row| FileListEntry::new(FileId::new(row.id), row.created_at))
            .collect())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Postgres
    }
}
