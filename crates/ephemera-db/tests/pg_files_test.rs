//! PostgreSQL adapter tests.
//!
//! Run with: `TEST_DATABASE_URL=postgresql://... cargo test -p ephemera-db`
//! Every test returns early when `TEST_DATABASE_URL` is not set.

use chrono::{DurationRound, TimeDelta, Utc};
use ephemera_core::{Credential, FileMetadata};
use ephemera_db::{PgFileStorage, MIGRATOR};
use ephemera_storage::{FileStorage, StorageError};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

async fn test_storage() -> Option<PgFileStorage> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping PostgreSQL test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");
    MIGRATOR.run(&pool).await.expect("Failed to run migrations");

    Some(PgFileStorage::new(pool))
}

fn meta(credential: Credential) -> FileMetadata {
    // Postgres keeps microseconds.
    let now = Utc::now()
        .duration_trunc(TimeDelta::microseconds(1))
        .unwrap();
    FileMetadata::new(true, "image/png", now, credential)
}

#[tokio::test]
async fn test_store_fetch_round_trip() {
    let Some(storage) = test_storage().await else {
        return;
    };
    let m = meta(Credential::SaltedHash {
        salt: "salt".to_string(),
        hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
    });

    let id = storage.store(b"hoge".to_vec(), m.clone()).await.unwrap();
    let (content, fetched) = storage.fetch(id).await.unwrap();

    assert_eq!(content, b"hoge");
    assert_eq!(fetched, m);
    assert_eq!(storage.fetch_meta(id).await.unwrap(), m);
    assert!(storage
        .list()
        .await
        .unwrap()
        .iter()
        .any(|entry| entry.id == id && entry.created_at == m.created_at()));
}

#[tokio::test]
async fn test_plaintext_credential_persists() {
    let Some(storage) = test_storage().await else {
        return;
    };
    let m = meta(Credential::Plaintext {
        password: "pass".to_string(),
    });

    let id = storage.store(Vec::new(), m.clone()).await.unwrap();
    assert_eq!(storage.fetch_meta(id).await.unwrap().credential(), m.credential());
}

#[tokio::test]
async fn test_delete_then_not_found() {
    let Some(storage) = test_storage().await else {
        return;
    };
    let id = storage
        .store(
            b"bye".to_vec(),
            meta(Credential::Plaintext {
                password: String::new(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(storage.delete(id).await.unwrap(), id);
    assert!(matches!(storage.fetch(id).await, Err(StorageError::NotFound(_))));
    assert!(matches!(storage.fetch_meta(id).await, Err(StorageError::NotFound(_))));
    assert!(matches!(storage.delete(id).await, Err(StorageError::NotFound(_))));
    assert!(storage.list().await.unwrap().iter().all(|e| e.id != id));
}

#[tokio::test]
async fn test_concurrent_delete_has_one_winner() {
    let Some(storage) = test_storage().await else {
        return;
    };
    let storage = Arc::new(storage);
    let id = storage
        .store(
            b"race".to_vec(),
            meta(Credential::Plaintext {
                password: String::new(),
            }),
        )
        .await
        .unwrap();

    let (a, b) = tokio::join!(storage.delete(id), storage.delete(id));
    let outcomes = [a, b];

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|r| matches!(r, Err(StorageError::NotFound(_))))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_list_public_excludes_private_rows() {
    let Some(storage) = test_storage().await else {
        return;
    };
    let private = storage
        .store(
            b"hidden".to_vec(),
            meta(Credential::Plaintext {
                password: String::new(),
            }),
        )
        .await
        .unwrap();

    let public = storage.list_public().await.unwrap();
    assert!(public.iter().all(|entry| entry.id != private));
    assert!(storage
        .list()
        .await
        .unwrap()
        .iter()
        .any(|entry| entry.id == private));
}
