//! Ephemera Storage Library
//!
//! This crate defines the storage contract the `Files` orchestrator delegates to,
//! together with an in-memory adapter and a local filesystem adapter. The
//! PostgreSQL adapter lives in `ephemera-db`.
//!
//! # Adapter requirements
//!
//! Every adapter must be safe for concurrent use and each operation must be atomic
//! from the caller's point of view. In particular, when two callers delete the same
//! id concurrently exactly one succeeds and the other gets [`StorageError::NotFound`].
//! Ids are allocated by the adapter and never reused within one adapter instance.

#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use ephemera_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use traits::{FileStorage, StorageError, StorageResult};
