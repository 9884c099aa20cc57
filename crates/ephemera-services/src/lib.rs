//! Ephemera Services Library
//!
//! The [`Files`] orchestrator is the single entry point for business logic. It wraps
//! any [`FileStorage`] adapter and adds expiry and password checks around each call.

pub mod files;

pub use ephemera_storage::{FileStorage, StorageBackend, StorageError};
pub use files::{Files, FilesError, FilesResult};
