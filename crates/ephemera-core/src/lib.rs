//! Ephemera Core Library
//!
//! This crate provides the domain models, password schemes, error types and
//! configuration shared by every Ephemera component.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use auth::{
    verify_credential, Argon2Scheme, CredentialError, PasswordScheme, PlaintextScheme, SchemeKind,
};
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{Credential, FileId, FileListEntry, FileMetadata};
pub use storage_types::StorageBackend;
