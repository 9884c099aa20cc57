//! Data models for the application
//!
//! Stored files are described by [`FileMetadata`]; listings use the lighter
//! [`FileListEntry`] projection.

mod file;

pub use file::*;
