//! Ephemera API Library
//!
//! This crate provides the HTTP handlers, error rendering, telemetry and application
//! setup for the Ephemera file service.

pub mod constants;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use handlers::files::FileIdResponse;
pub use state::AppState;
