//! Database layer
//!
//! PostgreSQL implementation of the storage contract plus pool setup and
//! migrations. Migrations are embedded from the workspace `migrations/` directory.

pub mod files;
pub mod pool;

pub use files::PgFileStorage;
pub use pool::{setup_database, MIGRATOR};
