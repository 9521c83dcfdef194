//! Persistence and configuration.

pub mod config;
pub mod database;
pub mod rides;
pub mod schema;

pub use config::AppConfig;
pub use database::Database;
pub use rides::{MemoryRideStore, RideStore, StorageError};
