//! Ride persistence collaborator.
//!
//! The statistics engine persists the frozen profile at ride stop and
//! reloads the most recent one for display while idle. Only the single
//! current/most-recent ride is retained. The link manager and the
//! scheduler never touch storage.

use crate::ride::types::RideProfile;
use std::sync::Mutex;
use thiserror::Error;

/// Errors from ride persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Opening the backing store failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema initialization or migration failed
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// A read or write failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),
}

/// Persists and retrieves the current ride profile.
pub trait RideStore: Send + Sync {
    /// Persist the profile as the current ride, replacing any previous one.
    fn save_ride(&self, profile: &RideProfile) -> Result<(), StorageError>;

    /// Load the most recently saved ride, if any.
    fn load_ride(&self) -> Result<Option<RideProfile>, StorageError>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryRideStore {
    slot: Mutex<Option<RideProfile>>,
}

impl MemoryRideStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RideStore for MemoryRideStore {
    fn save_ride(&self, profile: &RideProfile) -> Result<(), StorageError> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(profile.clone());
        Ok(())
    }

    fn load_ride(&self) -> Result<Option<RideProfile>, StorageError> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        Ok(slot.clone())
    }
}
