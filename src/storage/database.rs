//! SQLite-backed ride store using rusqlite.

use crate::ride::types::RideProfile;
use crate::storage::rides::{RideStore, StorageError};
use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.initialize()?;

        Ok(db)
    }

    /// Initialize the schema, migrating if the on-disk version is older.
    fn initialize(&self) -> Result<(), StorageError> {
        let conn = self.lock_conn();

        conn.execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        if current_version < CURRENT_VERSION {
            conn.execute_batch(SCHEMA)
                .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
            conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                params![CURRENT_VERSION, Utc::now().to_rfc3339()],
            )
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

            tracing::info!(version = CURRENT_VERSION, "Database schema initialized");
        }

        Ok(())
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RideStore for Database {
    fn save_ride(&self, profile: &RideProfile) -> Result<(), StorageError> {
        let conn = self.lock_conn();

        conn.execute(
            "INSERT OR REPLACE INTO current_ride (
                id, distance_km, duration_secs, avg_speed_kmh, max_speed_kmh,
                min_lean_left_deg, max_lean_left_deg,
                min_lean_right_deg, max_lean_right_deg,
                started_at, ended_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                profile.distance_km,
                profile.duration_secs,
                profile.avg_speed_kmh,
                profile.max_speed_kmh,
                profile.min_lean_left_deg,
                profile.max_lean_left_deg,
                profile.min_lean_right_deg,
                profile.max_lean_right_deg,
                profile.started_at.map(|t| t.to_rfc3339()),
                profile.ended_at.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        tracing::debug!(distance_km = profile.distance_km, "Ride saved");
        Ok(())
    }

    fn load_ride(&self) -> Result<Option<RideProfile>, StorageError> {
        let conn = self.lock_conn();

        conn.query_row(
            "SELECT distance_km, duration_secs, avg_speed_kmh, max_speed_kmh,
                    min_lean_left_deg, max_lean_left_deg,
                    min_lean_right_deg, max_lean_right_deg,
                    started_at, ended_at
             FROM current_ride WHERE id = 1",
            [],
            |row| {
                Ok(RideProfile {
                    distance_km: row.get(0)?,
                    duration_secs: row.get(1)?,
                    avg_speed_kmh: row.get(2)?,
                    max_speed_kmh: row.get(3)?,
                    min_lean_left_deg: row.get(4)?,
                    max_lean_left_deg: row.get(5)?,
                    min_lean_right_deg: row.get(6)?,
                    max_lean_right_deg: row.get(7)?,
                    started_at: parse_timestamp(row.get::<_, Option<String>>(8)?),
                    ended_at: parse_timestamp(row.get::<_, Option<String>>(9)?),
                })
            },
        )
        .optional()
        .map_err(|e| StorageError::QueryFailed(e.to_string()))
    }
}

fn parse_timestamp(text: Option<String>) -> Option<DateTime<Utc>> {
    text.and_then(|t| {
        DateTime::parse_from_rfc3339(&t)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_profile() -> RideProfile {
        RideProfile {
            distance_km: 42.7,
            duration_secs: 3600.0,
            avg_speed_kmh: 42.7,
            max_speed_kmh: 88.2,
            min_lean_left_deg: Some(3.5),
            max_lean_left_deg: Some(38.0),
            min_lean_right_deg: None,
            max_lean_right_deg: None,
            started_at: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
            ended_at: Some(Utc.timestamp_opt(1_700_003_600, 0).unwrap()),
        }
    }

    #[test]
    fn test_empty_database_has_no_ride() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_ride().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let profile = sample_profile();

        db.save_ride(&profile).unwrap();
        let loaded = db.load_ride().unwrap().unwrap();

        assert_eq!(loaded, profile);
    }

    #[test]
    fn test_save_replaces_previous_ride() {
        let db = Database::open_in_memory().unwrap();
        db.save_ride(&sample_profile()).unwrap();

        let second = RideProfile {
            distance_km: 1.0,
            ..Default::default()
        };
        db.save_ride(&second).unwrap();

        let loaded = db.load_ride().unwrap().unwrap();
        assert_eq!(loaded.distance_km, 1.0);
        assert_eq!(loaded.min_lean_left_deg, None);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rides.db");

        let db = Database::open(&path).unwrap();
        db.save_ride(&sample_profile()).unwrap();

        assert!(path.exists());
    }
}
