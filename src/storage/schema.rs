//! Database schema definitions for helmlink.

/// SQL for the schema version bookkeeping table.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// SQL schema for all tables.
pub const SCHEMA: &str = r#"
-- Current ride (single row; only the most recent ride is retained)
CREATE TABLE IF NOT EXISTS current_ride (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    distance_km REAL NOT NULL,
    duration_secs REAL NOT NULL,
    avg_speed_kmh REAL NOT NULL,
    max_speed_kmh REAL NOT NULL,
    min_lean_left_deg REAL,
    max_lean_left_deg REAL,
    min_lean_right_deg REAL,
    max_lean_right_deg REAL,
    started_at TEXT,
    ended_at TEXT
);
"#;
