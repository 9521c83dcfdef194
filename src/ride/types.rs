//! Ride profile aggregate and engine errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Running statistics for one ride.
///
/// Mutated once per statistics tick while a ride is active, frozen and
/// persisted at ride stop. Lean extrema are `None` until the first
/// non-zero observation on that side, since a literal zero seed would report
/// a spurious zero floor for any ride that ever rides upright.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RideProfile {
    /// Total distance covered in km (monotone while active)
    pub distance_km: f64,
    /// Elapsed ride time in seconds
    pub duration_secs: f64,
    /// Average speed in km/h (0 while no time has elapsed)
    pub avg_speed_kmh: f64,
    /// Highest speed seen in km/h
    pub max_speed_kmh: f64,
    /// Smallest non-zero left lean in degrees
    pub min_lean_left_deg: Option<f64>,
    /// Largest left lean in degrees
    pub max_lean_left_deg: Option<f64>,
    /// Smallest non-zero right lean in degrees
    pub min_lean_right_deg: Option<f64>,
    /// Largest right lean in degrees
    pub max_lean_right_deg: Option<f64>,
    /// When the ride was started
    pub started_at: Option<DateTime<Utc>>,
    /// When the ride was stopped
    pub ended_at: Option<DateTime<Utc>>,
}

impl RideProfile {
    /// A zeroed profile marking the start of a new ride.
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(at),
            ..Self::default()
        }
    }

    /// Fold one lean observation per side into the running extrema.
    ///
    /// Zero means "riding upright" and never enters the extrema.
    pub fn observe_lean(&mut self, lean_left_deg: f64, lean_right_deg: f64) {
        if lean_left_deg > 0.0 {
            self.min_lean_left_deg =
                Some(self.min_lean_left_deg.map_or(lean_left_deg, |m| m.min(lean_left_deg)));
            self.max_lean_left_deg =
                Some(self.max_lean_left_deg.map_or(lean_left_deg, |m| m.max(lean_left_deg)));
        }
        if lean_right_deg > 0.0 {
            self.min_lean_right_deg = Some(
                self.min_lean_right_deg
                    .map_or(lean_right_deg, |m| m.min(lean_right_deg)),
            );
            self.max_lean_right_deg = Some(
                self.max_lean_right_deg
                    .map_or(lean_right_deg, |m| m.max(lean_right_deg)),
            );
        }
    }

    /// Elapsed time formatted as HH:MM:SS for display.
    pub fn duration_formatted(&self) -> String {
        let total = self.duration_secs.max(0.0) as u64;
        format!(
            "{:02}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

/// Errors from the ride statistics engine.
#[derive(Debug, Error)]
pub enum RideError {
    /// start() was called while a ride is already running
    #[error("a ride is already active")]
    AlreadyActive,

    /// stop() was called with no ride running
    #[error("no active ride")]
    NotActive,

    /// The frozen profile could not be persisted
    #[error("failed to persist ride: {0}")]
    PersistFailed(String),

    /// The most recent saved ride could not be loaded
    #[error("failed to load ride: {0}")]
    LoadFailed(String),
}
