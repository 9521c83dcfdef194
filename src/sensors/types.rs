//! Value types for the live sensor aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of the latest readings from all sensors.
///
/// Only the most recent value per dimension is material; no history is
/// kept. At most one of the two lean angles is non-zero; both come from
/// a single signed roll measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Ground speed in km/h
    pub speed_kmh: f64,
    /// Lean angle to the left in degrees (>= 0)
    pub lean_left_deg: f64,
    /// Lean angle to the right in degrees (>= 0)
    pub lean_right_deg: f64,
    /// Phone battery level in percent (0-100)
    pub battery_percent: f64,
    /// When any dimension was last updated
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    /// An all-zero reading stamped with the given instant.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            speed_kmh: 0.0,
            lean_left_deg: 0.0,
            lean_right_deg: 0.0,
            battery_percent: 0.0,
            timestamp,
        }
    }

    /// Signed roll reconstructed from the two magnitudes
    /// (negative = left, positive = right).
    pub fn signed_roll_deg(&self) -> f64 {
        if self.lean_left_deg > 0.0 {
            -self.lean_left_deg
        } else {
            self.lean_right_deg
        }
    }
}
