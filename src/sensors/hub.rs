//! Process-wide aggregate of the latest sensor readings.
//!
//! Sensor drivers push values in from their callbacks; the statistics
//! engine and the transmission scheduler read consistent snapshots out.
//! Writers are serialized through one lock so a snapshot is never torn
//! across fields. Every update publishes the full current snapshot to
//! all subscribers.

use crate::clock::Clock;
use crate::events::Observers;
use crate::sensors::lean::split_roll;
use crate::sensors::types::SensorReading;
use crossbeam::channel::Receiver;
use std::sync::{Arc, Mutex};

/// Shared holder of the most recent [`SensorReading`].
pub struct SensorHub {
    current: Mutex<SensorReading>,
    observers: Observers<SensorReading>,
    clock: Arc<dyn Clock>,
}

impl SensorHub {
    /// Create a hub with all readings zeroed.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let initial = SensorReading::empty(clock.now());
        Self {
            current: Mutex::new(initial),
            observers: Observers::new(),
            clock,
        }
    }

    /// Record a new ground speed in km/h.
    pub fn update_speed(&self, speed_kmh: f64) {
        self.mutate(|reading| reading.speed_kmh = speed_kmh);
    }

    /// Record a new signed roll angle in degrees.
    ///
    /// Negative roll is a lean to the left, positive to the right; the
    /// value is decomposed into the two exclusive magnitudes.
    pub fn update_roll(&self, roll_deg: f64) {
        let (left, right) = split_roll(roll_deg);
        self.mutate(|reading| {
            reading.lean_left_deg = left;
            reading.lean_right_deg = right;
        });
    }

    /// Record lean magnitudes directly.
    ///
    /// At most one side may be non-zero; if both are, the dominant side
    /// wins and the other is zeroed.
    pub fn update_lean(&self, lean_left_deg: f64, lean_right_deg: f64) {
        let (left, right) = if lean_left_deg > 0.0 && lean_right_deg > 0.0 {
            tracing::warn!(
                lean_left_deg,
                lean_right_deg,
                "both lean sides non-zero, keeping dominant side"
            );
            if lean_left_deg >= lean_right_deg {
                (lean_left_deg, 0.0)
            } else {
                (0.0, lean_right_deg)
            }
        } else {
            (lean_left_deg.max(0.0), lean_right_deg.max(0.0))
        };

        self.mutate(|reading| {
            reading.lean_left_deg = left;
            reading.lean_right_deg = right;
        });
    }

    /// Record a new battery level, clamped to 0-100.
    pub fn update_battery(&self, battery_percent: f64) {
        let clamped = battery_percent.clamp(0.0, 100.0);
        self.mutate(|reading| reading.battery_percent = clamped);
    }

    /// Consistent copy of the current reading.
    pub fn snapshot(&self) -> SensorReading {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Subscribe to change notifications carrying the full snapshot.
    ///
    /// Dropping the receiver unsubscribes it.
    pub fn subscribe(&self) -> Receiver<SensorReading> {
        self.observers.subscribe()
    }

    /// Apply one mutation under the writer lock, stamp it, and notify.
    fn mutate(&self, apply: impl FnOnce(&mut SensorReading)) {
        let snapshot = {
            let mut reading = self.current.lock().unwrap_or_else(|e| e.into_inner());
            apply(&mut reading);
            reading.timestamp = self.clock.now();
            *reading
        };
        self.observers.emit(snapshot);
    }
}
