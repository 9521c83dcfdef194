//! Ride statistics engine.
//!
//! Owns the Idle/Active ride lifecycle and integrates the live sensor
//! snapshot into a [`RideProfile`] once per tick. The engine owns its
//! ticker task: `start()` spawns it, `stop()` aborts it before doing the
//! final partial-interval integration, so no tick can land after `stop()`
//! returns. The tick interval also serves as the nominal delta substituted
//! when the wall clock misbehaves.

use crate::clock::Clock;
use crate::ride::types::{RideError, RideProfile};
use crate::sensors::types::SensorReading;
use crate::sensors::SensorHub;
use crate::storage::rides::RideStore;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

struct EngineInner {
    active: bool,
    profile: RideProfile,
    last_update: DateTime<Utc>,
}

impl EngineInner {
    /// Fold one interval of sensor data into the profile and advance the
    /// last-update stamp. The stamp moves at the END of the fold, never
    /// before, so back-to-back ticks cannot double-count an interval.
    fn integrate(&mut self, reading: &SensorReading, dt_secs: f64, now: DateTime<Utc>) {
        let profile = &mut self.profile;
        profile.distance_km += reading.speed_kmh * dt_secs / 3600.0;
        profile.max_speed_kmh = profile.max_speed_kmh.max(reading.speed_kmh);
        profile.observe_lean(reading.lean_left_deg, reading.lean_right_deg);

        if let Some(start) = profile.started_at {
            profile.duration_secs = ((now - start).num_milliseconds() as f64 / 1000.0).max(0.0);
        }
        profile.avg_speed_kmh = if profile.duration_secs > 0.0 {
            profile.distance_km / (profile.duration_secs / 3600.0)
        } else {
            0.0
        };

        self.last_update = now;
    }
}

/// Converts periodic ticks plus the current sensor snapshot into running
/// ride statistics.
pub struct RideEngine {
    hub: Arc<SensorHub>,
    store: Arc<dyn RideStore>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    inner: Arc<Mutex<EngineInner>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl RideEngine {
    /// Create an idle engine.
    pub fn new(
        hub: Arc<SensorHub>,
        store: Arc<dyn RideStore>,
        clock: Arc<dyn Clock>,
        tick_interval: Duration,
    ) -> Self {
        let now = clock.now();
        Self {
            hub,
            store,
            clock,
            tick_interval,
            inner: Arc::new(Mutex::new(EngineInner {
                active: false,
                profile: RideProfile::default(),
                last_update: now,
            })),
            ticker: Mutex::new(None),
        }
    }

    /// Start a new ride: reset the profile, record the start instant, and
    /// spawn the ticker.
    ///
    /// Returns [`RideError::AlreadyActive`] if a ride is running.
    pub fn start(&self) -> Result<(), RideError> {
        {
            let mut inner = lock_recover(&self.inner);
            if inner.active {
                return Err(RideError::AlreadyActive);
            }
            let now = self.clock.now();
            inner.profile = RideProfile::started(now);
            inner.last_update = now;
            inner.active = true;
        }

        let inner = Arc::clone(&self.inner);
        let hub = Arc::clone(&self.hub);
        let clock = Arc::clone(&self.clock);
        let interval = self.tick_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately; skip it so the
            // first integration covers a real interval.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                run_tick(&inner, &hub, clock.as_ref(), interval);
            }
        });

        if let Some(stale) = lock_recover(&self.ticker).replace(handle) {
            stale.abort();
        }

        tracing::info!("Started ride");
        Ok(())
    }

    /// Perform one statistics update from the current sensor snapshot.
    ///
    /// Failures are logged and the tick skipped; a skipped tick never
    /// leaves a partial mutation behind.
    pub fn tick(&self) {
        run_tick(
            &self.inner,
            &self.hub,
            self.clock.as_ref(),
            self.tick_interval,
        );
    }

    /// Stop the active ride: kill the ticker, integrate the trailing
    /// partial interval, freeze the profile, and persist it.
    ///
    /// Returns [`RideError::NotActive`] if no ride is running. The ride is
    /// stopped even when persistence fails; the failure is surfaced as
    /// [`RideError::PersistFailed`].
    pub fn stop(&self) -> Result<RideProfile, RideError> {
        // No tick may fire after stop() returns.
        if let Some(handle) = lock_recover(&self.ticker).take() {
            handle.abort();
        }

        let now = self.clock.now();
        let reading = self.hub.snapshot();

        let profile = {
            let mut inner = lock_recover(&self.inner);
            if !inner.active {
                return Err(RideError::NotActive);
            }

            // Trailing interval since the last tick: only what actually
            // elapsed, never a padded full period.
            let dt_secs = (now - inner.last_update).num_milliseconds() as f64 / 1000.0;
            if dt_secs > 0.0 {
                inner.integrate(&reading, dt_secs, now);
            }

            inner.profile.ended_at = Some(now);
            inner.active = false;
            inner.profile.clone()
        };

        tracing::info!(
            distance_km = profile.distance_km,
            duration = %profile.duration_formatted(),
            "Stopped ride"
        );

        self.store
            .save_ride(&profile)
            .map_err(|e| RideError::PersistFailed(e.to_string()))?;

        Ok(profile)
    }

    /// Whether a ride is currently active.
    pub fn is_active(&self) -> bool {
        lock_recover(&self.inner).active
    }

    /// Copy of the current (or last frozen) profile for display.
    pub fn profile(&self) -> RideProfile {
        lock_recover(&self.inner).profile.clone()
    }

    /// Most recent persisted ride, for display while idle.
    pub fn last_saved(&self) -> Result<Option<RideProfile>, RideError> {
        self.store
            .load_ride()
            .map_err(|e| RideError::LoadFailed(e.to_string()))
    }
}

impl Drop for RideEngine {
    fn drop(&mut self) {
        if let Some(handle) = lock_recover(&self.ticker).take() {
            handle.abort();
        }
    }
}

/// One tick, shared by the ticker task and the public method.
fn run_tick(
    inner: &Mutex<EngineInner>,
    hub: &SensorHub,
    clock: &dyn Clock,
    nominal_interval: Duration,
) {
    let now = clock.now();
    let reading = hub.snapshot();

    let mut inner = match inner.lock() {
        Ok(guard) => guard,
        Err(e) => {
            tracing::warn!(error = %e, "statistics tick skipped: engine state unavailable");
            return;
        }
    };
    if !inner.active {
        return;
    }

    let mut dt_secs = (now - inner.last_update).num_milliseconds() as f64 / 1000.0;
    if dt_secs <= 0.0 {
        tracing::warn!(
            dt_secs,
            "non-positive tick delta, substituting nominal interval"
        );
        dt_secs = nominal_interval.as_secs_f64();
    }

    inner.integrate(&reading, dt_secs, now);
    tracing::debug!(
        distance_km = inner.profile.distance_km,
        speed_kmh = reading.speed_kmh,
        "statistics tick"
    );
}

fn lock_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
