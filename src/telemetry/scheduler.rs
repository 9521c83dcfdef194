//! Periodic telemetry transmission.
//!
//! Fires on a fixed period. Each firing is cheap: when the link is down
//! it does nothing, and when a previous send is still in flight it skips
//! rather than overlap, so at most one frame is ever in flight, preserving
//! frame order without transport-level assumptions. The scheduler and the
//! statistics engine run on independent tasks and meet only at the sensor
//! hub snapshot.

use crate::link::manager::LinkManager;
use crate::link::transport::Transport;
use crate::sensors::SensorHub;
use crate::telemetry::codec::TelemetryFrame;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Default)]
struct Counters {
    fires: AtomicU64,
    skipped_idle: AtomicU64,
    skipped_busy: AtomicU64,
}

/// Snapshot of the scheduler's firing counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Total timer firings
    pub fires: u64,
    /// Firings skipped because the link was not connected
    pub skipped_idle: u64,
    /// Firings skipped because a send was still in flight
    pub skipped_busy: u64,
}

/// Drives periodic frame transmission over the link.
pub struct TelemetryScheduler<T: Transport> {
    link: Arc<LinkManager<T>>,
    hub: Arc<SensorHub>,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
    in_flight: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl<T: Transport> TelemetryScheduler<T> {
    /// Create a stopped scheduler.
    pub fn new(link: Arc<LinkManager<T>>, hub: Arc<SensorHub>, interval: Duration) -> Self {
        Self {
            link,
            hub,
            interval,
            task: Mutex::new(None),
            in_flight: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Start the transmission loop. No-op if already running.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let link = Arc::clone(&self.link);
        let hub = Arc::clone(&self.hub);
        let in_flight = Arc::clone(&self.in_flight);
        let counters = Arc::clone(&self.counters);
        let interval = self.interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                fire_once(&link, &hub, &in_flight, &counters);
            }
        }));

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Telemetry scheduler started"
        );
    }

    /// Stop the loop. After this returns no further firing will occur;
    /// a send already in flight is allowed to finish.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
            tracing::info!("Telemetry scheduler stopped");
        }
    }

    /// Whether the transmission loop is running.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Copy of the firing counters.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            fires: self.counters.fires.load(Ordering::Relaxed),
            skipped_idle: self.counters.skipped_idle.load(Ordering::Relaxed),
            skipped_busy: self.counters.skipped_busy.load(Ordering::Relaxed),
        }
    }

    /// One scheduler firing: snapshot, encode, hand off to the link.
    ///
    /// Public so the firing policy is testable without timers; the loop
    /// runs exactly this.
    pub fn fire(&self) {
        fire_once(&self.link, &self.hub, &self.in_flight, &self.counters);
    }
}

impl<T: Transport> Drop for TelemetryScheduler<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One firing, shared by the loop task and [`TelemetryScheduler::fire`].
fn fire_once<T: Transport>(
    link: &Arc<LinkManager<T>>,
    hub: &Arc<SensorHub>,
    in_flight: &Arc<AtomicBool>,
    counters: &Arc<Counters>,
) {
    counters.fires.fetch_add(1, Ordering::Relaxed);

    if !link.is_connected() {
        counters.skipped_idle.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("link not connected, skipping transmission");
        return;
    }

    if in_flight.swap(true, Ordering::AcqRel) {
        counters.skipped_busy.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("previous send still in flight, skipping firing");
        return;
    }

    let reading = hub.snapshot();
    let frame = TelemetryFrame::new(
        reading.speed_kmh as f32,
        reading.lean_left_deg as f32,
        reading.lean_right_deg as f32,
        reading.battery_percent as f32,
    )
    .encode();

    let link = Arc::clone(link);
    let in_flight = Arc::clone(in_flight);
    tokio::spawn(async move {
        if let Err(e) = link.send(&frame).await {
            tracing::debug!(error = %e, "telemetry send failed");
        }
        in_flight.store(false, Ordering::Release);
    });
}
