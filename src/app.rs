//! Application orchestration.
//!
//! Thin glue: builds the component graph with explicit dependency
//! injection and maps lifecycle events (foreground/background, ride
//! start/stop, reconnect) onto the components. No policy of its own.

use crate::clock::Clock;
use crate::link::manager::LinkManager;
use crate::link::transport::Transport;
use crate::link::types::{Capability, LinkError};
use crate::ride::engine::RideEngine;
use crate::ride::types::{RideError, RideProfile};
use crate::sensors::SensorHub;
use crate::storage::config::AppConfig;
use crate::storage::rides::RideStore;
use crate::telemetry::scheduler::TelemetryScheduler;
use std::sync::Arc;

/// Wires the sensor hub, link manager, ride engine, and transmission
/// scheduler together.
pub struct HelmetApp<T: Transport> {
    hub: Arc<SensorHub>,
    link: Arc<LinkManager<T>>,
    engine: Arc<RideEngine>,
    scheduler: Arc<TelemetryScheduler<T>>,
}

impl<T: Transport> HelmetApp<T> {
    /// Build the component graph. Collaborators are injected here; no
    /// component reaches for ambient globals.
    pub fn new(
        transport: T,
        capability: Arc<dyn Capability>,
        store: Arc<dyn RideStore>,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Self {
        let hub = Arc::new(SensorHub::new(clock.clone()));
        let link = Arc::new(LinkManager::new(
            transport,
            capability,
            clock.clone(),
            config.link,
        ));
        let engine = Arc::new(RideEngine::new(
            hub.clone(),
            store,
            clock,
            config.tick_interval(),
        ));
        let scheduler = Arc::new(TelemetryScheduler::new(
            link.clone(),
            hub.clone(),
            config.send_interval(),
        ));

        Self {
            hub,
            link,
            engine,
            scheduler,
        }
    }

    /// The live sensor aggregate, for sensor drivers to push into.
    pub fn hub(&self) -> &Arc<SensorHub> {
        &self.hub
    }

    /// The helmet link.
    pub fn link(&self) -> &Arc<LinkManager<T>> {
        &self.link
    }

    /// The ride statistics engine.
    pub fn engine(&self) -> &Arc<RideEngine> {
        &self.engine
    }

    /// App came to the foreground: resume telemetry transmission.
    pub fn on_foreground(&self) {
        self.scheduler.start();
    }

    /// App went to the background: stop transmission. An active ride
    /// keeps accumulating.
    pub fn on_background(&self) {
        self.scheduler.stop();
    }

    /// Drive one reconnection attempt (no-op when already connected).
    pub async fn reconnect(&self) -> Result<(), LinkError> {
        self.link.ensure_connected().await
    }

    /// Start a new ride.
    pub fn start_ride(&self) -> Result<(), RideError> {
        self.engine.start()
    }

    /// Stop the active ride and persist its profile.
    pub fn stop_ride(&self) -> Result<RideProfile, RideError> {
        self.engine.stop()
    }

    /// Stop everything and release the link.
    pub async fn shutdown(&self) {
        self.scheduler.stop();
        if self.engine.is_active() {
            if let Err(e) = self.engine.stop() {
                tracing::warn!(error = %e, "failed to stop ride during shutdown");
            }
        }
        if let Err(e) = self.link.disconnect().await {
            tracing::warn!(error = %e, "failed to disconnect during shutdown");
        }
    }
}
