//! Link manager: the connection/reconnection state machine.
//!
//! Owns the only mutable transport handle in the process. State
//! transitions are serialized: a scan or connect arriving while another
//! attempt is in flight is rejected, never queued. The transport handle
//! and the resolved characteristic live and die together; every
//! disconnect path clears both.

use crate::clock::Clock;
use crate::events::Observers;
use crate::link::transport::{CharacteristicInfo, Connection, Transport};
use crate::link::types::{
    is_helmet_name, AdvertisedDevice, Capability, LinkConfig, LinkDiagnostics, LinkError,
    LinkEvent, LinkState, HELMET_SERVICE_UUID, HELMET_TELEMETRY_UUID,
};
use crate::telemetry::codec::FRAME_LEN;
use crossbeam::channel::Receiver;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

struct ActiveLink<C> {
    conn: C,
    characteristic: Uuid,
}

/// Manages discovery, connection, and telemetry writes to the helmet.
pub struct LinkManager<T: Transport> {
    transport: T,
    capability: Arc<dyn Capability>,
    clock: Arc<dyn Clock>,
    config: LinkConfig,
    state: Mutex<LinkState>,
    active: tokio::sync::Mutex<Option<ActiveLink<T::Conn>>>,
    diagnostics: Mutex<LinkDiagnostics>,
    observers: Observers<LinkEvent>,
}

impl<T: Transport> LinkManager<T> {
    /// Create a disconnected link manager.
    pub fn new(
        transport: T,
        capability: Arc<dyn Capability>,
        clock: Arc<dyn Clock>,
        config: LinkConfig,
    ) -> Self {
        Self {
            transport,
            capability,
            clock,
            config,
            state: Mutex::new(LinkState::Disconnected),
            active: tokio::sync::Mutex::new(None),
            diagnostics: Mutex::new(LinkDiagnostics::default()),
            observers: Observers::new(),
        }
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the link is established with a resolved characteristic.
    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Copy of the diagnostics counters.
    pub fn diagnostics(&self) -> LinkDiagnostics {
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Subscribe to link events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<LinkEvent> {
        self.observers.subscribe()
    }

    /// Scan for helmets and return the name-filtered matches.
    ///
    /// An empty result is not an error. The link returns to Disconnected
    /// when the scan window closes; Scanning is not a resting state.
    pub async fn scan(&self) -> Result<Vec<AdvertisedDevice>, LinkError> {
        if !self.capability.ensure_ready() {
            self.record_error("wireless adapter not ready");
            return Err(LinkError::AdapterUnavailable);
        }

        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != LinkState::Disconnected {
                return Err(LinkError::Busy);
            }
            *state = LinkState::Scanning;
        }
        self.observers.emit(LinkEvent::StateChanged(LinkState::Scanning));
        self.observers.emit(LinkEvent::ScanStarted);
        tracing::info!(timeout_secs = self.config.scan_timeout_secs, "Scanning for helmets");

        let result = self.transport.scan(self.config.scan_timeout()).await;

        self.set_state(LinkState::Disconnected);
        self.observers.emit(LinkEvent::ScanStopped);

        let devices = result.map_err(|e| {
            self.record_error(&e.to_string());
            e
        })?;

        let matches: Vec<AdvertisedDevice> = devices
            .into_iter()
            .filter(|d| is_helmet_name(d.name.as_deref()))
            .collect();

        for device in &matches {
            tracing::info!(
                device_id = %device.device_id,
                name = device.name.as_deref().unwrap_or("<unnamed>"),
                "Discovered helmet"
            );
            self.observers.emit(LinkEvent::Discovered(device.clone()));
        }
        if matches.is_empty() {
            tracing::info!("Scan finished with no matching devices");
        }

        Ok(matches)
    }

    /// Connect to a discovered device and resolve its telemetry
    /// characteristic.
    ///
    /// Resolution targets the known service/characteristic pair first and
    /// falls back to the first writable characteristic on any service; the
    /// fallback is recorded in diagnostics. A call arriving while a
    /// connection attempt is in flight is rejected without disturbing it.
    pub async fn connect(&self, device: &AdvertisedDevice) -> Result<(), LinkError> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match *state {
                LinkState::Connecting | LinkState::Scanning => return Err(LinkError::Busy),
                LinkState::Connected => return Err(LinkError::AlreadyConnected),
                LinkState::Disconnected => *state = LinkState::Connecting,
            }
        }
        self.observers.emit(LinkEvent::StateChanged(LinkState::Connecting));
        tracing::info!(device_id = %device.device_id, "Connecting to helmet");

        let conn = match tokio::time::timeout(
            self.config.connect_timeout(),
            self.transport.connect(&device.device_id),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                self.record_error(&e.to_string());
                self.set_state(LinkState::Disconnected);
                return Err(e);
            }
            Err(_) => {
                self.record_error("connection attempt timed out");
                self.set_state(LinkState::Disconnected);
                return Err(LinkError::ConnectionFailed("timed out".to_string()));
            }
        };

        let (characteristic, fallback) = match resolve_characteristic(&conn.characteristics()) {
            Some(resolved) => resolved,
            None => {
                if let Err(e) = conn.disconnect().await {
                    tracing::warn!(error = %e, "failed to release unusable connection");
                }
                self.record_error("no writable characteristic found");
                self.set_state(LinkState::Disconnected);
                return Err(LinkError::NoWritableCharacteristic);
            }
        };

        if fallback {
            tracing::warn!(
                characteristic = %characteristic,
                "helmet service not found, using first writable characteristic"
            );
        }

        {
            let mut active = self.active.lock().await;
            *active = Some(ActiveLink {
                conn,
                characteristic,
            });
        }

        // An adapter-off signal may have forced a disconnect while the
        // attempt was in flight; in that case release what we just built.
        let aborted = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == LinkState::Connecting {
                *state = LinkState::Connected;
                false
            } else {
                true
            }
        };
        if aborted {
            if let Some(active) = self.active.lock().await.take() {
                let _ = active.conn.disconnect().await;
            }
            return Err(LinkError::ConnectionFailed(
                "link torn down during connect".to_string(),
            ));
        }

        {
            let mut diagnostics = self.diagnostics.lock().unwrap_or_else(|e| e.into_inner());
            diagnostics.fallback_characteristic = fallback;
        }

        self.observers.emit(LinkEvent::StateChanged(LinkState::Connected));
        tracing::info!(device_id = %device.device_id, fallback, "Connected to helmet");
        Ok(())
    }

    /// Release the link. Idempotent: disconnecting a disconnected link is
    /// a success no-op.
    pub async fn disconnect(&self) -> Result<(), LinkError> {
        self.teardown("disconnect requested").await;
        Ok(())
    }

    /// Forced teardown from any state, e.g. the adapter-powered-off
    /// signal.
    pub async fn force_disconnect(&self, reason: &str) {
        tracing::warn!(reason, "Forcing link disconnect");
        self.record_error(reason);
        self.teardown(reason).await;
    }

    /// Reconnection policy for the orchestrator: no-op when already
    /// connected, otherwise scan and connect to the first match.
    pub async fn ensure_connected(&self) -> Result<(), LinkError> {
        if self.is_connected() {
            tracing::debug!("already connected, skipping reconnect");
            return Ok(());
        }

        let matches = self.scan().await?;
        let first = matches.first().ok_or(LinkError::DeviceNotFound)?;
        self.connect(first).await
    }

    /// Write one telemetry frame.
    ///
    /// Fails fast when not connected: no queueing, no retry. A failed
    /// write is recorded in diagnostics but does not tear the link down.
    pub async fn send(&self, frame: &[u8; FRAME_LEN]) -> Result<(), LinkError> {
        if self.state() != LinkState::Connected {
            return Err(LinkError::NotConnected);
        }

        let active = self.active.lock().await;
        let link = active.as_ref().ok_or(LinkError::NotConnected)?;

        match link.conn.write(link.characteristic, frame).await {
            Ok(()) => {
                let mut diagnostics =
                    self.diagnostics.lock().unwrap_or_else(|e| e.into_inner());
                diagnostics.frames_sent += 1;
                diagnostics.last_sent_at = Some(self.clock.now());
                tracing::trace!(frames_sent = diagnostics.frames_sent, "Telemetry frame sent");
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                {
                    let mut diagnostics =
                        self.diagnostics.lock().unwrap_or_else(|e| e.into_inner());
                    diagnostics.sends_failed += 1;
                    diagnostics.last_error = Some(message.clone());
                }
                tracing::warn!(error = %message, "Telemetry write failed");
                self.observers.emit(LinkEvent::SendFailed(message.clone()));
                Err(LinkError::WriteFailed(message))
            }
        }
    }

    /// Release the handle and the characteristic together and drop to
    /// Disconnected.
    async fn teardown(&self, reason: &str) {
        if let Some(active) = self.active.lock().await.take() {
            if let Err(e) = active.conn.disconnect().await {
                tracing::warn!(error = %e, reason, "transport disconnect failed");
            }
        }
        self.set_state(LinkState::Disconnected);
    }

    fn set_state(&self, new: LinkState) {
        let changed = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let changed = *state != new;
            *state = new;
            changed
        };
        if changed {
            tracing::debug!(state = %new, "Link state changed");
            self.observers.emit(LinkEvent::StateChanged(new));
        }
    }

    fn record_error(&self, message: &str) {
        let mut diagnostics = self.diagnostics.lock().unwrap_or_else(|e| e.into_inner());
        diagnostics.last_error = Some(message.to_string());
    }
}

/// Pick the telemetry characteristic: the known service/characteristic
/// pair when present, otherwise the first writable characteristic across
/// all services. Returns (uuid, used_fallback).
fn resolve_characteristic(characteristics: &[CharacteristicInfo]) -> Option<(Uuid, bool)> {
    if let Some(target) = characteristics.iter().find(|c| {
        c.service == HELMET_SERVICE_UUID && c.uuid == HELMET_TELEMETRY_UUID && c.writable
    }) {
        return Some((target.uuid, false));
    }

    characteristics
        .iter()
        .find(|c| c.writable)
        .map(|c| (c.uuid, true))
}
