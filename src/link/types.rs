//! Link state, errors, configuration, and device identity constants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Telemetry service UUID advertised by the helmet firmware
/// (Nordic UART service, as exposed by the ESP32 build).
pub const HELMET_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e40_0001_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// Writable telemetry characteristic UUID within the helmet service.
pub const HELMET_TELEMETRY_UUID: Uuid = Uuid::from_u128(0x6e40_0002_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// Advertised names accepted during discovery, matched case-insensitively
/// as substrings. Not configurable; the paired firmware builds are known.
pub const HELMET_NAME_FILTERS: [&str; 2] = ["esp32_helmet", "smarthelm"];

/// Whether an advertised device name matches the helmet allow-list.
pub fn is_helmet_name(name: Option<&str>) -> bool {
    match name {
        Some(name) => {
            let lower = name.to_lowercase();
            HELMET_NAME_FILTERS.iter().any(|f| lower.contains(f))
        }
        None => false,
    }
}

/// Connection state of the helmet link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No link and no operation in progress
    #[default]
    Disconnected,
    /// Device discovery in progress
    Scanning,
    /// Connection attempt in progress
    Connecting,
    /// Active link with a resolved telemetry characteristic
    Connected,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "Disconnected"),
            LinkState::Scanning => write!(f, "Scanning..."),
            LinkState::Connecting => write!(f, "Connecting..."),
            LinkState::Connected => write!(f, "Connected"),
        }
    }
}

/// Observable side-state of the link, kept for diagnostics display.
#[derive(Debug, Clone, Default)]
pub struct LinkDiagnostics {
    /// Telemetry frames written since process start
    pub frames_sent: u64,
    /// Failed write attempts since process start
    pub sends_failed: u64,
    /// When the last frame was written
    pub last_sent_at: Option<DateTime<Utc>>,
    /// Human-readable description of the most recent failure
    pub last_error: Option<String>,
    /// The current connection resolved its characteristic by the
    /// first-writable fallback instead of the known UUID pair
    pub fallback_characteristic: bool,
}

/// Events from the link manager.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// Discovery started
    ScanStarted,
    /// Discovery finished
    ScanStopped,
    /// A matching device was discovered
    Discovered(AdvertisedDevice),
    /// Link state changed
    StateChanged(LinkState),
    /// A telemetry write failed
    SendFailed(String),
}

/// A device seen during discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvertisedDevice {
    /// Transport-level device identifier
    pub device_id: String,
    /// Advertised name, if any
    pub name: Option<String>,
    /// Signal strength (RSSI), if reported
    pub signal_strength: Option<i16>,
}

/// Configuration for the link manager.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Discovery scan window in seconds
    pub scan_timeout_secs: u64,
    /// Timeout for one connection attempt in seconds
    pub connect_timeout_secs: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            scan_timeout_secs: 8,
            connect_timeout_secs: 10,
        }
    }
}

impl LinkConfig {
    /// Scan window as a [`Duration`].
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    /// Connection timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Opaque precondition checked before scanning: permissions granted and
/// the radio usable. Acquisition itself is the platform layer's job.
pub trait Capability: Send + Sync {
    /// Whether the transport may be used right now.
    fn ensure_ready(&self) -> bool;
}

/// Capability probe for platforms where readiness is handled out-of-band.
#[derive(Debug, Default)]
pub struct AlwaysReady;

impl Capability for AlwaysReady {
    fn ensure_ready(&self) -> bool {
        true
    }
}

/// Errors from the helmet link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Wireless adapter missing, powered off, or permission denied
    #[error("wireless adapter unavailable")]
    AdapterUnavailable,

    /// Another scan or connection attempt is in progress
    #[error("another link operation is in progress")]
    Busy,

    /// connect() was called on an already-connected link
    #[error("already connected")]
    AlreadyConnected,

    /// Device discovery failed at the transport level
    #[error("scan failed: {0}")]
    ScanFailed(String),

    /// No device matched the helmet allow-list
    #[error("no matching device found")]
    DeviceNotFound,

    /// Transport-level connection failure
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Neither the targeted nor any fallback writable characteristic exists
    #[error("no writable characteristic found")]
    NoWritableCharacteristic,

    /// send() was called without an established link
    #[error("not connected")]
    NotConnected,

    /// A telemetry write failed mid-link
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Other transport error
    #[error("transport error: {0}")]
    Transport(String),
}
