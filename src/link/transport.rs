//! Transport seam between link policy and the wireless stack.
//!
//! The link manager owns the state machine, the name filter, and the
//! characteristic resolution policy; the transport owns the I/O. Tests
//! supply a fake transport, production uses [`crate::link::ble`].

use crate::link::types::{AdvertisedDevice, LinkError};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// One addressable endpoint on a connected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicInfo {
    /// Service the characteristic belongs to
    pub service: Uuid,
    /// Characteristic UUID
    pub uuid: Uuid,
    /// Whether the endpoint accepts writes
    pub writable: bool,
}

/// Wireless transport: discovery and connection establishment.
pub trait Transport: Send + Sync + 'static {
    /// Connection handle type produced by [`Transport::connect`].
    type Conn: Connection;

    /// Discover advertising devices until the timeout elapses. Returns
    /// every device seen; filtering is the caller's policy.
    fn scan(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<AdvertisedDevice>, LinkError>> + Send;

    /// Open a connection to a device seen in a previous scan and discover
    /// its services.
    fn connect(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<Self::Conn, LinkError>> + Send;
}

/// An established connection to a remote device.
pub trait Connection: Send + Sync + 'static {
    /// Characteristics discovered on the device.
    fn characteristics(&self) -> Vec<CharacteristicInfo>;

    /// Write a payload to one characteristic.
    fn write(
        &self,
        characteristic: Uuid,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// Release the connection.
    fn disconnect(&self) -> impl Future<Output = Result<(), LinkError>> + Send;
}
