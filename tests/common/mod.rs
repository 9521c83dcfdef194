//! Shared test doubles: an in-process fake transport for driving the
//! link state machine without BLE hardware.

#![allow(dead_code)]

use helmlink::link::transport::{CharacteristicInfo, Connection, Transport};
use helmlink::link::types::{
    AdvertisedDevice, Capability, LinkError, HELMET_SERVICE_UUID, HELMET_TELEMETRY_UUID,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Capability probe that always refuses.
pub struct NeverReady;

impl Capability for NeverReady {
    fn ensure_ready(&self) -> bool {
        false
    }
}

/// Scriptable transport double. All state is shared, so tests keep a
/// clone and hand another to the link manager.
#[derive(Clone, Default)]
pub struct FakeTransport {
    devices: Arc<Mutex<Vec<AdvertisedDevice>>>,
    characteristics: Arc<Mutex<Vec<CharacteristicInfo>>>,
    pub writes: Arc<Mutex<Vec<Vec<u8>>>>,
    pub scans: Arc<AtomicU64>,
    connect_delay_ms: Arc<AtomicU64>,
    write_delay_ms: Arc<AtomicU64>,
    fail_writes: Arc<AtomicBool>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an advertising device visible to the next scan.
    pub fn advertise(&self, device_id: &str, name: Option<&str>) {
        self.devices
            .lock()
            .unwrap()
            .push(AdvertisedDevice {
                device_id: device_id.to_string(),
                name: name.map(str::to_string),
                signal_strength: Some(-60),
            });
    }

    /// Expose the helmet service with its writable telemetry
    /// characteristic on connected devices.
    pub fn with_helmet_characteristic(&self) -> &Self {
        self.characteristics.lock().unwrap().push(CharacteristicInfo {
            service: HELMET_SERVICE_UUID,
            uuid: HELMET_TELEMETRY_UUID,
            writable: true,
        });
        self
    }

    /// Expose an arbitrary characteristic on connected devices.
    pub fn with_characteristic(&self, service: Uuid, uuid: Uuid, writable: bool) -> &Self {
        self.characteristics.lock().unwrap().push(CharacteristicInfo {
            service,
            uuid,
            writable,
        });
        self
    }

    /// Delay connection establishment, to hold the manager in Connecting.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.connect_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Delay each write, to hold a send in flight.
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Payloads written so far.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    type Conn = FakeConnection;

    async fn scan(&self, _timeout: Duration) -> Result<Vec<AdvertisedDevice>, LinkError> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn connect(&self, device_id: &str) -> Result<FakeConnection, LinkError> {
        let delay = self.connect_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let known = self
            .devices
            .lock()
            .unwrap()
            .iter()
            .any(|d| d.device_id == device_id);
        if !known {
            return Err(LinkError::DeviceNotFound);
        }

        Ok(FakeConnection {
            characteristics: self.characteristics.lock().unwrap().clone(),
            writes: self.writes.clone(),
            write_delay_ms: self.write_delay_ms.clone(),
            fail_writes: self.fail_writes.clone(),
        })
    }
}

pub struct FakeConnection {
    characteristics: Vec<CharacteristicInfo>,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    write_delay_ms: Arc<AtomicU64>,
    fail_writes: Arc<AtomicBool>,
}

impl Connection for FakeConnection {
    fn characteristics(&self) -> Vec<CharacteristicInfo> {
        self.characteristics.clone()
    }

    async fn write(&self, _characteristic: Uuid, payload: &[u8]) -> Result<(), LinkError> {
        let delay = self.write_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(LinkError::WriteFailed("injected write failure".to_string()));
        }
        self.writes.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), LinkError> {
        Ok(())
    }
}
