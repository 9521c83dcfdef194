//! btleplug-backed transport implementation.
//!
//! Thin I/O shim: discovery, connection establishment, and characteristic
//! writes. All policy (name filtering, characteristic choice, state) lives
//! in [`crate::link::manager::LinkManager`].

use crate::link::manager::LinkManager;
use crate::link::transport::{CharacteristicInfo, Connection, Transport};
use crate::link::types::{AdvertisedDevice, LinkError};
use btleplug::api::{
    Central, CentralEvent, CentralState, CharPropFlags, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Transport over the platform BLE adapter.
#[derive(Clone)]
pub struct BleTransport {
    adapter: Adapter,
}

impl BleTransport {
    /// Initialize the first available BLE adapter.
    pub async fn initialize() -> Result<Self, LinkError> {
        let manager = Manager::new()
            .await
            .map_err(|e| LinkError::Transport(e.to_string()))?;

        let adapters = manager
            .adapters()
            .await
            .map_err(|e| LinkError::Transport(e.to_string()))?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(LinkError::AdapterUnavailable)?;

        tracing::info!("BLE adapter initialized");
        Ok(Self { adapter })
    }

    /// Watch adapter events and force the link down when the adapter is
    /// powered off, regardless of link state.
    pub fn spawn_adapter_watch(&self, link: Arc<LinkManager<BleTransport>>) -> JoinHandle<()> {
        let adapter = self.adapter.clone();
        tokio::spawn(async move {
            let mut events = match adapter.events().await {
                Ok(events) => events,
                Err(e) => {
                    tracing::error!(error = %e, "failed to get adapter events");
                    return;
                }
            };

            while let Some(event) = events.next().await {
                if let CentralEvent::StateUpdate(CentralState::PoweredOff) = event {
                    link.force_disconnect("adapter powered off").await;
                }
            }
        })
    }
}

impl Transport for BleTransport {
    type Conn = BleConnection;

    async fn scan(&self, timeout: Duration) -> Result<Vec<AdvertisedDevice>, LinkError> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| LinkError::ScanFailed(e.to_string()))?;

        tokio::time::sleep(timeout).await;

        if let Err(e) = self.adapter.stop_scan().await {
            tracing::warn!(error = %e, "failed to stop scan");
        }

        let peripherals = self
            .adapter
            .peripherals()
            .await
            .map_err(|e| LinkError::ScanFailed(e.to_string()))?;

        let mut devices = Vec::with_capacity(peripherals.len());
        for peripheral in peripherals {
            let properties = peripheral.properties().await.ok().flatten();
            devices.push(AdvertisedDevice {
                device_id: peripheral.id().to_string(),
                name: properties.as_ref().and_then(|p| p.local_name.clone()),
                signal_strength: properties.and_then(|p| p.rssi),
            });
        }

        Ok(devices)
    }

    async fn connect(&self, device_id: &str) -> Result<BleConnection, LinkError> {
        let peripherals = self
            .adapter
            .peripherals()
            .await
            .map_err(|e| LinkError::Transport(e.to_string()))?;

        let peripheral = peripherals
            .into_iter()
            .find(|p| p.id().to_string() == device_id)
            .ok_or(LinkError::DeviceNotFound)?;

        peripheral
            .connect()
            .await
            .map_err(|e| LinkError::ConnectionFailed(e.to_string()))?;

        peripheral
            .discover_services()
            .await
            .map_err(|e| LinkError::ConnectionFailed(e.to_string()))?;

        Ok(BleConnection { peripheral })
    }
}

/// An established BLE connection.
pub struct BleConnection {
    peripheral: Peripheral,
}

impl Connection for BleConnection {
    fn characteristics(&self) -> Vec<CharacteristicInfo> {
        self.peripheral
            .characteristics()
            .into_iter()
            .map(|c| CharacteristicInfo {
                service: c.service_uuid,
                uuid: c.uuid,
                writable: c
                    .properties
                    .intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE),
            })
            .collect()
    }

    async fn write(&self, characteristic: Uuid, payload: &[u8]) -> Result<(), LinkError> {
        let characteristics = self.peripheral.characteristics();
        let target = characteristics
            .iter()
            .find(|c| c.uuid == characteristic)
            .ok_or(LinkError::NotConnected)?;

        let write_type = if target.properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE) {
            WriteType::WithoutResponse
        } else {
            WriteType::WithResponse
        };

        self.peripheral
            .write(target, payload, write_type)
            .await
            .map_err(|e| LinkError::WriteFailed(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), LinkError> {
        self.peripheral
            .disconnect()
            .await
            .map_err(|e| LinkError::Transport(e.to_string()))
    }
}
