//! Helmet link: discovery, connection, and telemetry writes.

pub mod ble;
pub mod manager;
pub mod transport;
pub mod types;

pub use manager::LinkManager;
pub use transport::{CharacteristicInfo, Connection, Transport};
pub use types::{
    AdvertisedDevice, AlwaysReady, Capability, LinkConfig, LinkDiagnostics, LinkError, LinkEvent,
    LinkState,
};
