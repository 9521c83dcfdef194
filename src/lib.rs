//! HelmLink - Smart Helmet Ride Telemetry Core
//!
//! Links live motion/location/power sensors to a BLE smart-helmet display
//! and aggregates raw samples into running trip statistics. Provides the
//! connection/reconnection state machine, the fixed 16-byte telemetry wire
//! format, the periodic transmission scheduler, and the ride statistics
//! engine.

pub mod app;
pub mod clock;
pub mod events;
pub mod link;
pub mod ride;
pub mod sensors;
pub mod storage;
pub mod telemetry;

// Re-export commonly used types
pub use app::HelmetApp;
pub use link::manager::LinkManager;
pub use ride::engine::RideEngine;
pub use sensors::hub::SensorHub;
pub use telemetry::codec::TelemetryFrame;
pub use telemetry::scheduler::TelemetryScheduler;
