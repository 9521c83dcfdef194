//! Telemetry encoding and transmission scheduling.

pub mod codec;
pub mod scheduler;

pub use codec::{TelemetryFrame, FRAME_LEN};
pub use scheduler::{SchedulerStats, TelemetryScheduler};
