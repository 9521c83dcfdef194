//! Live sensor aggregation.
//!
//! Sensor drivers (GPS, accelerometer, battery) are external; they push
//! already-sampled scalars into the [`hub::SensorHub`], which keeps the
//! single latest snapshot consumed by the statistics engine and the
//! transmission scheduler.

pub mod hub;
pub mod lean;
pub mod types;

pub use hub::SensorHub;
pub use types::SensorReading;
