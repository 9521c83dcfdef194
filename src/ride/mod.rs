//! Ride lifecycle and statistics.

pub mod engine;
pub mod types;

pub use engine::RideEngine;
pub use types::{RideError, RideProfile};
