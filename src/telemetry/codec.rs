//! Wire codec for the helmet telemetry frame.
//!
//! The helmet display accepts exactly one payload shape: 16 octets,
//! little-endian, four IEEE-754 single-precision fields in fixed order.
//! Encoding is total: any finite or non-finite float passes through
//! bit-for-bit; range validation is the caller's concern. The helmet is
//! the only consumer of encoded frames; decode exists to mirror the field
//! order for round-trip verification.

/// Size of an encoded telemetry frame in bytes.
pub const FRAME_LEN: usize = 16;

/// Byte offset of the speed field.
pub const SPEED_OFFSET: usize = 0;

/// Byte offset of the left lean angle field.
pub const LEAN_LEFT_OFFSET: usize = 4;

/// Byte offset of the right lean angle field.
pub const LEAN_RIGHT_OFFSET: usize = 8;

/// Byte offset of the battery field.
pub const BATTERY_OFFSET: usize = 12;

/// One telemetry payload for the helmet display.
///
/// There is no checksum and no sequence number; delivery order is
/// best-effort and left to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetryFrame {
    /// Current speed in km/h
    pub speed_kmh: f32,
    /// Lean angle to the left in degrees (0 when leaning right)
    pub lean_left_deg: f32,
    /// Lean angle to the right in degrees (0 when leaning left)
    pub lean_right_deg: f32,
    /// Phone battery level in percent (0-100)
    pub battery_percent: f32,
}

impl TelemetryFrame {
    /// Build a frame from the four scalar readings.
    pub fn new(speed_kmh: f32, lean_left_deg: f32, lean_right_deg: f32, battery_percent: f32) -> Self {
        Self {
            speed_kmh,
            lean_left_deg,
            lean_right_deg,
            battery_percent,
        }
    }

    /// Encode into the 16-byte little-endian wire format.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[SPEED_OFFSET..SPEED_OFFSET + 4].copy_from_slice(&self.speed_kmh.to_le_bytes());
        frame[LEAN_LEFT_OFFSET..LEAN_LEFT_OFFSET + 4]
            .copy_from_slice(&self.lean_left_deg.to_le_bytes());
        frame[LEAN_RIGHT_OFFSET..LEAN_RIGHT_OFFSET + 4]
            .copy_from_slice(&self.lean_right_deg.to_le_bytes());
        frame[BATTERY_OFFSET..BATTERY_OFFSET + 4]
            .copy_from_slice(&self.battery_percent.to_le_bytes());
        frame
    }

    /// Decode a 16-byte frame back into its four fields.
    pub fn decode(frame: &[u8; FRAME_LEN]) -> Self {
        let field = |offset: usize| {
            f32::from_le_bytes([
                frame[offset],
                frame[offset + 1],
                frame[offset + 2],
                frame[offset + 3],
            ])
        };

        Self {
            speed_kmh: field(SPEED_OFFSET),
            lean_left_deg: field(LEAN_LEFT_OFFSET),
            lean_right_deg: field(LEAN_RIGHT_OFFSET),
            battery_percent: field(BATTERY_OFFSET),
        }
    }
}
