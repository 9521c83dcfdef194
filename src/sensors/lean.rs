//! Lean angle derivation from raw motion samples.
//!
//! The vehicle's sideways tilt arrives as raw accelerometer vectors; the
//! helmet display and the ride statistics both want it as two mutually
//! exclusive magnitudes, left and right. Roll is the rotation around the
//! longitudinal axis, recovered with atan2 over the gravity components.

/// Signed roll angle in degrees from an accelerometer sample.
///
/// Negative roll is a lean to the left, positive to the right. With the
/// device mounted upright, `y` and `z` carry the gravity split.
pub fn roll_from_accel(y: f64, z: f64) -> f64 {
    y.atan2(z).to_degrees()
}

/// Decompose a signed roll angle into (left, right) lean magnitudes.
///
/// Exactly one side is non-zero for a non-zero roll; a zero roll yields
/// (0, 0).
pub fn split_roll(roll_deg: f64) -> (f64, f64) {
    if roll_deg < 0.0 {
        (-roll_deg, 0.0)
    } else {
        (0.0, roll_deg)
    }
}

/// Convert a GPS speed-over-ground fix from m/s to km/h.
pub fn ms_to_kmh(speed_ms: f64) -> f64 {
    speed_ms * 3.6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_level_device_is_zero() {
        // Gravity entirely on z: no roll.
        let roll = roll_from_accel(0.0, 1.0);
        assert!(roll.abs() < 1e-9);
    }

    #[test]
    fn test_roll_sign_follows_y() {
        assert!(roll_from_accel(-0.5, 0.866) < 0.0);
        assert!(roll_from_accel(0.5, 0.866) > 0.0);
    }

    #[test]
    fn test_roll_forty_five_degrees() {
        let roll = roll_from_accel(1.0, 1.0);
        assert!((roll - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_roll_left() {
        let (left, right) = split_roll(-12.5);
        assert_eq!(left, 12.5);
        assert_eq!(right, 0.0);
    }

    #[test]
    fn test_split_roll_right() {
        let (left, right) = split_roll(30.0);
        assert_eq!(left, 0.0);
        assert_eq!(right, 30.0);
    }

    #[test]
    fn test_split_roll_zero() {
        assert_eq!(split_roll(0.0), (0.0, 0.0));
    }

    #[test]
    fn test_ms_to_kmh() {
        assert!((ms_to_kmh(10.0) - 36.0).abs() < 1e-9);
    }
}
