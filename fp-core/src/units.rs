//! Type-safe wrappers for route quantities
//!
//! Newtypes around f64 so that distances, angles and progress fractions
//! cannot be mixed up when they flow through the playback engine.
//!
//! Serialization rounds values to keep the event stream compact.

use serde::{Deserialize, Serialize};

fn round_to<S: serde::Serializer>(val: f64, scale: f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((val * scale).round() / scale)
}

fn round2<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    round_to(*val, 100.0, s)
}

fn round4<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    round_to(*val, 10_000.0, s)
}

fn round6<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    round_to(*val, 1_000_000.0, s)
}

/// Meters along the ground
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Meters(#[serde(serialize_with = "round2")] pub f64);

/// Compass angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Degrees(#[serde(serialize_with = "round4")] pub f64);

impl Degrees {
    /// Map any angle into [0, 360)
    pub fn normalized(value: f64) -> Self {
        let d = value.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360.0 for tiny negative inputs
        Self(if d >= 360.0 { 0.0 } else { d })
    }
}

/// Fraction of a trip completed (0.0 to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Progress(#[serde(serialize_with = "round6")] pub f64);

impl Progress {
    /// Create a new progress value, clamping to [0.0, 1.0]
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn is_complete(&self) -> bool {
        self.0 >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_clamp() {
        assert_eq!(Progress::new(1.5).0, 1.0);
        assert_eq!(Progress::new(-0.5).0, 0.0);
        assert_eq!(Progress::new(0.5).0, 0.5);
        assert_eq!(Progress::new(f64::NAN).0, 0.0);
    }

    #[test]
    fn test_progress_complete_only_at_one() {
        assert!(!Progress::new(0.999_999).is_complete());
        assert!(Progress::new(1.0).is_complete());
    }

    #[test]
    fn test_degrees_normalized() {
        assert_eq!(Degrees::normalized(0.0).0, 0.0);
        assert_eq!(Degrees::normalized(360.0).0, 0.0);
        assert_eq!(Degrees::normalized(-90.0).0, 270.0);
        assert_eq!(Degrees::normalized(450.0).0, 90.0);
        assert!(Degrees::normalized(-1e-15).0 < 360.0);
    }

    #[test]
    fn test_meters_serialize_rounded() {
        let json = serde_json::to_string(&Meters(1234.5678)).unwrap();
        assert_eq!(json, "1234.57");
    }
}
