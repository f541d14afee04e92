// polaris_core/src/types.rs

use nalgebra::{DVector, Vector1, Vector2, Vector3};
use std::time::{SystemTime, UNIX_EPOCH};

// --- Core Type Aliases ---
pub type State = DVector<f64>;

/// Bearing pair `[theta, phi]`: polar angle from the sensor z-axis, then azimuth.
pub type AngleReading = Vector2<f64>;
/// Range `[r]` from the sensor origin, in meters.
pub type RangeReading = Vector1<f64>;

/// Magnitude of gravity used for the initial accelerometer reading.
pub const GRAVITY_MAGNITUDE: f64 = 9.81;

/// The accelerometer reading a body at rest sees in a z-up world frame.
pub fn gravity_reading() -> Vector3<f64> {
    Vector3::new(0.0, 0.0, GRAVITY_MAGNITUDE)
}

// --- Core Identifier ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameHandle(pub u64);

// --- Time Source ---
/// Anything that can tell the current time in seconds.
/// The initializer stamps seeds with it; tests swap in a fixed clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall-clock time, seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// A clock frozen at a given instant. Useful for replay and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock(pub f64);

impl Clock for FixedClock {
    fn now(&self) -> f64 {
        self.0
    }
}
