// polaris_core/src/handlers/mod.rs

//! Measurement handlers hold the most recent accepted reading of one sensor
//! stream together with its runtime-tunable noise and delay.

use crate::messages::MeasurementMessage;
use nalgebra::{SMatrix, SVector};
use std::fmt::Debug;
use std::sync::{PoisonError, RwLock};

mod angle;
mod distance;

pub use angle::AngleSensorHandler;
pub use distance::DistanceSensorHandler;

/// Noise std a handler starts with before the first reconfiguration.
pub const DEFAULT_NOISE_STD: f64 = 0.01;

// --- SENSOR HANDLER TRAIT ---
/// The narrow interface the sensor manager and the initializer use.
/// Every method takes `&self`; implementations synchronize internally so
/// producers, the reconfiguration path and the initializer can share one
/// handler behind an `Arc`.
pub trait SensorHandler: Debug + Send + Sync {
    /// The fixed-size reading this handler stores.
    type Reading;

    /// Name used in log output.
    fn name(&self) -> &str;

    /// Returns the latest accepted reading, or zeros if nothing arrived yet.
    fn get_measurement(&self) -> Self::Reading;

    /// Overwrites the measurement noise standard deviation.
    fn set_noises(&self, std: f64);

    /// Overwrites the assumed sensor latency in seconds.
    fn set_delay(&self, seconds: f64);

    /// Producer entry point. Returns true if the message was accepted.
    fn handle_message(&self, message: &MeasurementMessage) -> bool;
}

// =========================================================================
// == Shared handler storage ==
// =========================================================================

#[derive(Debug, Clone, Copy)]
struct Slot<const D: usize> {
    latest: SVector<f64, D>,
    timestamp: Option<f64>,
    noise_std: f64,
    delay: f64,
}

/// Storage shared by both handler variants. Reading, timestamp and tuning sit
/// behind one lock and every write replaces whole fields, so a reader never
/// sees a half-written vector.
#[derive(Debug)]
pub struct HandlerState<const D: usize> {
    slot: RwLock<Slot<D>>,
}

impl<const D: usize> Default for HandlerState<D> {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_STD, 0.0)
    }
}

impl<const D: usize> HandlerState<D> {
    pub fn new(noise_std: f64, delay: f64) -> Self {
        Self {
            slot: RwLock::new(Slot {
                latest: SVector::zeros(),
                timestamp: None,
                noise_std,
                delay,
            }),
        }
    }

    // Writers store whole values, so a poisoned lock still holds a valid slot.
    fn read(&self) -> Slot<D> {
        *self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write<F: FnOnce(&mut Slot<D>)>(&self, f: F) {
        let mut guard = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard);
    }

    pub fn latest(&self) -> SVector<f64, D> {
        self.read().latest
    }

    pub fn latest_timestamp(&self) -> Option<f64> {
        self.read().timestamp
    }

    pub fn store(&self, value: SVector<f64, D>, timestamp: f64) {
        self.write(|slot| {
            slot.latest = value;
            slot.timestamp = Some(timestamp);
        });
    }

    pub fn noise_std(&self) -> f64 {
        self.read().noise_std
    }

    pub fn set_noise_std(&self, std: f64) {
        self.write(|slot| slot.noise_std = std);
    }

    pub fn delay(&self) -> f64 {
        self.read().delay
    }

    pub fn set_delay(&self, seconds: f64) {
        self.write(|slot| slot.delay = seconds);
    }

    /// The measurement noise covariance `R = std^2 * I`.
    pub fn noise_covariance(&self) -> SMatrix<f64, D, D> {
        let std = self.noise_std();
        SMatrix::<f64, D, D>::identity() * (std * std)
    }

    /// Back to the "no data yet" sentinel. Tuning is kept.
    pub fn reset(&self) {
        self.write(|slot| {
            slot.latest = SVector::zeros();
            slot.timestamp = None;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_with_the_zero_sentinel() {
        let state = HandlerState::<2>::default();
        assert_eq!(state.latest(), Vector2::zeros());
        assert_eq!(state.latest_timestamp(), None);
        assert_eq!(state.noise_std(), DEFAULT_NOISE_STD);
        assert_eq!(state.delay(), 0.0);
    }

    #[test]
    fn store_and_reset() {
        let state = HandlerState::<2>::default();
        state.store(Vector2::new(0.1, 0.2), 4.0);
        assert_eq!(state.latest(), Vector2::new(0.1, 0.2));
        assert_eq!(state.latest_timestamp(), Some(4.0));

        state.set_noise_std(0.3);
        state.reset();
        assert_eq!(state.latest(), Vector2::zeros());
        assert_eq!(state.latest_timestamp(), None);
        assert_eq!(state.noise_std(), 0.3);
    }

    #[test]
    fn noise_covariance_is_diagonal_variance() {
        let state = HandlerState::<2>::new(0.5, 0.0);
        let r = state.noise_covariance();
        assert_eq!(r[(0, 0)], 0.25);
        assert_eq!(r[(1, 1)], 0.25);
        assert_eq!(r[(0, 1)], 0.0);
    }

    #[test]
    fn concurrent_readers_never_see_a_mixed_vector() {
        // The writer only ever stores (k, k); a torn read would show two different values.
        let state = Arc::new(HandlerState::<2>::default());
        let writer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for k in 0..5_000 {
                    let v = k as f64;
                    state.store(Vector2::new(v, v), v);
                }
            })
        };
        let reader = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for _ in 0..5_000 {
                    let v = state.latest();
                    assert_eq!(v[0], v[1]);
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
    }
}
