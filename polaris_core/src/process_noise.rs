// polaris_core/src/process_noise.rs

use crate::config::ConfigStore;
use nalgebra::{Matrix3, Vector3};
use std::sync::Arc;

/// The contract for anything that adds process noise for auxiliary states.
/// The estimator core queries it once per propagation step.
pub trait AuxiliaryProcessNoise: Send + Sync {
    /// Process-noise block for the mount-offset state over a step of `dt` seconds.
    fn process_noise_contribution(&self, dt: f64) -> Matrix3<f64>;
}

/// `diag((dt * sigma)^2)` for each of the three mount-offset axes.
pub fn mount_offset_process_noise(dt: f64, sigma: f64) -> Matrix3<f64> {
    let s = dt * sigma;
    Matrix3::from_diagonal(&Vector3::repeat(s * s))
}

/// Mount-offset process noise driven by the live `noise_p_ip` setting.
/// Cheap to clone; every clone reads the same snapshot store.
#[derive(Debug, Clone)]
pub struct MountOffsetProcessNoise {
    config: Arc<ConfigStore>,
}

impl MountOffsetProcessNoise {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self { config }
    }

    pub fn compute_auxiliary_process_noise(&self, dt: f64) -> Matrix3<f64> {
        mount_offset_process_noise(dt, self.config.snapshot().noise_p_ip)
    }
}

impl AuxiliaryProcessNoise for MountOffsetProcessNoise {
    fn process_noise_contribution(&self, dt: f64) -> Matrix3<f64> {
        self.compute_auxiliary_process_noise(dt)
    }
}
