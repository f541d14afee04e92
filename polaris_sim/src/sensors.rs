// polaris_sim/src/sensors.rs

//! Simulated angle and range streams of a spherical position sensor.

use nalgebra::{Vector2, Vector3};
use polaris_core::messages::{MeasurementData, MeasurementMessage};
use polaris_core::types::FrameHandle;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::ScenarioError;
use crate::scenario::SensorChannelConfig;

/// Ideal `[theta, phi]` and range of a point in the sensor frame.
/// The origin maps to zero angles and zero range.
pub fn cartesian_to_spherical(position: &Vector3<f64>) -> (Vector2<f64>, f64) {
    let r = position.norm();
    if r == 0.0 {
        return (Vector2::zeros(), 0.0);
    }
    let theta = (position.z / r).clamp(-1.0, 1.0).acos();
    let phi = position.y.atan2(position.x);
    (Vector2::new(theta, phi), r)
}

/// One periodic, noisy reading stream.
#[derive(Debug, Clone)]
struct Channel {
    period: f64,
    next_due: f64,
    noise_dist: Normal<f64>,
}

impl Channel {
    fn new(name: &str, config: &SensorChannelConfig) -> Result<Self, ScenarioError> {
        let noise_dist =
            Normal::new(0.0, config.noise_stddev).map_err(|_| ScenarioError::InvalidNoise {
                sensor: name.to_string(),
                std: config.noise_stddev,
            })?;
        Ok(Self {
            period: 1.0 / config.rate,
            next_due: config.start_after,
            noise_dist,
        })
    }

    fn tick(&mut self, t: f64) -> bool {
        // Small slack so accumulated float steps don't skip a sample.
        if t + 1e-9 < self.next_due {
            return false;
        }
        self.next_due += self.period;
        if self.next_due <= t {
            self.next_due = t + self.period;
        }
        true
    }
}

/// Produces `MeasurementMessage`s for both streams of one spherical sensor.
#[derive(Debug, Clone)]
pub struct SphericalSensorSim {
    pub sensor_handle: FrameHandle,
    angles: Channel,
    distance: Channel,
}

impl SphericalSensorSim {
    pub fn new(
        sensor_handle: FrameHandle,
        angle_config: &SensorChannelConfig,
        distance_config: &SensorChannelConfig,
    ) -> Result<Self, ScenarioError> {
        Ok(Self {
            sensor_handle,
            angles: Channel::new("angle_sensor", angle_config)?,
            distance: Channel::new("distance_sensor", distance_config)?,
        })
    }

    /// Samples whichever streams are due at time `t`.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        t: f64,
        true_position: &Vector3<f64>,
        rng: &mut R,
    ) -> Vec<MeasurementMessage> {
        let (angles, range) = cartesian_to_spherical(true_position);
        let mut messages = Vec::with_capacity(2);

        if self.angles.tick(t) {
            let noisy = Vector2::new(
                angles[0] + self.angles.noise_dist.sample(rng),
                angles[1] + self.angles.noise_dist.sample(rng),
            );
            messages.push(MeasurementMessage {
                sensor_handle: self.sensor_handle,
                timestamp: t,
                data: MeasurementData::Angles(noisy),
            });
        }

        if self.distance.tick(t) {
            let noisy = (range + self.distance.noise_dist.sample(rng)).max(0.0);
            messages.push(MeasurementMessage {
                sensor_handle: self.sensor_handle,
                timestamp: t,
                data: MeasurementData::Distance(noisy),
            });
        }

        messages
    }
}
