// polaris_core/src/handlers/angle.rs

use super::{HandlerState, SensorHandler};
use crate::messages::{MeasurementData, MeasurementMessage};
use crate::types::AngleReading;
use nalgebra::Matrix2;
use tracing::{debug, warn};

/// Holds the latest bearing pair `[theta, phi]` of the spherical sensor.
#[derive(Debug)]
pub struct AngleSensorHandler {
    name: String,
    state: HandlerState<2>,
}

impl AngleSensorHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: HandlerState::default(),
        }
    }

    pub fn noise_std(&self) -> f64 {
        self.state.noise_std()
    }

    pub fn delay(&self) -> f64 {
        self.state.delay()
    }

    pub fn noise_covariance(&self) -> Matrix2<f64> {
        self.state.noise_covariance()
    }

    pub fn latest_timestamp(&self) -> Option<f64> {
        self.state.latest_timestamp()
    }

    pub fn reset(&self) {
        self.state.reset();
    }
}

impl Default for AngleSensorHandler {
    fn default() -> Self {
        Self::new("spherical_position_sensor/angles")
    }
}

impl SensorHandler for AngleSensorHandler {
    type Reading = AngleReading;

    fn name(&self) -> &str {
        &self.name
    }

    fn get_measurement(&self) -> AngleReading {
        self.state.latest()
    }

    fn set_noises(&self, std: f64) {
        self.state.set_noise_std(std);
    }

    fn set_delay(&self, seconds: f64) {
        self.state.set_delay(seconds);
    }

    fn handle_message(&self, message: &MeasurementMessage) -> bool {
        let angles = match &message.data {
            MeasurementData::Angles(angles) => angles,
            other => {
                debug!("{}: ignoring {} message", self.name, other.kind());
                return false;
            }
        };

        if !angles.iter().all(|a| a.is_finite()) {
            warn!(
                "{}: dropping non-finite angles [{}, {}] at t={}",
                self.name, angles[0], angles[1], message.timestamp
            );
            return false;
        }

        self.state.store(*angles, message.timestamp);
        true
    }
}
