// polaris_core/src/handlers/distance.rs

use super::{HandlerState, SensorHandler};
use crate::messages::{MeasurementData, MeasurementMessage};
use crate::types::RangeReading;
use nalgebra::Matrix1;
use tracing::{debug, warn};

/// Holds the latest range reading `[r]` of the spherical sensor.
#[derive(Debug)]
pub struct DistanceSensorHandler {
    name: String,
    state: HandlerState<1>,
}

impl DistanceSensorHandler {
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

    pub fn noise_covariance(&self) -> Matrix1<f64> {
        self.state.noise_covariance()
    }

    pub fn latest_timestamp(&self) -> Option<f64> {
        self.state.latest_timestamp()
    }

    pub fn reset(&self) {
        self.state.reset();
    }
}

impl Default for DistanceSensorHandler {
    fn default() -> Self {
        Self::new("spherical_position_sensor/distance")
    }
}

impl SensorHandler for DistanceSensorHandler {
    type Reading = RangeReading;

    fn name(&self) -> &str {
        &self.name
    }

    fn get_measurement(&self) -> RangeReading {
        self.state.latest()
    }

    fn set_noises(&self, std: f64) {
        self.state.set_noise_std(std);
    }

    fn set_delay(&self, seconds: f64) {
        self.state.set_delay(seconds);
    }

    fn handle_message(&self, message: &MeasurementMessage) -> bool {
        let range = match &message.data {
            MeasurementData::Distance(range) => *range,
            other => {
                debug!("{}: ignoring {} message", self.name, other.kind());
                return false;
            }
        };

        // A range is a length; negative or non-finite values are sensor garbage.
        if !range.is_finite() || range < 0.0 {
            warn!(
                "{}: dropping invalid range {} at t={}",
                self.name, range, message.timestamp
            );
            return false;
        }

        self.state.store(RangeReading::new(range), message.timestamp);
        true
    }
}
