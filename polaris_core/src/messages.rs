// polaris_core/src/messages.rs

use crate::types::FrameHandle;
use nalgebra::Vector2;

// =========================================================================
// == Core Message and Data Enums ==
// =========================================================================

/// A self-describing container for the readings this filter consumes.
#[derive(Clone, Debug, PartialEq)]
pub enum MeasurementData {
    /// Bearing pair `[theta, phi]` in radians.
    Angles(Vector2<f64>),
    /// Range in meters.
    Distance(f64),
}

impl MeasurementData {
    pub fn kind(&self) -> &'static str {
        match self {
            MeasurementData::Angles(_) => "angles",
            MeasurementData::Distance(_) => "distance",
        }
    }
}

/// The generic message that carries sensor data from acquisition into the handlers.
#[derive(Clone, Debug)]
pub struct MeasurementMessage {
    pub sensor_handle: FrameHandle,
    pub timestamp: f64,
    pub data: MeasurementData,
}
