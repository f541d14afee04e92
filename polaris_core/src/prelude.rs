// polaris_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::EstimatorCore;
pub use crate::handlers::SensorHandler;
pub use crate::params::ParameterStore;
pub use crate::process_noise::AuxiliaryProcessNoise;
pub use crate::types::{Clock, FrameHandle};

// --- Core Data Structures ---
pub use crate::config::{ChangedFields, SphericalSensorConfig};
pub use crate::error::CoreError;
pub use crate::frames::{FrameAwareState, FrameId, StateVariable};
pub use crate::lifecycle::FilterLifecycle;
pub use crate::messages::{MeasurementData, MeasurementMessage};
pub use crate::seed::InitialStateSeed;

// --- The manager and its parts ---
pub use crate::handlers::{AngleSensorHandler, DistanceSensorHandler};
pub use crate::manager::{InitAck, ReconfigureOutcome, SensorManager};
pub use crate::params::StaticParameters;
pub use crate::process_noise::MountOffsetProcessNoise;
