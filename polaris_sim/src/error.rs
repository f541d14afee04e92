// polaris_sim/src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to load scenario: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("simulation step must be positive, got {0}")]
    InvalidStep(f64),

    #[error("simulation duration must be non-negative, got {0}")]
    InvalidDuration(f64),

    #[error("scenario needs {steps} steps, more than the limit of {max}")]
    TooManySteps { steps: f64, max: usize },

    #[error("{sensor}: rate must be positive, got {rate}")]
    InvalidRate { sensor: String, rate: f64 },

    #[error("{sensor}: invalid noise std {std}")]
    InvalidNoise { sensor: String, std: f64 },
}
