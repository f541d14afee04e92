// polaris_core/src/estimation/mod.rs

use crate::error::CoreError;
use crate::seed::InitialStateSeed;

/// The seam to the estimator core that owns propagation, measurement
/// buffering and covariance updates.
///
/// `init` is synchronous: when it returns `Ok` the core runs from the new
/// seed; on `Err` the previous filter state is left alone.
pub trait EstimatorCore: Send {
    fn init(&mut self, seed: InitialStateSeed) -> Result<(), CoreError>;
}

impl<C: EstimatorCore + ?Sized> EstimatorCore for Box<C> {
    fn init(&mut self, seed: InitialStateSeed) -> Result<(), CoreError> {
        (**self).init(seed)
    }
}
