// polaris_sim/src/reference_core.rs

//! A small stand-in for the estimator core: it accepts seeds and propagates
//! a constant-velocity model so the initialization path can be exercised
//! end to end.

use nalgebra::{DMatrix, Vector3};
use polaris_core::error::CoreError;
use polaris_core::estimation::EstimatorCore;
use polaris_core::frames::layout::{
    MOUNT_OFFSET_IDX, POSITION_IDX, SPHERICAL_INS_STATE_DIM, VELOCITY_IDX,
};
use polaris_core::frames::{FrameAwareState, FrameId, StateVariable};
use polaris_core::process_noise::AuxiliaryProcessNoise;
use polaris_core::seed::InitialStateSeed;
use polaris_core::types::FrameHandle;
use tracing::debug;

/// Covariance used when a seed does not bring its own.
pub const DEFAULT_INITIAL_COVARIANCE: f64 = 1.0;

/// A constant-velocity reference core.
pub struct ReferenceCore {
    agent_handle: FrameHandle,
    sensor_handle: FrameHandle,
    state: Option<FrameAwareState>,
    /// IMU readings handed over with the last seed.
    imu_readings: Option<(Vector3<f64>, Vector3<f64>)>,
    seeds_accepted: usize,
}

impl ReferenceCore {
    pub fn new(agent_handle: FrameHandle, sensor_handle: FrameHandle) -> Self {
        Self {
            agent_handle,
            sensor_handle,
            state: None,
            imu_readings: None,
            seeds_accepted: 0,
        }
    }

    pub fn state(&self) -> Option<&FrameAwareState> {
        self.state.as_ref()
    }

    pub fn seeds_accepted(&self) -> usize {
        self.seeds_accepted
    }

    /// Accelerometer and gyroscope readings from the last seed, if it carried any.
    pub fn imu_readings(&self) -> Option<(Vector3<f64>, Vector3<f64>)> {
        self.imu_readings
    }

    pub fn position(&self) -> Option<Vector3<f64>> {
        self.state
            .as_ref()?
            .get_vector3(&StateVariable::Px(FrameId::World))
    }

    /// Advances the state by `dt`. Returns false if there is nothing to propagate.
    pub fn propagate(&mut self, dt: f64, aux: &dyn AuxiliaryProcessNoise) -> bool {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return false,
        };
        if dt <= 0.0 {
            return false;
        }

        // 1. x_k+1 = F x_k, with p += v * dt.
        let mut f_jac = DMatrix::<f64>::identity(state.dim(), state.dim());
        for i in 0..3 {
            f_jac[(POSITION_IDX + i, VELOCITY_IDX + i)] = dt;
        }
        state.vector = &f_jac * &state.vector;

        // 2. P_k+1 = F P F^T + Q, where only the mount offset block of Q is non-zero.
        let q_pip = aux.process_noise_contribution(dt);
        let mut q = DMatrix::<f64>::zeros(state.dim(), state.dim());
        q.fixed_view_mut::<3, 3>(MOUNT_OFFSET_IDX, MOUNT_OFFSET_IDX)
            .copy_from(&q_pip);
        state.covariance = &f_jac * &state.covariance * f_jac.transpose() + q;

        state.last_update_timestamp += dt;
        true
    }
}

impl EstimatorCore for ReferenceCore {
    fn init(&mut self, seed: InitialStateSeed) -> Result<(), CoreError> {
        if !seed.is_finite() {
            return Err(CoreError::Rejected {
                reason: "seed contains non-finite values".to_string(),
            });
        }
        if let Some(p) = &seed.error_covariance {
            if p.nrows() != SPHERICAL_INS_STATE_DIM || p.ncols() != SPHERICAL_INS_STATE_DIM {
                return Err(CoreError::DimensionMismatch {
                    expected: SPHERICAL_INS_STATE_DIM,
                    found: p.nrows(),
                });
            }
        }

        let state = seed.to_frame_aware_state(
            self.agent_handle,
            self.sensor_handle,
            DEFAULT_INITIAL_COVARIANCE,
        );
        debug!("reference core seeded at t={}", state.last_update_timestamp);

        self.imu_readings = seed
            .sets_sensor_readings
            .then_some((seed.accel_reading, seed.gyro_reading));
        self.state = Some(state);
        self.seeds_accepted += 1;
        Ok(())
    }
}
