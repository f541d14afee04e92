// polaris_core/src/seed.rs

use crate::frames::layout::spherical_ins_state_layout;
use crate::frames::{FrameAwareState, FrameId, StateVariable};
use crate::types::{gravity_reading, FrameHandle};
use nalgebra::{DMatrix, UnitQuaternion, Vector3};

/// The full state used to (re-)bootstrap the estimator core.
///
/// Built once per initialization event and moved into the core; nothing
/// keeps a handle to it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialStateSeed {
    /// Body position in the world frame.
    pub position: Vector3<f64>,
    /// Body velocity in the world frame.
    pub velocity: Vector3<f64>,
    /// Body-to-world orientation.
    pub orientation: UnitQuaternion<f64>,
    pub gyro_bias: Vector3<f64>,
    pub accel_bias: Vector3<f64>,
    /// Sensor origin expressed in the body frame (`p_ip`).
    pub mount_offset: Vector3<f64>,
    /// Initial accelerometer reading `a_m`.
    pub accel_reading: Vector3<f64>,
    /// Initial gyroscope reading `w_m`.
    pub gyro_reading: Vector3<f64>,
    pub timestamp: f64,
    /// The seed carries initial IMU readings the core should adopt.
    pub sets_sensor_readings: bool,
    /// Initial error covariance. `None` lets the core apply its own default.
    pub error_covariance: Option<DMatrix<f64>>,
}

impl InitialStateSeed {
    /// A seed for a body at rest: zero velocity and biases, gravity on the
    /// accelerometer, nothing on the gyroscope.
    pub fn at_rest(
        position: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
        mount_offset: Vector3<f64>,
        timestamp: f64,
    ) -> Self {
        Self {
            position,
            velocity: Vector3::zeros(),
            orientation,
            gyro_bias: Vector3::zeros(),
            accel_bias: Vector3::zeros(),
            mount_offset,
            accel_reading: gravity_reading(),
            gyro_reading: Vector3::zeros(),
            timestamp,
            sets_sensor_readings: true,
            error_covariance: None,
        }
    }

    pub fn is_finite(&self) -> bool {
        let vectors = [
            &self.position,
            &self.velocity,
            &self.gyro_bias,
            &self.accel_bias,
            &self.mount_offset,
            &self.accel_reading,
            &self.gyro_reading,
        ];
        vectors.iter().all(|v| v.iter().all(|x| x.is_finite()))
            && self.orientation.coords.iter().all(|x| x.is_finite())
            && self.timestamp.is_finite()
    }

    /// Lays the seed out as a `FrameAwareState` using the spherical INS layout.
    /// Without an explicit covariance, `default_covariance_val * I` is used.
    pub fn to_frame_aware_state(
        &self,
        agent_handle: FrameHandle,
        sensor_handle: FrameHandle,
        default_covariance_val: f64,
    ) -> FrameAwareState {
        let layout = spherical_ins_state_layout(agent_handle, sensor_handle);
        let mut state = FrameAwareState::new(layout, default_covariance_val, self.timestamp);

        let body = FrameId::Body(agent_handle);
        state.set_vector3(&StateVariable::Px(FrameId::World), &self.position);
        state.set_vector3(&StateVariable::Vx(FrameId::World), &self.velocity);
        state.set_orientation(&self.orientation);
        state.set_vector3(&StateVariable::Wx(body.clone()), &self.gyro_bias);
        state.set_vector3(&StateVariable::Ax(body), &self.accel_bias);
        state.set_vector3(
            &StateVariable::Px(FrameId::Sensor(sensor_handle)),
            &self.mount_offset,
        );

        if let Some(p) = &self.error_covariance {
            if p.nrows() == state.dim() && p.ncols() == state.dim() {
                state.covariance = p.clone();
            }
        }
        state
    }
}
