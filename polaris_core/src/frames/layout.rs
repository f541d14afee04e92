// polaris_core/src/frames/layout.rs
use crate::frames::{FrameId, StateVariable};
use crate::types::FrameHandle;

/// The dimension of the spherical-position INS state vector.
pub const SPHERICAL_INS_STATE_DIM: usize = 19;

// Offsets of each block inside the layout below.
pub const POSITION_IDX: usize = 0;
pub const VELOCITY_IDX: usize = 3;
pub const ORIENTATION_IDX: usize = 6;
pub const GYRO_BIAS_IDX: usize = 10;
pub const ACCEL_BIAS_IDX: usize = 13;
pub const MOUNT_OFFSET_IDX: usize = 16;

/// Returns the state layout seeded by the spherical position initializer.
///
/// The state is composed of:
/// - Position (3) in World Frame
/// - Velocity (3) in World Frame
/// - Orientation (4, Quaternion) from Body to World
/// - Gyroscope Bias (3) in Body Frame
/// - Accelerometer Bias (3) in Body Frame
/// - Sensor mount offset `p_ip` (3), the sensor origin expressed in the Body Frame
///
/// # Arguments
/// * `agent_handle`: The handle of the body whose state is being defined.
/// * `sensor_handle`: The handle of the spherical position sensor.
pub fn spherical_ins_state_layout(
    agent_handle: FrameHandle,
    sensor_handle: FrameHandle,
) -> Vec<StateVariable> {
    let body_frame = FrameId::Body(agent_handle);
    let sensor_frame = FrameId::Sensor(sensor_handle);
    let world_frame = FrameId::World;

    vec![
        // --- Position (World Frame) --- indices 0-2
        StateVariable::Px(world_frame.clone()),
        StateVariable::Py(world_frame.clone()),
        StateVariable::Pz(world_frame.clone()),
        // --- Velocity (World Frame) --- indices 3-5
        StateVariable::Vx(world_frame.clone()),
        StateVariable::Vy(world_frame.clone()),
        StateVariable::Vz(world_frame.clone()),
        // --- Orientation (Quaternion, Body to World) --- indices 6-9
        // Stored as [x, y, z, w]; nalgebra's constructor takes (w, i, j, k).
        StateVariable::Qx(body_frame.clone(), world_frame.clone()),
        StateVariable::Qy(body_frame.clone(), world_frame.clone()),
        StateVariable::Qz(body_frame.clone(), world_frame.clone()),
        StateVariable::Qw(body_frame.clone(), world_frame),
        // --- Gyroscope Bias (Body Frame) --- indices 10-12
        StateVariable::Wx(body_frame.clone()),
        StateVariable::Wy(body_frame.clone()),
        StateVariable::Wz(body_frame.clone()),
        // --- Accelerometer Bias (Body Frame) --- indices 13-15
        StateVariable::Ax(body_frame.clone()),
        StateVariable::Ay(body_frame.clone()),
        StateVariable::Az(body_frame),
        // --- Mount offset (sensor origin in Body Frame) --- indices 16-18
        StateVariable::Px(sensor_frame.clone()),
        StateVariable::Py(sensor_frame.clone()),
        StateVariable::Pz(sensor_frame),
    ]
}
