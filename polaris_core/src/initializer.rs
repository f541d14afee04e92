// polaris_core/src/initializer.rs

//! Turns the latest spherical readings into a full initial state seed.

use crate::config::SphericalSensorConfig;
use crate::handlers::{AngleSensorHandler, DistanceSensorHandler, SensorHandler};
use crate::params::{read_mount_offset, ParameterStore};
use crate::seed::InitialStateSeed;
use crate::types::{AngleReading, Clock};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use tracing::{debug, info, warn};

/// Scale used by the parameterless initialization path.
pub const DEFAULT_INIT_SCALE: f64 = 1.0;
/// Scales below this are treated as degenerate.
pub const MIN_INIT_SCALE: f64 = 0.001;

/// Converts `[theta, phi]` and a range into sensor-frame Cartesian coordinates.
/// `theta` is measured from the z-axis, `phi` from the x-axis in the xy-plane.
pub fn spherical_to_cartesian(angles: &AngleReading, range: f64) -> Vector3<f64> {
    let (theta, phi) = (angles[0], angles[1]);
    Vector3::new(
        range * theta.sin() * phi.cos(),
        range * theta.sin() * phi.sin(),
        range * theta.cos(),
    )
}

/// A pure rotation of `yaw_degrees` about the world z-axis.
pub fn yaw_prior(yaw_degrees: f64) -> UnitQuaternion<f64> {
    let half = yaw_degrees.to_radians() / 2.0;
    UnitQuaternion::from_quaternion(Quaternion::new(half.cos(), 0.0, 0.0, half.sin()))
}

/// Clamps a degenerate initialization scale to 1.0.
pub fn sanitize_scale(scale: f64) -> f64 {
    // NaN fails the comparison below, so test for it explicitly.
    if scale < MIN_INIT_SCALE || scale.is_nan() {
        warn!("init scale is {}, correcting to {}", scale, DEFAULT_INIT_SCALE);
        DEFAULT_INIT_SCALE
    } else {
        scale
    }
}

/// Body position from the sensor-frame position, the orientation prior and
/// the mount offset: `p = p_vc - R(q) * p_ip`.
pub fn body_position(
    sensor_position: &Vector3<f64>,
    orientation: &UnitQuaternion<f64>,
    mount_offset: &Vector3<f64>,
) -> Vector3<f64> {
    sensor_position - orientation.to_rotation_matrix() * mount_offset
}

/// Reads both handlers and builds the seed.
///
/// The angle and range are two independent snapshots, each the most recent
/// value its handler received. They are not sampled jointly.
pub struct SphericalPositionInitializer<'a> {
    pub angles: &'a AngleSensorHandler,
    pub distance: &'a DistanceSensorHandler,
    pub parameters: &'a dyn ParameterStore,
    pub clock: &'a dyn Clock,
}

impl SphericalPositionInitializer<'_> {
    /// Builds a seed from the current readings and configuration.
    ///
    /// A seed is always produced. Missing readings yield a zero sensor
    /// position and a warning.
    pub fn build_seed(&self, config: &SphericalSensorConfig, scale: f64) -> InitialStateSeed {
        let scale = sanitize_scale(scale);

        // --- 1. Orientation prior (yaw only) ---
        let q = yaw_prior(config.yaw_init_degrees);

        // --- 2. Latest readings ---
        let angles = self.angles.get_measurement();
        let range = self.distance.get_measurement()[0];
        if let (Some(t_angles), Some(t_range)) = (
            self.angles.latest_timestamp(),
            self.distance.latest_timestamp(),
        ) {
            debug!(
                "initializing from {} and {} readings {:.3}s apart",
                self.angles.name(),
                self.distance.name(),
                (t_angles - t_range).abs()
            );
        }

        // --- 3. Spherical to Cartesian ---
        let p_vc = spherical_to_cartesian(&angles, range);
        info!(
            "initial measurement pos: [{:.3}, {:.3}, {:.3}] yaw: {:.1} deg scale: {}",
            p_vc.x, p_vc.y, p_vc.z, config.yaw_init_degrees, scale
        );

        // --- 4. Degraded input ---
        if p_vc.norm() == 0.0 {
            warn!("No measurements received yet to initialize position - using [0 0 0]");
        }

        // --- 5. Mount offset ---
        let p_ip = read_mount_offset(self.parameters);

        // --- 6-7. Body position and the seed itself ---
        let p = body_position(&p_vc, &q, &p_ip);
        InitialStateSeed::at_rest(p, q, p_ip, self.clock.now())
    }
}
