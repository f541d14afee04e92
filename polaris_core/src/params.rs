// polaris_core/src/params.rs

//! Static parameters read at initialization time (as opposed to the
//! reconfigurable `SphericalSensorConfig`).

use nalgebra::Vector3;
use std::collections::HashMap;
use std::fmt::Debug;

/// Parameter keys of the sensor-to-body mount offset `p_ip`.
pub const MOUNT_OFFSET_KEYS: [&str; 3] = [
    "position_sensor/init/p_ip/x",
    "position_sensor/init/p_ip/y",
    "position_sensor/init/p_ip/z",
];

/// A read-only key/value parameter source.
pub trait ParameterStore: Debug + Send + Sync {
    fn get_f64(&self, key: &str) -> Option<f64>;

    fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        self.get_f64(key).unwrap_or(default)
    }
}

/// Reads the mount offset. Missing components default to zero.
pub fn read_mount_offset(store: &dyn ParameterStore) -> Vector3<f64> {
    Vector3::new(
        store.get_f64_or(MOUNT_OFFSET_KEYS[0], 0.0),
        store.get_f64_or(MOUNT_OFFSET_KEYS[1], 0.0),
        store.get_f64_or(MOUNT_OFFSET_KEYS[2], 0.0),
    )
}

/// An in-memory parameter store.
#[derive(Debug, Clone, Default)]
pub struct StaticParameters(pub HashMap<String, f64>);

impl StaticParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// A store holding only the three mount offset components.
    pub fn with_mount_offset(offset: Vector3<f64>) -> Self {
        MOUNT_OFFSET_KEYS
            .iter()
            .zip(offset.iter())
            .fold(Self::new(), |params, (key, value)| params.with(*key, *value))
    }
}

impl ParameterStore for StaticParameters {
    fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_offset_defaults_to_zero() {
        assert_eq!(read_mount_offset(&StaticParameters::new()), Vector3::zeros());
    }

    #[test]
    fn partial_offset_keeps_the_given_components() {
        let params = StaticParameters::new().with("position_sensor/init/p_ip/y", 0.25);
        assert_eq!(read_mount_offset(&params), Vector3::new(0.0, 0.25, 0.0));
    }

    #[test]
    fn with_mount_offset_round_trips() {
        let offset = Vector3::new(0.1, -0.2, 0.3);
        let params = StaticParameters::with_mount_offset(offset);
        assert_eq!(read_mount_offset(&params), offset);
    }
}
