// polaris_core/src/config.rs

//! The reconfigurable parameter set of the spherical position sensor and the
//! snapshot store the sensor manager publishes it through.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::{Arc, PoisonError, RwLock};

// =========================================================================
// == Parameter Set ==
// =========================================================================

/// One complete reconfiguration of the sensor. Field names match the keys of
/// the reconfiguration transport and of the scenario TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SphericalSensorConfig {
    /// Angle measurement noise std (rad).
    pub angle_noise_meas: f64,
    /// Angle measurement latency (s).
    pub angle_delay: f64,
    /// Distance measurement noise std (m).
    pub distance_noise_meas: f64,
    /// Distance measurement latency (s).
    pub distance_delay: f64,
    /// Initial yaw of the body in the sensor's world frame, in degrees.
    pub yaw_init_degrees: f64,
    /// Process noise std of the mount offset state.
    pub noise_p_ip: f64,
    /// One-shot request to re-initialize the filter.
    pub init_filter_requested: bool,
}

impl Default for SphericalSensorConfig {
    fn default() -> Self {
        Self {
            angle_noise_meas: 0.01,
            angle_delay: 0.0,
            distance_noise_meas: 0.01,
            distance_delay: 0.0,
            yaw_init_degrees: 0.0,
            noise_p_ip: 0.0,
            init_filter_requested: false,
        }
    }
}

// =========================================================================
// == Changed-field mask ==
// =========================================================================

/// Bitmask telling the sensor manager which fields an update touched.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChangedFields(u32);

impl ChangedFields {
    pub const NONE: Self = Self(0);
    pub const ANGLE_NOISE: Self = Self(1 << 0);
    pub const ANGLE_DELAY: Self = Self(1 << 1);
    pub const DISTANCE_NOISE: Self = Self(1 << 2);
    pub const DISTANCE_DELAY: Self = Self(1 << 3);
    pub const YAW_INIT: Self = Self(1 << 4);
    pub const NOISE_P_IP: Self = Self(1 << 5);
    pub const INIT_FILTER: Self = Self(1 << 6);
    pub const ALL: Self = Self((1 << 7) - 1);

    /// Unknown bits are dropped.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The mask of fields that differ between two snapshots.
    pub fn between(old: &SphericalSensorConfig, new: &SphericalSensorConfig) -> Self {
        let mut changed = Self::NONE;
        let mut mark = |differs: bool, flag: Self| {
            if differs {
                changed |= flag;
            }
        };
        mark(old.angle_noise_meas != new.angle_noise_meas, Self::ANGLE_NOISE);
        mark(old.angle_delay != new.angle_delay, Self::ANGLE_DELAY);
        mark(
            old.distance_noise_meas != new.distance_noise_meas,
            Self::DISTANCE_NOISE,
        );
        mark(old.distance_delay != new.distance_delay, Self::DISTANCE_DELAY);
        mark(old.yaw_init_degrees != new.yaw_init_degrees, Self::YAW_INIT);
        mark(old.noise_p_ip != new.noise_p_ip, Self::NOISE_P_IP);
        mark(
            old.init_filter_requested != new.init_filter_requested,
            Self::INIT_FILTER,
        );
        changed
    }
}

impl BitOr for ChangedFields {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChangedFields {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ChangedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ChangedFields, &str); 7] = [
            (ChangedFields::ANGLE_NOISE, "ANGLE_NOISE"),
            (ChangedFields::ANGLE_DELAY, "ANGLE_DELAY"),
            (ChangedFields::DISTANCE_NOISE, "DISTANCE_NOISE"),
            (ChangedFields::DISTANCE_DELAY, "DISTANCE_DELAY"),
            (ChangedFields::YAW_INIT, "YAW_INIT"),
            (ChangedFields::NOISE_P_IP, "NOISE_P_IP"),
            (ChangedFields::INIT_FILTER, "INIT_FILTER"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "ChangedFields({})", set.join(" | "))
    }
}

// =========================================================================
// == Snapshot store ==
// =========================================================================

/// Holds the current configuration as an immutable, shared snapshot.
/// Publishing swaps the whole `Arc`; readers keep whatever snapshot they
/// cloned, so they can never observe half of an update.
#[derive(Debug)]
pub struct ConfigStore {
    current: RwLock<Arc<SphericalSensorConfig>>,
}

impl ConfigStore {
    pub fn new(initial: SphericalSensorConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// The snapshot that was current at the time of the call.
    pub fn snapshot(&self) -> Arc<SphericalSensorConfig> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Replaces the current snapshot and returns the previous one.
    pub fn publish(&self, config: SphericalSensorConfig) -> Arc<SphericalSensorConfig> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(config))
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(SphericalSensorConfig::default())
    }
}
