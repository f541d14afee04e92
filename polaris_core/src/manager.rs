// polaris_core/src/manager.rs

//! The sensor manager: owns both measurement handlers, receives
//! reconfiguration events and (re-)initializes the estimator core.

use crate::config::{ChangedFields, ConfigStore, SphericalSensorConfig};
use crate::error::CoreError;
use crate::estimation::EstimatorCore;
use crate::handlers::{AngleSensorHandler, DistanceSensorHandler, SensorHandler};
use crate::initializer::{SphericalPositionInitializer, DEFAULT_INIT_SCALE};
use crate::lifecycle::FilterLifecycle;
use crate::messages::MeasurementMessage;
use crate::params::ParameterStore;
use crate::process_noise::{AuxiliaryProcessNoise, MountOffsetProcessNoise};
use crate::types::{Clock, SystemClock};
use nalgebra::{Matrix3, Vector3};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// What happened to an initialization request carried by a reconfiguration.
#[derive(Debug, Clone, PartialEq)]
pub enum InitAck {
    /// The update did not ask for initialization.
    NotRequested,
    /// A seed was built and the core accepted it.
    Submitted,
    /// A seed was built but the core refused it.
    Rejected(CoreError),
}

/// Acknowledgement of one reconfiguration event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconfigureOutcome {
    /// The configuration as applied. A handled trigger comes back cleared,
    /// so the caller must re-arm it explicitly for the next request.
    pub config: SphericalSensorConfig,
    pub init: InitAck,
}

/// Bridges reconfiguration events, the two spherical handlers and the core.
///
/// Every method takes `&self`. Handlers synchronize themselves, the config is
/// an atomically swapped snapshot, and the core sits behind a mutex, so one
/// manager can be shared between producer and reconfiguration threads.
/// Reconfigurations and initializations are serialized, so the stored
/// snapshot, the handler tuning and any seed always come from the same update.
///
/// Lock order: `updates`, then `core`, then `lifecycle`.
pub struct SensorManager<C: EstimatorCore> {
    angle_handler: Arc<AngleSensorHandler>,
    distance_handler: Arc<DistanceSensorHandler>,
    config: Arc<ConfigStore>,
    parameters: Box<dyn ParameterStore>,
    clock: Box<dyn Clock>,
    core: Mutex<C>,
    lifecycle: RwLock<FilterLifecycle>,
    updates: Mutex<()>,
}

impl<C: EstimatorCore> SensorManager<C> {
    /// Creates a manager with default handlers, the default configuration and
    /// the system clock.
    pub fn new(core: C, parameters: impl ParameterStore + 'static) -> Self {
        Self {
            angle_handler: Arc::new(AngleSensorHandler::default()),
            distance_handler: Arc::new(DistanceSensorHandler::default()),
            config: Arc::new(ConfigStore::default()),
            parameters: Box::new(parameters),
            clock: Box::new(SystemClock),
            core: Mutex::new(core),
            lifecycle: RwLock::new(FilterLifecycle::Uninitialized),
            updates: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Applies a starting configuration. Never triggers initialization.
    pub fn with_config(self, config: SphericalSensorConfig) -> Self {
        let config = SphericalSensorConfig {
            init_filter_requested: false,
            ..config
        };
        self.push_tuning(&config);
        self.config.publish(config);
        self
    }

    // --- Accessors ---

    pub fn angle_handler(&self) -> Arc<AngleSensorHandler> {
        Arc::clone(&self.angle_handler)
    }

    pub fn distance_handler(&self) -> Arc<DistanceSensorHandler> {
        Arc::clone(&self.distance_handler)
    }

    /// The current configuration snapshot.
    pub fn config(&self) -> Arc<SphericalSensorConfig> {
        self.config.snapshot()
    }

    pub fn lifecycle(&self) -> FilterLifecycle {
        *self.lifecycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the estimator core.
    pub fn with_core<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *core)
    }

    /// A process-noise handle the core can keep; it tracks later reconfigurations.
    pub fn process_noise_contributor(&self) -> MountOffsetProcessNoise {
        MountOffsetProcessNoise::new(Arc::clone(&self.config))
    }

    pub fn compute_auxiliary_process_noise(&self, dt: f64) -> Matrix3<f64> {
        self.process_noise_contributor()
            .compute_auxiliary_process_noise(dt)
    }

    // --- Producer path ---

    /// Routes a reading to whichever handler accepts it.
    pub fn handle_message(&self, message: &MeasurementMessage) -> bool {
        self.angle_handler.handle_message(message) || self.distance_handler.handle_message(message)
    }

    // --- Reconfiguration path ---

    /// Applies one reconfiguration event.
    ///
    /// Noise and delay are pushed to both handlers on every call. The filter
    /// is initialized only when `changed` flags the trigger field *and* the
    /// new configuration requests it; the returned configuration then has the
    /// trigger cleared. Calls with the trigger off never initialize.
    pub fn on_config_update(
        &self,
        new_config: SphericalSensorConfig,
        changed: ChangedFields,
    ) -> ReconfigureOutcome {
        let _update = self.updates.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("reconfiguration {:?}: {:?}", changed, new_config);

        let requested =
            changed.contains(ChangedFields::INIT_FILTER) && new_config.init_filter_requested;
        let applied = SphericalSensorConfig {
            init_filter_requested: false,
            ..new_config
        };

        self.config.publish(applied.clone());
        self.push_tuning(&applied);

        let init = if requested {
            match self.init_serialized(DEFAULT_INIT_SCALE) {
                Ok(()) => InitAck::Submitted,
                Err(e) => InitAck::Rejected(e),
            }
        } else {
            InitAck::NotRequested
        };

        ReconfigureOutcome {
            config: applied,
            init,
        }
    }

    fn push_tuning(&self, config: &SphericalSensorConfig) {
        self.angle_handler.set_noises(config.angle_noise_meas);
        self.angle_handler.set_delay(config.angle_delay);
        self.distance_handler.set_noises(config.distance_noise_meas);
        self.distance_handler.set_delay(config.distance_delay);
    }

    // --- Initialization ---

    /// Initializes the filter from the latest readings.
    pub fn initialize(&self) -> Result<(), CoreError> {
        self.init(DEFAULT_INIT_SCALE)
    }

    /// Initialization entry point taking an explicit scale. Scales below
    /// 0.001 are clamped to 1.0.
    pub fn init(&self, scale: f64) -> Result<(), CoreError> {
        let _update = self.updates.lock().unwrap_or_else(PoisonError::into_inner);
        self.init_serialized(scale)
    }

    /// Caller must hold `updates`.
    fn init_serialized(&self, scale: f64) -> Result<(), CoreError> {
        let config = self.config.snapshot();
        let initializer = SphericalPositionInitializer {
            angles: &self.angle_handler,
            distance: &self.distance_handler,
            parameters: self.parameters.as_ref(),
            clock: self.clock.as_ref(),
        };
        let seed = initializer.build_seed(&config, scale);
        let position: Vector3<f64> = seed.position;

        // The lifecycle moves while the core is still locked, so a propagation
        // can never be reported against the previous seed.
        let result = self.with_core(|core| {
            let result = core.init(seed);
            if result.is_ok() {
                let mut lifecycle = self.lifecycle.write().unwrap_or_else(PoisonError::into_inner);
                *lifecycle = lifecycle.on_seed_accepted();
            }
            result
        });
        match &result {
            Ok(()) => {
                info!(
                    "filter initialized at [{:.3}, {:.3}, {:.3}]",
                    position.x, position.y, position.z
                );
            }
            Err(e) => warn!("filter initialization failed: {}", e),
        }
        result
    }

    /// Called by the runtime after the core completed a propagation step.
    pub fn notify_propagated(&self) {
        let mut lifecycle = self.lifecycle.write().unwrap_or_else(PoisonError::into_inner);
        *lifecycle = lifecycle.on_propagated();
    }
}

impl<C: EstimatorCore> AuxiliaryProcessNoise for SensorManager<C> {
    fn process_noise_contribution(&self, dt: f64) -> Matrix3<f64> {
        self.compute_auxiliary_process_noise(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MeasurementData;
    use crate::params::StaticParameters;
    use crate::seed::InitialStateSeed;
    use crate::types::{FixedClock, FrameHandle};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra::Vector2;
    use std::f64::consts::FRAC_PI_2;
    use std::thread;

    /// Records every seed it receives; can be told to refuse them.
    #[derive(Default)]
    struct RecordingCore {
        seeds: Vec<InitialStateSeed>,
        refuse: bool,
    }

    impl EstimatorCore for RecordingCore {
        fn init(&mut self, seed: InitialStateSeed) -> Result<(), CoreError> {
            if self.refuse {
                return Err(CoreError::Rejected {
                    reason: "not ready".to_string(),
                });
            }
            self.seeds.push(seed);
            Ok(())
        }
    }

    fn manager() -> SensorManager<RecordingCore> {
        SensorManager::new(RecordingCore::default(), StaticParameters::new())
            .with_clock(FixedClock(100.0))
    }

    fn submissions(manager: &SensorManager<RecordingCore>) -> usize {
        manager.with_core(|core| core.seeds.len())
    }

    fn trigger(config: &SphericalSensorConfig) -> SphericalSensorConfig {
        SphericalSensorConfig {
            init_filter_requested: true,
            ..config.clone()
        }
    }

    fn feed(manager: &SensorManager<RecordingCore>, angles: Vector2<f64>, range: f64) {
        let angle_msg = MeasurementMessage {
            sensor_handle: FrameHandle(1),
            timestamp: 1.0,
            data: MeasurementData::Angles(angles),
        };
        let range_msg = MeasurementMessage {
            sensor_handle: FrameHandle(1),
            timestamp: 1.1,
            data: MeasurementData::Distance(range),
        };
        assert!(manager.handle_message(&angle_msg));
        assert!(manager.handle_message(&range_msg));
    }

    #[test]
    fn tuning_reaches_the_handlers_on_every_update() {
        let manager = manager();
        let config = SphericalSensorConfig {
            angle_noise_meas: 0.03,
            angle_delay: 0.05,
            distance_noise_meas: 0.2,
            distance_delay: 0.1,
            ..SphericalSensorConfig::default()
        };
        let outcome = manager.on_config_update(config.clone(), ChangedFields::NONE);

        assert_eq!(outcome.init, InitAck::NotRequested);
        assert_eq!(outcome.config, config);
        assert_eq!(manager.angle_handler().noise_std(), 0.03);
        assert_eq!(manager.angle_handler().delay(), 0.05);
        assert_eq!(manager.distance_handler().noise_std(), 0.2);
        assert_eq!(manager.distance_handler().delay(), 0.1);
        assert_eq!(*manager.config(), config);
        assert_eq!(submissions(&manager), 0);
    }

    #[test]
    fn trigger_initializes_once_and_comes_back_cleared() {
        let manager = manager();
        let base = SphericalSensorConfig::default();

        let outcome = manager.on_config_update(trigger(&base), ChangedFields::INIT_FILTER);
        assert_eq!(outcome.init, InitAck::Submitted);
        assert!(!outcome.config.init_filter_requested);
        assert!(!manager.config().init_filter_requested);
        assert_eq!(submissions(&manager), 1);
        assert_eq!(manager.lifecycle(), FilterLifecycle::Initialized);

        // Echoing the acknowledged config back must not re-run initialization.
        for _ in 0..3 {
            let again = manager.on_config_update(outcome.config.clone(), ChangedFields::INIT_FILTER);
            assert_eq!(again.init, InitAck::NotRequested);
        }
        assert_eq!(submissions(&manager), 1);
    }

    #[test]
    fn each_re_armed_trigger_submits_a_new_seed() {
        let manager = manager();
        let base = SphericalSensorConfig::default();

        manager.on_config_update(trigger(&base), ChangedFields::INIT_FILTER);
        manager.on_config_update(base.clone(), ChangedFields::INIT_FILTER);
        manager.on_config_update(trigger(&base), ChangedFields::INIT_FILTER);

        assert_eq!(submissions(&manager), 2);
    }

    #[test]
    fn flag_without_the_changed_bit_is_ignored() {
        let manager = manager();
        let outcome = manager.on_config_update(
            trigger(&SphericalSensorConfig::default()),
            ChangedFields::YAW_INIT,
        );
        assert_eq!(outcome.init, InitAck::NotRequested);
        assert_eq!(submissions(&manager), 0);
        assert_eq!(manager.lifecycle(), FilterLifecycle::Uninitialized);
    }

    #[test]
    fn seed_without_data_lands_at_the_origin() {
        let manager = manager();
        manager.initialize().unwrap();
        manager.with_core(|core| {
            let seed = &core.seeds[0];
            assert_eq!(seed.position, Vector3::zeros());
            assert_eq!(seed.velocity, Vector3::zeros());
            assert_eq!(seed.accel_reading, Vector3::new(0.0, 0.0, 9.81));
            assert_eq!(seed.timestamp, 100.0);
        });
    }

    #[test]
    fn seed_uses_the_latest_readings_and_new_yaw() {
        let manager = SensorManager::new(
            RecordingCore::default(),
            StaticParameters::with_mount_offset(Vector3::new(0.0, 0.0, 0.5)),
        );
        feed(&manager, Vector2::new(FRAC_PI_2, 0.0), 2.0);

        let config = SphericalSensorConfig {
            yaw_init_degrees: 90.0,
            init_filter_requested: true,
            ..SphericalSensorConfig::default()
        };
        manager.on_config_update(config, ChangedFields::YAW_INIT | ChangedFields::INIT_FILTER);

        manager.with_core(|core| {
            let seed = &core.seeds[0];
            assert_abs_diff_eq!(seed.position, Vector3::new(2.0, 0.0, -0.5), epsilon = 1e-12);
            assert_abs_diff_eq!(
                seed.orientation * Vector3::x(),
                Vector3::y(),
                epsilon = 1e-12
            );
            assert_eq!(seed.mount_offset, Vector3::new(0.0, 0.0, 0.5));
        });
    }

    #[test]
    fn rejection_is_reported_and_keeps_the_lifecycle() {
        let manager = SensorManager::new(
            RecordingCore {
                refuse: true,
                ..RecordingCore::default()
            },
            StaticParameters::new(),
        );
        let outcome = manager.on_config_update(
            trigger(&SphericalSensorConfig::default()),
            ChangedFields::ALL,
        );
        assert!(matches!(outcome.init, InitAck::Rejected(CoreError::Rejected { .. })));
        assert!(!outcome.config.init_filter_requested);
        assert_eq!(manager.lifecycle(), FilterLifecycle::Uninitialized);
    }

    #[test]
    fn lifecycle_follows_seed_and_propagation() {
        let manager = manager();
        manager.notify_propagated();
        assert_eq!(manager.lifecycle(), FilterLifecycle::Uninitialized);

        manager.initialize().unwrap();
        manager.notify_propagated();
        assert_eq!(manager.lifecycle(), FilterLifecycle::Running);

        manager.init(0.0005).unwrap();
        assert_eq!(manager.lifecycle(), FilterLifecycle::Initialized);
        assert_eq!(submissions(&manager), 2);
    }

    #[test]
    fn process_noise_tracks_noise_p_ip() {
        let manager = manager();
        let contributor = manager.process_noise_contributor();
        manager.on_config_update(
            SphericalSensorConfig {
                noise_p_ip: 0.02,
                ..SphericalSensorConfig::default()
            },
            ChangedFields::NOISE_P_IP,
        );
        let q = contributor.process_noise_contribution(0.1);
        assert_relative_eq!(q[(0, 0)], 4e-6, max_relative = 1e-12);
        assert_relative_eq!(
            manager.process_noise_contribution(0.1)[(2, 2)],
            4e-6,
            max_relative = 1e-12
        );
    }

    #[test]
    fn with_config_never_triggers() {
        let manager = manager().with_config(trigger(&SphericalSensorConfig {
            distance_delay: 0.3,
            ..SphericalSensorConfig::default()
        }));
        assert_eq!(submissions(&manager), 0);
        assert!(!manager.config().init_filter_requested);
        assert_eq!(manager.distance_handler().delay(), 0.3);
    }

    #[test]
    fn producers_and_reconfiguration_run_concurrently() {
        let manager = Arc::new(manager());
        let producer = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for k in 0..500 {
                    let t = k as f64 * 0.01;
                    manager.handle_message(&MeasurementMessage {
                        sensor_handle: FrameHandle(1),
                        timestamp: t,
                        data: MeasurementData::Distance(1.0 + t),
                    });
                }
            })
        };
        let reconfigure = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let base = SphericalSensorConfig::default();
                for _ in 0..50 {
                    manager.on_config_update(trigger(&base), ChangedFields::INIT_FILTER);
                    manager.on_config_update(base.clone(), ChangedFields::INIT_FILTER);
                }
            })
        };
        producer.join().unwrap();
        reconfigure.join().unwrap();

        assert_eq!(submissions(&manager), 50);
        assert_abs_diff_eq!(manager.distance_handler().get_measurement()[0], 5.99, epsilon = 1e-9);
    }

    #[test]
    fn conflicting_updates_leave_tuning_and_snapshot_in_step() {
        let manager = Arc::new(manager());
        let writers: Vec<_> = [(0.1, 0.01, 10.0), (0.2, 0.02, 20.0)]
            .into_iter()
            .map(|(noise, delay, yaw)| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || {
                    let config = SphericalSensorConfig {
                        angle_noise_meas: noise,
                        angle_delay: delay,
                        distance_noise_meas: noise,
                        distance_delay: delay,
                        yaw_init_degrees: yaw,
                        ..SphericalSensorConfig::default()
                    };
                    for _ in 0..2000 {
                        manager.on_config_update(config.clone(), ChangedFields::ALL);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let config = manager.config();
        assert_eq!(config.angle_noise_meas, manager.angle_handler().noise_std());
        assert_eq!(config.angle_delay, manager.angle_handler().delay());
        assert_eq!(config.distance_noise_meas, manager.distance_handler().noise_std());
        assert_eq!(config.distance_delay, manager.distance_handler().delay());
    }

    #[test]
    fn triggered_seed_uses_its_own_update() {
        let manager = Arc::new(manager());
        let writers: Vec<_> = [10.0, 20.0]
            .into_iter()
            .map(|yaw| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || {
                    let config = trigger(&SphericalSensorConfig {
                        yaw_init_degrees: yaw,
                        ..SphericalSensorConfig::default()
                    });
                    for _ in 0..200 {
                        let outcome = manager.on_config_update(config.clone(), ChangedFields::ALL);
                        assert_eq!(outcome.init, InitAck::Submitted);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        // Each update seeds with its own yaw, never with the other writer's.
        let yaws: Vec<f64> = manager.with_core(|core| {
            core.seeds
                .iter()
                .map(|seed| seed.orientation.euler_angles().2.to_degrees())
                .collect()
        });
        assert_eq!(yaws.len(), 400);
        assert_eq!(yaws.iter().filter(|yaw| (**yaw - 10.0).abs() < 1e-9).count(), 200);
        assert_eq!(yaws.iter().filter(|yaw| (**yaw - 20.0).abs() < 1e-9).count(), 200);
    }

    #[test]
    fn accepted_seed_is_visible_together_with_its_lifecycle() {
        let manager = Arc::new(manager());
        let observer = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || loop {
                let (seeds, lifecycle) =
                    manager.with_core(|core| (core.seeds.len(), manager.lifecycle()));
                if seeds > 0 {
                    assert_eq!(lifecycle, FilterLifecycle::Initialized);
                    break;
                }
                thread::yield_now();
            })
        };
        manager.initialize().unwrap();
        observer.join().unwrap();

        manager.notify_propagated();
        assert_eq!(manager.lifecycle(), FilterLifecycle::Running);
    }
}
