// polaris_sim/src/scenario.rs

//! Scenario files: the reconfigurable sensor settings, static parameters,
//! ground truth, simulated sensor characteristics and a timeline of
//! reconfiguration events.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use polaris_core::config::{ChangedFields, SphericalSensorConfig};
use polaris_core::params::StaticParameters;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::ScenarioError;

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// The root of the data parsed from a `scenario.toml` file.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: Simulation,

    /// The sensor configuration in effect at startup.
    #[serde(default)]
    pub sensor: SphericalSensorConfig,

    /// Static parameters, e.g. `"position_sensor/init/p_ip/x" = 0.1`.
    #[serde(default)]
    pub parameters: HashMap<String, f64>,

    #[serde(default)]
    pub truth: Truth,

    #[serde(default = "SensorChannelConfig::default_angles")]
    pub angle_sensor: SensorChannelConfig,

    #[serde(default = "SensorChannelConfig::default_distance")]
    pub distance_sensor: SensorChannelConfig,

    /// `[[events]]` become a timeline of reconfigurations.
    #[serde(default)]
    pub events: Vec<ReconfigureEvent>,
}

impl ScenarioConfig {
    pub fn static_parameters(&self) -> StaticParameters {
        StaticParameters(self.parameters.clone())
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Simulation {
    /// Seed for the pseudo-random number generator.
    pub seed: u64,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
    /// Step of the simulation loop in seconds.
    pub dt: f64,
    /// Initialize the filter as soon as the first step has run.
    pub init_on_startup: bool,
}

/// Upper bound on the number of loop iterations a scenario may request.
pub const MAX_STEPS: usize = 10_000_000;

impl Simulation {
    /// Number of steps after the initial one. Only meaningful once the
    /// scenario passed validation.
    pub fn step_count(&self) -> usize {
        (self.duration_seconds / self.dt).round() as usize
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: 0,
            duration_seconds: 10.0,
            dt: 0.01,
            init_on_startup: true,
        }
    }
}

/// Where the tracked point really is, in the sensor's world frame.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Truth {
    #[serde(default)]
    pub position: [f64; 3],
    #[serde(default)]
    pub velocity: [f64; 3],
}

/// Rate and noise of one simulated reading stream.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SensorChannelConfig {
    pub rate: f64,
    pub noise_stddev: f64,
    /// The stream only starts producing after this many seconds.
    #[serde(default)]
    pub start_after: f64,
}

impl SensorChannelConfig {
    fn default_angles() -> Self {
        Self {
            rate: 20.0,
            noise_stddev: 0.005,
            start_after: 0.0,
        }
    }

    fn default_distance() -> Self {
        Self {
            rate: 10.0,
            noise_stddev: 0.02,
            start_after: 0.0,
        }
    }
}

/// A reconfiguration at a given time. Unset fields keep their current value.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ReconfigureEvent {
    pub time: f64,
    pub angle_noise_meas: Option<f64>,
    pub angle_delay: Option<f64>,
    pub distance_noise_meas: Option<f64>,
    pub distance_delay: Option<f64>,
    pub yaw_init_degrees: Option<f64>,
    pub noise_p_ip: Option<f64>,
    pub init_filter_requested: Option<bool>,
}

impl ReconfigureEvent {
    /// The full configuration after this event, and the mask of changed fields.
    pub fn apply(&self, current: &SphericalSensorConfig) -> (SphericalSensorConfig, ChangedFields) {
        let next = SphericalSensorConfig {
            angle_noise_meas: self.angle_noise_meas.unwrap_or(current.angle_noise_meas),
            angle_delay: self.angle_delay.unwrap_or(current.angle_delay),
            distance_noise_meas: self
                .distance_noise_meas
                .unwrap_or(current.distance_noise_meas),
            distance_delay: self.distance_delay.unwrap_or(current.distance_delay),
            yaw_init_degrees: self.yaw_init_degrees.unwrap_or(current.yaw_init_degrees),
            noise_p_ip: self.noise_p_ip.unwrap_or(current.noise_p_ip),
            init_filter_requested: self
                .init_filter_requested
                .unwrap_or(current.init_filter_requested),
        };
        let changed = ChangedFields::between(current, &next);
        (next, changed)
    }
}

// =========================================================================
// == Loading ==
// =========================================================================

/// Loads a scenario file. `POLARIS_`-prefixed environment variables override
/// file values, with `__` separating nested keys (`POLARIS_SIMULATION__SEED=3`).
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, ScenarioError> {
    info!("Loading scenario from: {}", path.display());
    let figment = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("POLARIS_").split("__"));
    finish(figment)
}

/// Loads a scenario from TOML text.
pub fn load_scenario_str(toml: &str) -> Result<ScenarioConfig, ScenarioError> {
    finish(Figment::new().merge(Toml::string(toml)))
}

fn finish(figment: Figment) -> Result<ScenarioConfig, ScenarioError> {
    let mut scenario: ScenarioConfig = figment.extract().map_err(Box::new)?;
    validate(&scenario)?;
    scenario
        .events
        .sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(scenario)
}

pub(crate) fn validate(scenario: &ScenarioConfig) -> Result<(), ScenarioError> {
    let sim = &scenario.simulation;
    if !(sim.dt > 0.0 && sim.dt.is_finite()) {
        return Err(ScenarioError::InvalidStep(sim.dt));
    }
    if !(sim.duration_seconds >= 0.0 && sim.duration_seconds.is_finite()) {
        return Err(ScenarioError::InvalidDuration(sim.duration_seconds));
    }
    let steps = (sim.duration_seconds / sim.dt).round();
    if steps > MAX_STEPS as f64 {
        return Err(ScenarioError::TooManySteps {
            steps,
            max: MAX_STEPS,
        });
    }
    for (name, channel) in [
        ("angle_sensor", &scenario.angle_sensor),
        ("distance_sensor", &scenario.distance_sensor),
    ] {
        if !(channel.rate > 0.0) {
            return Err(ScenarioError::InvalidRate {
                sensor: name.to_string(),
                rate: channel.rate,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        [simulation]
        seed = 7
        duration_seconds = 2.0
        dt = 0.05
        init_on_startup = false

        [sensor]
        yaw_init_degrees = 30.0
        noise_p_ip = 0.02

        [parameters]
        "position_sensor/init/p_ip/z" = 0.15

        [truth]
        position = [3.0, 4.0, 1.0]

        [angle_sensor]
        rate = 25.0
        noise_stddev = 0.0

        [[events]]
        time = 1.5
        init_filter_requested = true

        [[events]]
        time = 0.5
        yaw_init_degrees = 90.0
    "#;

    #[test]
    fn parses_a_full_scenario() {
        let scenario = load_scenario_str(SCENARIO).unwrap();
        assert_eq!(scenario.simulation.seed, 7);
        assert!(!scenario.simulation.init_on_startup);
        assert_eq!(scenario.sensor.yaw_init_degrees, 30.0);
        assert_eq!(scenario.sensor.angle_noise_meas, 0.01);
        assert_eq!(scenario.truth.position, [3.0, 4.0, 1.0]);
        assert_eq!(scenario.truth.velocity, [0.0, 0.0, 0.0]);
        assert_eq!(scenario.angle_sensor.rate, 25.0);
        assert_eq!(scenario.distance_sensor.rate, 10.0);

        // Events come back in time order.
        assert_eq!(scenario.events[0].time, 0.5);
        assert_eq!(scenario.events[1].init_filter_requested, Some(true));

        let params = scenario.static_parameters();
        assert_eq!(
            polaris_core::params::read_mount_offset(&params),
            nalgebra::Vector3::new(0.0, 0.0, 0.15)
        );
    }

    #[test]
    fn empty_scenario_uses_defaults() {
        let scenario = load_scenario_str("").unwrap();
        assert_eq!(scenario.simulation.dt, 0.01);
        assert!(scenario.events.is_empty());
        assert_eq!(scenario.sensor, SphericalSensorConfig::default());
    }

    #[test]
    fn rejects_bad_values_and_unknown_fields() {
        assert!(matches!(
            load_scenario_str("[simulation]\ndt = 0.0"),
            Err(ScenarioError::InvalidStep(_))
        ));
        assert!(matches!(
            load_scenario_str("[simulation]\ndt = inf"),
            Err(ScenarioError::InvalidStep(_))
        ));
        assert!(matches!(
            load_scenario_str("[angle_sensor]\nrate = -1.0\nnoise_stddev = 0.1"),
            Err(ScenarioError::InvalidRate { .. })
        ));
        assert!(matches!(
            load_scenario_str("[sensor]\nbogus = 1.0"),
            Err(ScenarioError::Load(_))
        ));
    }

    #[test]
    fn environment_overrides_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("scenario.toml", "[simulation]\nseed = 1\ndt = 0.1\n")?;
            jail.set_env("POLARIS_SIMULATION__SEED", "9");
            let scenario =
                load_scenario(Path::new("scenario.toml")).map_err(|e| e.to_string())?;
            assert_eq!(scenario.simulation.seed, 9);
            assert_eq!(scenario.simulation.dt, 0.1);
            Ok(())
        });
    }

    #[test]
    fn unbounded_runs_are_refused() {
        assert!(matches!(
            load_scenario_str("[simulation]\nduration_seconds = inf\ndt = 0.1"),
            Err(ScenarioError::InvalidDuration(_))
        ));
        assert!(matches!(
            load_scenario_str("[simulation]\nduration_seconds = nan\ndt = 0.1"),
            Err(ScenarioError::InvalidDuration(_))
        ));
        assert!(matches!(
            load_scenario_str("[simulation]\nduration_seconds = 1e6\ndt = 1e-9"),
            Err(ScenarioError::TooManySteps { .. })
        ));

        let scenario = load_scenario_str("[simulation]\nduration_seconds = 2.0\ndt = 0.05").unwrap();
        assert_eq!(scenario.simulation.step_count(), 40);
    }

    #[test]
    fn event_patch_reports_changed_fields() {
        let current = SphericalSensorConfig::default();
        let event = ReconfigureEvent {
            time: 1.0,
            yaw_init_degrees: Some(45.0),
            init_filter_requested: Some(true),
            ..ReconfigureEvent::default()
        };
        let (next, changed) = event.apply(&current);
        assert_eq!(next.yaw_init_degrees, 45.0);
        assert!(next.init_filter_requested);
        assert_eq!(next.angle_noise_meas, current.angle_noise_meas);
        assert_eq!(
            changed,
            ChangedFields::YAW_INIT | ChangedFields::INIT_FILTER
        );
    }
}
