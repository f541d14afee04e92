// polaris_sim/src/runner.rs

//! The simulation loop: sensors feed the handlers, scheduled events reach the
//! sensor manager, and the reference core propagates once initialized.

use nalgebra::Vector3;
use polaris_core::lifecycle::FilterLifecycle;
use polaris_core::manager::{InitAck, SensorManager};
use polaris_core::types::{Clock, FrameHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ScenarioError;
use crate::prng::SimulationRng;
use crate::reference_core::ReferenceCore;
use crate::scenario::{validate, ScenarioConfig};
use crate::sensors::SphericalSensorSim;

const AGENT_HANDLE: FrameHandle = FrameHandle(1);
const SENSOR_HANDLE: FrameHandle = FrameHandle(2);

/// Simulation time shared between the loop and the sensor manager.
#[derive(Debug, Clone, Default)]
pub struct SimClock(Arc<AtomicU64>);

impl SimClock {
    pub fn set(&self, t: f64) {
        self.0.store(t.to_bits(), Ordering::Relaxed);
    }
}

impl Clock for SimClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// One accepted or refused seed, as seen by the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct InitRecord {
    pub time: f64,
    pub accepted: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub steps: usize,
    pub messages_accepted: usize,
    pub inits: Vec<InitRecord>,
    pub lifecycle: FilterLifecycle,
    pub final_position: Option<Vector3<f64>>,
    pub true_position: Vector3<f64>,
}

/// Runs a scenario to completion.
pub fn run(scenario: &ScenarioConfig) -> Result<RunSummary, ScenarioError> {
    validate(scenario)?;
    let sim = &scenario.simulation;
    let mut rng = SimulationRng::from_seed(sim.seed);
    let clock = SimClock::default();

    let manager = SensorManager::new(
        ReferenceCore::new(AGENT_HANDLE, SENSOR_HANDLE),
        scenario.static_parameters(),
    )
    .with_clock(clock.clone())
    .with_config(scenario.sensor.clone());
    let process_noise = manager.process_noise_contributor();

    let mut sensors = SphericalSensorSim::new(
        SENSOR_HANDLE,
        &scenario.angle_sensor,
        &scenario.distance_sensor,
    )?;

    let p0 = Vector3::from(scenario.truth.position);
    let velocity = Vector3::from(scenario.truth.velocity);
    let mut truth = p0;

    let steps = sim.step_count();
    let mut next_event = 0;
    let mut messages_accepted = 0;
    let mut inits = Vec::new();

    info!(
        "running {} steps of {}s with {} scheduled events",
        steps,
        sim.dt,
        scenario.events.len()
    );

    for k in 0..=steps {
        let t = k as f64 * sim.dt;
        clock.set(t);
        truth = p0 + velocity * t;

        // --- 1. Sensors ---
        for message in sensors.step(t, &truth, &mut rng.0) {
            if manager.handle_message(&message) {
                messages_accepted += 1;
            }
        }

        // --- 2. Startup initialization ---
        if k == 0 && sim.init_on_startup {
            let accepted = manager.initialize().is_ok();
            inits.push(InitRecord { time: t, accepted });
        }

        // --- 3. Scheduled reconfigurations ---
        while next_event < scenario.events.len() && scenario.events[next_event].time <= t + 1e-9 {
            let (config, changed) = scenario.events[next_event].apply(&manager.config());
            let outcome = manager.on_config_update(config, changed);
            match outcome.init {
                InitAck::NotRequested => {}
                InitAck::Submitted => inits.push(InitRecord { time: t, accepted: true }),
                InitAck::Rejected(e) => {
                    warn!("re-initialization at t={} refused: {}", t, e);
                    inits.push(InitRecord { time: t, accepted: false });
                }
            }
            next_event += 1;
        }

        // --- 4. Core propagation ---
        if k < steps {
            let propagated = manager.with_core(|core| core.propagate(sim.dt, &process_noise));
            if propagated {
                manager.notify_propagated();
            }
        }
    }

    let final_position = manager.with_core(|core| core.position());
    let summary = RunSummary {
        steps,
        messages_accepted,
        inits,
        lifecycle: manager.lifecycle(),
        final_position,
        true_position: truth,
    };
    info!(
        "run finished: {} messages, {} initializations, lifecycle {:?}",
        summary.messages_accepted,
        summary.inits.len(),
        summary.lifecycle
    );
    Ok(summary)
}
