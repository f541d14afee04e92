// polaris_sim/src/main.rs

use clap::Parser;
use polaris_sim::{cli::Cli, error::ScenarioError, logging, runner, scenario};
use tracing::info;

fn main() -> Result<(), ScenarioError> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level);

    let mut scenario = scenario::load_scenario(&cli.scenario)?;
    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }

    let summary = runner::run(&scenario)?;
    for record in &summary.inits {
        info!(
            "init at t={:.2}s: {}",
            record.time,
            if record.accepted { "accepted" } else { "refused" }
        );
    }
    match summary.final_position {
        Some(p) => {
            let err = (p - summary.true_position).norm();
            info!(
                "final position [{:.3}, {:.3}, {:.3}], {:.3} m from truth",
                p.x, p.y, p.z, err
            );
        }
        None => info!("filter was never initialized"),
    }
    Ok(())
}
