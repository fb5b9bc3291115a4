//! Offline swing-up trajectory optimization.
//!
//! Solves the full swing-up problem from the hanging state and writes the
//! resulting trajectory to CSV.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use swingup_core::{io, CostConfig, MpcControllerConfig, StateVector};
use swingup_dynamics::{DoublePendulum, DoublePendulumParams};
use swingup_ilqr::{CostModel, IlqrOptimizer};

/// Swing-up trajectory optimizer for the two-link underactuated pendulum.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Optional TOML configuration file; defaults apply otherwise.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output CSV path for the optimized trajectory.
    #[arg(short, long, default_value = "swingup_trajectory.csv")]
    output: PathBuf,

    /// Actuate the first joint instead of the second (pendubot).
    #[arg(long)]
    pendubot: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MpcControllerConfig::from_file(path)?,
        None => MpcControllerConfig::default(),
    };
    if cli.pendubot {
        config.torque_limit = [config.torque_limit[1], config.torque_limit[0]];
    }

    let plant = DoublePendulum::new(DoublePendulumParams::default(), config.integrator);
    let goal = StateVector::new(std::f64::consts::PI, 0.0, 0.0, 0.0);
    let cost = CostModel::new(&CostConfig::default(), goal, &plant)?;
    let optimizer = IlqrOptimizer::new(config.init_profile(), cost, plant)?;

    info!(
        n = config.n_init,
        dt = config.dt,
        max_iter = config.max_iter_init,
        "optimizing swing-up trajectory"
    );
    let outcome = optimizer.optimize(StateVector::zeros(), None);

    println!(
        "termination: {:?}, iterations: {}, cost: {:.3}, elapsed: {:.1} ms",
        outcome.termination,
        outcome.iterations,
        outcome.cost,
        outcome.elapsed.as_secs_f64() * 1e3,
    );
    println!(
        "final state: [{:.4}, {:.4}, {:.4}, {:.4}], goal distance: {:.4}",
        outcome.trajectory.final_state()[0],
        outcome.trajectory.final_state()[1],
        outcome.trajectory.final_state()[2],
        outcome.trajectory.final_state()[3],
        (outcome.trajectory.final_state() - goal).norm(),
    );

    io::save_csv(&outcome.trajectory, &cli.output)?;
    println!("trajectory written to {}", cli.output.display());
    Ok(())
}
