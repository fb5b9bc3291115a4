//! Closed-loop execution: simulator and MPC controller in lockstep.

use std::time::Duration;

use rand::Rng;
use tracing::info;

use swingup_core::{StateVector, SwingupError, Trajectory};
use swingup_dynamics::DynamicsOracle;
use swingup_mpc::MpcController;

use crate::simulator::Simulator;

/// Outcome of a closed-loop run.
#[derive(Debug, Clone)]
pub struct ClosedLoopResult {
    /// The realized (true-state) trajectory, including applied torques.
    pub trajectory: Trajectory,
    /// Per-tick planning time, one entry per control step. Stabilization
    /// ticks report zero.
    pub planning_times: Vec<Duration>,
}

impl ClosedLoopResult {
    /// The worst per-tick planning time.
    #[must_use]
    pub fn max_planning_time(&self) -> Duration {
        self.planning_times.iter().copied().max().unwrap_or_default()
    }

    /// Final distance to `goal` in the state norm.
    #[must_use]
    pub fn final_goal_distance(&self, goal: &StateVector) -> f64 {
        (self.trajectory.final_state() - goal).norm()
    }
}

/// Run plant and controller in closed loop for `t_final` seconds.
///
/// Each tick measures the (possibly delayed and noisy) state, asks the
/// controller for a torque, and advances the true plant one step. The
/// controller's plant model may differ from the simulator's, which is how
/// model-mismatch robustness is evaluated.
///
/// # Errors
///
/// Propagates trajectory construction errors; controller and simulator
/// stepping never fail.
pub fn run_closed_loop<D, M, R>(
    simulator: &mut Simulator<D>,
    controller: &mut MpcController<M>,
    t_final: f64,
    rng: &mut R,
) -> Result<ClosedLoopResult, SwingupError>
where
    D: DynamicsOracle,
    M: DynamicsOracle + Clone,
    R: Rng,
{
    let dt = simulator.dt();
    let steps = (t_final / dt).round().max(0.0) as usize;

    let mut states = Vec::with_capacity(steps + 1);
    let mut controls = Vec::with_capacity(steps);
    let mut planning_times = Vec::with_capacity(steps);
    states.push(*simulator.state());

    for i in 0..steps {
        let t = i as f64 * dt;
        let measured = simulator.measure(rng);
        let u = controller.get_control(&measured, t);
        planning_times.push(controller.last_tick().planning_time);
        states.push(simulator.step(&u, rng));
        controls.push(u);
    }

    let trajectory = Trajectory::new(dt, states, controls)?;
    info!(
        steps,
        duration_s = t_final,
        max_planning_us = planning_times.iter().max().map_or(0, |d| d.as_micros() as u64),
        "closed-loop run finished"
    );
    Ok(ClosedLoopResult {
        trajectory,
        planning_times,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
