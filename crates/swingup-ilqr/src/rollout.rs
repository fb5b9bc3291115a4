//! Forward simulation of a control sequence through the dynamics oracle.

use swingup_core::{ControlVector, IlqrError, StateVector, TorqueLimit, Trajectory};
use swingup_dynamics::DynamicsOracle;

use crate::cost::CostModel;

/// Roll a control sequence out from `x0`.
///
/// Every control is clipped to the torque limits before stepping, and the
/// clipped values are what the returned trajectory stores — downstream passes
/// linearize around what was actually applied.
///
/// # Errors
///
/// Returns [`IlqrError::RolloutDivergence`] as soon as any state component
/// goes non-finite. Callers treat this as a recoverable signal (reject the
/// candidate), not a fatal error.
pub fn rollout<D: DynamicsOracle + ?Sized>(
    x0: StateVector,
    controls: &[ControlVector],
    oracle: &D,
    dt: f64,
    limit: &TorqueLimit,
) -> Result<Trajectory, IlqrError> {
    let mut states = Vec::with_capacity(controls.len() + 1);
    let mut clipped = Vec::with_capacity(controls.len());
    states.push(x0);

    let mut x = x0;
    for (step, u) in controls.iter().enumerate() {
        let u = limit.clip(u);
        x = oracle.step(&x, &u, dt);
        if !is_finite(&x) {
            return Err(IlqrError::RolloutDivergence { step });
        }
        clipped.push(u);
        states.push(x);
    }

    Ok(Trajectory::new(dt, states, clipped).expect("rollout builds a valid trajectory"))
}

/// Total cost of a trajectory: running cost over every `(x, u)` pair plus
/// the terminal cost at the final state.
pub fn trajectory_cost<D: DynamicsOracle + ?Sized>(
    trajectory: &Trajectory,
    cost: &CostModel,
    oracle: &D,
) -> f64 {
    let mut total = 0.0;
    for (x, u) in trajectory.states().iter().zip(trajectory.controls()) {
        total += cost.running_cost(x, u, oracle);
    }
    total + cost.terminal_cost(trajectory.final_state(), oracle)
}

fn is_finite(x: &StateVector) -> bool {
    x.iter().all(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
