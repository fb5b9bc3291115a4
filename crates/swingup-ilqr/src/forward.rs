//! The iLQR forward pass: policy rollout with backtracking line search.

use swingup_core::{IlqrError, StateVector, TorqueLimit, Trajectory};
use swingup_dynamics::DynamicsOracle;

use crate::backward::BackwardPass;
use crate::cost::CostModel;
use crate::rollout::trajectory_cost;

/// Armijo sufficient-decrease fraction of the model-predicted reduction.
const SUFFICIENT_DECREASE: f64 = 1e-4;

/// Number of halvings in the backtracking sequence 1, 1/2, …, 2⁻¹⁰.
const BACKTRACK_STEPS: u32 = 10;

/// Apply the backward pass's policy with a backtracking line search.
///
/// For each candidate step size α the controls
/// `u_t + α·k_t + K_t·(x_t − x_t_nominal)` are clipped to the torque limits
/// and rolled through the oracle. The first α whose rollout stays finite and
/// whose actual cost reduction reaches the Armijo fraction of the model
/// reduction is accepted.
///
/// # Errors
///
/// Returns [`IlqrError::LineSearchExhausted`] when no step size qualifies;
/// the caller recovers by increasing regularization and re-running the
/// backward pass.
pub fn forward_pass<D: DynamicsOracle + ?Sized>(
    trajectory: &Trajectory,
    current_cost: f64,
    pass: &BackwardPass,
    oracle: &D,
    cost: &CostModel,
    limit: &TorqueLimit,
) -> Result<(Trajectory, f64), IlqrError> {
    let n = trajectory.horizon();
    let dt = trajectory.dt();
    debug_assert_eq!(pass.gains.len(), n);

    let mut alpha = 1.0;
    for _ in 0..=BACKTRACK_STEPS {
        if let Some(candidate) = roll_policy(trajectory, pass, alpha, oracle, dt, limit) {
            let new_cost = trajectory_cost(&candidate, cost, oracle);
            let actual = current_cost - new_cost;
            let model = pass.expected.at_alpha(alpha);
            let sufficient = if model > 0.0 {
                actual >= SUFFICIENT_DECREASE * model
            } else {
                actual > 0.0
            };
            if sufficient {
                return Ok((candidate, new_cost));
            }
        }
        alpha *= 0.5;
    }

    Err(IlqrError::LineSearchExhausted)
}

/// Closed-loop rollout of the candidate policy; `None` if it diverges.
fn roll_policy<D: DynamicsOracle + ?Sized>(
    trajectory: &Trajectory,
    pass: &BackwardPass,
    alpha: f64,
    oracle: &D,
    dt: f64,
    limit: &TorqueLimit,
) -> Option<Trajectory> {
    let n = trajectory.horizon();
    let mut states = Vec::with_capacity(n + 1);
    let mut controls = Vec::with_capacity(n);

    let mut x = *trajectory.first_state();
    states.push(x);

    for t in 0..n {
        let dx = x - trajectory.states()[t];
        let g = &pass.gains[t];
        let u = trajectory.controls()[t] + alpha * g.feedforward + g.feedback * dx;
        let u = limit.clip(&u);
        x = oracle.step(&x, &u, dt);
        if !x.iter().all(|v| v.is_finite()) {
            return None;
        }
        controls.push(u);
        states.push(x);
    }

    Some(Trajectory::new(dt, states, controls).expect("policy rollout builds a valid trajectory"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
