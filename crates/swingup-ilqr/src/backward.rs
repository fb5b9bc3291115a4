//! The iLQR/DDP backward pass: dynamic-programming recursion over the
//! linearized dynamics and quadratized cost.

use nalgebra::Matrix2;

use swingup_core::{ControlVector, GainMatrix, IlqrError, StateMatrix, StateVector, Trajectory};
use swingup_dynamics::DynamicsOracle;

use crate::cost::CostModel;

/// One timestep's feedback/feedforward pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    /// Feedback gain `K_t`, applied to the state deviation from the nominal.
    pub feedback: GainMatrix,
    /// Feedforward term `k_t`, scaled by the line-search step size.
    pub feedforward: ControlVector,
}

/// Expected cost reduction of the new policy as a function of the step size:
/// `expected(α) = −(α·d1 + α²·d2)` with `d1 = Σ kᵀQu` and
/// `d2 = Σ ½ kᵀQuu k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedReduction {
    d1: f64,
    d2: f64,
}

impl ExpectedReduction {
    /// Model-predicted cost reduction for step size `alpha` (positive when
    /// the quadratic model predicts improvement).
    #[must_use]
    pub fn at_alpha(&self, alpha: f64) -> f64 {
        -(alpha * self.d1 + alpha * alpha * self.d2)
    }

    /// Predicted reduction for a full step.
    #[must_use]
    pub fn full_step(&self) -> f64 {
        self.at_alpha(1.0)
    }
}

/// Result of a successful backward pass: one gain pair per control interval
/// and the expected-reduction coefficients for the line search.
#[derive(Debug, Clone, PartialEq)]
pub struct BackwardPass {
    /// Gains indexed by timestep, `0..N`.
    pub gains: Vec<Gains>,
    /// Expected cost-reduction model.
    pub expected: ExpectedReduction,
}

/// Backpropagate the value-function quadratic along `trajectory`.
///
/// `regu` is added to the control Hessian before inversion: large values
/// shrink the step toward gradient descent, small values approach a full
/// Newton step.
///
/// # Errors
///
/// Returns [`IlqrError::BackwardPassSingularity`] if the regularized control
/// Hessian fails its Cholesky factorization at any step; the caller recovers
/// by increasing `regu` and retrying.
pub fn backward_pass<D: DynamicsOracle + ?Sized>(
    trajectory: &Trajectory,
    cost: &CostModel,
    oracle: &D,
    regu: f64,
) -> Result<BackwardPass, IlqrError> {
    let n = trajectory.horizon();
    let dt = trajectory.dt();

    let (mut vx, mut vxx): (StateVector, StateMatrix) =
        cost.terminal_derivatives(trajectory.final_state(), oracle);

    let mut gains = vec![
        Gains {
            feedback: GainMatrix::zeros(),
            feedforward: ControlVector::zeros(),
        };
        n
    ];
    let mut d1 = 0.0;
    let mut d2 = 0.0;

    for t in (0..n).rev() {
        let x = &trajectory.states()[t];
        let u = &trajectory.controls()[t];
        let (fx, fu) = oracle.linearize(x, u, dt);
        let d = cost.running_derivatives(x, u, oracle);

        let qx = d.cx + fx.transpose() * vx;
        let qu = d.cu + fu.transpose() * vx;
        let qxx = d.cxx + fx.transpose() * vxx * fx;
        let quu = d.cuu + fu.transpose() * vxx * fu;
        let qux = d.cux + fu.transpose() * vxx * fx;

        let quu_reg = quu + Matrix2::identity() * regu;
        let Some(chol) = quu_reg.cholesky() else {
            return Err(IlqrError::BackwardPassSingularity { step: t, regu });
        };

        let k = -chol.solve(&qu);
        let big_k = -chol.solve(&qux);

        // Value-function backup with the regularized gains.
        vx = qx
            + big_k.transpose() * (quu * k)
            + big_k.transpose() * qu
            + qux.transpose() * k;
        vxx = qxx
            + big_k.transpose() * quu * big_k
            + big_k.transpose() * qux
            + qux.transpose() * big_k;
        vxx = (vxx + vxx.transpose()) * 0.5;

        d1 += k.dot(&qu);
        d2 += 0.5 * k.dot(&(quu * k));

        gains[t] = Gains {
            feedback: big_k,
            feedforward: k,
        };
    }

    Ok(BackwardPass {
        gains,
        expected: ExpectedReduction { d1, d2 },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use swingup_core::{CostConfig, Integrator, TorqueLimit};
    use swingup_dynamics::{DoublePendulum, DoublePendulumParams};

    use crate::rollout::rollout;

    fn plant() -> DoublePendulum {
        DoublePendulum::new(DoublePendulumParams::default(), Integrator::RungeKutta4)
    }

    fn swing_trajectory(plant: &DoublePendulum, n: usize) -> Trajectory {
        let controls = vec![ControlVector::new(0.0, 2.0); n];
        rollout(
            StateVector::new(0.2, 0.0, 0.0, 0.0),
            &controls,
            plant,
            0.005,
            &TorqueLimit::new([4.0, 4.0]),
        )
        .unwrap()
    }

    fn cost_model(plant: &DoublePendulum, config: &CostConfig) -> CostModel {
        CostModel::new(
            config,
            StateVector::new(std::f64::consts::PI, 0.0, 0.0, 0.0),
            plant,
        )
        .unwrap()
    }

    #[test]
    fn produces_one_gain_per_step() {
        let plant = plant();
        let traj = swing_trajectory(&plant, 30);
        let cost = cost_model(&plant, &CostConfig::default());
        let bp = backward_pass(&traj, &cost, &plant, 1.0).unwrap();
        assert_eq!(bp.gains.len(), 30);
    }

    #[test]
    fn zero_cost_trajectory_gives_zero_gains() {
        let plant = plant();
        let traj = swing_trajectory(&plant, 20);
        // All weights zero: the value function is identically zero and so is
        // every gain.
        let config = CostConfig {
            s_cu: [0.0; 2],
            s_cp: [0.0; 2],
            s_cv: [0.0; 2],
            s_cen: 0.0,
            f_cp: [0.0; 2],
            f_cv: [0.0; 2],
            f_cen: 0.0,
        };
        let cost = cost_model(&plant, &config);
        let bp = backward_pass(&traj, &cost, &plant, 1.0).unwrap();
        for g in &bp.gains {
            assert_relative_eq!(g.feedback.norm(), 0.0, epsilon = 1e-12);
            assert_relative_eq!(g.feedforward.norm(), 0.0, epsilon = 1e-12);
        }
        assert_relative_eq!(bp.expected.full_step(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn gains_shrink_as_regularization_grows() {
        let plant = plant();
        let traj = swing_trajectory(&plant, 20);
        let cost = cost_model(&plant, &CostConfig::default());

        let norms: Vec<f64> = [1.0, 100.0, 10_000.0, 1_000_000.0]
            .iter()
            .map(|&regu| {
                let bp = backward_pass(&traj, &cost, &plant, regu).unwrap();
                bp.gains
                    .iter()
                    .map(|g| g.feedforward.norm() + g.feedback.norm())
                    .sum::<f64>()
            })
            .collect();

        for pair in norms.windows(2) {
            assert!(
                pair[1] < pair[0],
                "gain norms should shrink with regu: {norms:?}"
            );
        }
    }

    #[test]
    fn expected_reduction_is_positive_for_descent() {
        let plant = plant();
        let traj = swing_trajectory(&plant, 40);
        let cost = cost_model(&plant, &CostConfig::default());
        let bp = backward_pass(&traj, &cost, &plant, 1.0).unwrap();
        assert!(bp.expected.full_step() > 0.0);
        // Smaller steps predict smaller (but still positive) reductions.
        assert!(bp.expected.at_alpha(0.5) > 0.0);
        assert!(bp.expected.at_alpha(0.5) < bp.expected.full_step());
    }

    #[test]
    fn singularity_reported_when_cost_is_concave() {
        let plant = plant();
        let traj = swing_trajectory(&plant, 10);
        let cost = cost_model(&plant, &CostConfig::default());

        // A strongly negative regularizer makes Quu_reg indefinite.
        let err = backward_pass(&traj, &cost, &plant, -1e6).unwrap_err();
        assert!(matches!(err, IlqrError::BackwardPassSingularity { .. }));
    }

    #[test]
    fn gains_are_finite() {
        let plant = plant();
        let traj = swing_trajectory(&plant, 40);
        let cost = cost_model(&plant, &CostConfig::default());
        let bp = backward_pass(&traj, &cost, &plant, 0.01).unwrap();
        for g in &bp.gains {
            assert!(g.feedback.iter().all(|v| v.is_finite()));
            assert!(g.feedforward.iter().all(|v| v.is_finite()));
        }
    }
}
