//! The iLQR fixed-point loop: backward + forward passes under an adaptive
//! regularization schedule.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use swingup_core::{
    ConfigError, ControlVector, OptimizerConfig, StateVector, TorqueLimit, Trajectory,
};
use swingup_dynamics::DynamicsOracle;

use crate::backward::{backward_pass, Gains};
use crate::cost::CostModel;
use crate::forward::forward_pass;
use crate::rollout::{rollout, trajectory_cost};

/// Multiplicative regularization increase on backward/forward failure.
const REGU_INCREASE: f64 = 2.0;

/// Multiplicative regularization decrease on an accepted step.
const REGU_DECREASE: f64 = 0.7;

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Per-iteration cost improvement fell below `break_cost_redu`.
    Converged,
    /// Iteration cap reached with improvement still above threshold.
    MaxIterReached,
    /// Regularization saturated without an acceptable step.
    Failed,
}

/// Result of one optimization run.
#[derive(Debug, Clone)]
pub struct OptimizerOutcome {
    /// The best trajectory found (the warm start if no step was accepted).
    pub trajectory: Trajectory,
    /// Gain sequence from the last accepted backward pass; empty if the
    /// optimizer never accepted a step.
    pub gains: Vec<Gains>,
    /// Total cost of `trajectory`.
    pub cost: f64,
    /// Iterations consumed.
    pub iterations: usize,
    /// Why the run stopped.
    pub termination: Termination,
    /// Regularization scalar after the run (carried across MPC ticks).
    pub regu: f64,
    /// Wall-clock time of the whole run, for real-time budget monitoring.
    pub elapsed: Duration,
}

impl OptimizerOutcome {
    /// Whether the run produced a usable plan.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.termination != Termination::Failed
    }
}

/// Iterative LQR trajectory optimizer over a dynamics oracle.
#[derive(Debug, Clone)]
pub struct IlqrOptimizer<D> {
    config: OptimizerConfig,
    cost: CostModel,
    oracle: D,
    limit: TorqueLimit,
}

impl<D: DynamicsOracle> IlqrOptimizer<D> {
    /// Create an optimizer. The configuration is validated eagerly.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid timing, horizon, iteration, or
    /// regularization settings.
    pub fn new(config: OptimizerConfig, cost: CostModel, oracle: D) -> Result<Self, ConfigError> {
        config.validate()?;
        let limit = config.torque_limit();
        Ok(Self {
            config,
            cost,
            oracle,
            limit,
        })
    }

    /// The optimizer configuration.
    #[must_use]
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// The dynamics oracle.
    #[must_use]
    pub const fn oracle(&self) -> &D {
        &self.oracle
    }

    /// The cost model.
    #[must_use]
    pub const fn cost_model(&self) -> &CostModel {
        &self.cost
    }

    /// Optimize from `x0` with the configured initial regularization.
    ///
    /// `warm_start` supplies the initial control sequence; missing or
    /// too-short warm starts are padded with zero controls, longer ones are
    /// truncated to the configured horizon.
    pub fn optimize(&self, x0: StateVector, warm_start: Option<&Trajectory>) -> OptimizerOutcome {
        self.optimize_with_regu(x0, warm_start, self.config.regu_init)
    }

    /// Optimize with an explicit starting regularization (MPC warm state).
    pub fn optimize_with_regu(
        &self,
        x0: StateVector,
        warm_start: Option<&Trajectory>,
        regu_init: f64,
    ) -> OptimizerOutcome {
        let start = Instant::now();
        let mut regu = regu_init.clamp(self.config.min_regu, self.config.max_regu);

        let controls = self.initial_controls(warm_start);
        let mut trajectory = match rollout(x0, &controls, &self.oracle, self.config.dt, &self.limit)
        {
            Ok(t) => t,
            Err(err) => {
                // A diverging warm start is recoverable: retry from rest.
                warn!(%err, "warm-start rollout diverged, falling back to zero controls");
                let zeros = vec![ControlVector::zeros(); self.config.n];
                match rollout(x0, &zeros, &self.oracle, self.config.dt, &self.limit) {
                    Ok(t) => t,
                    Err(err) => {
                        warn!(%err, "zero-control rollout diverged");
                        return OptimizerOutcome {
                            trajectory: Trajectory::hold(x0, self.config.n, self.config.dt),
                            gains: Vec::new(),
                            cost: f64::INFINITY,
                            iterations: 0,
                            termination: Termination::Failed,
                            regu,
                            elapsed: start.elapsed(),
                        };
                    }
                }
            }
        };
        let mut cost = trajectory_cost(&trajectory, &self.cost, &self.oracle);
        let mut gains = Vec::new();
        let mut termination = Termination::MaxIterReached;
        let mut iterations = 0;

        'outer: for iter in 1..=self.config.max_iter {
            iterations = iter;

            // Escalate regularization until a step is accepted or the bound
            // saturates.
            let (new_trajectory, new_cost, new_gains) = loop {
                let attempt = backward_pass(&trajectory, &self.cost, &self.oracle, regu)
                    .and_then(|bp| {
                        // A vanishing model reduction means the current
                        // trajectory is already stationary; a line search
                        // from here cannot meet any decrease test.
                        if bp.expected.full_step().abs() < self.config.break_cost_redu {
                            return Ok(None);
                        }
                        forward_pass(&trajectory, cost, &bp, &self.oracle, &self.cost, &self.limit)
                            .map(|(t, c)| Some((t, c, bp.gains)))
                    });
                match attempt {
                    Ok(Some(accepted)) => break accepted,
                    Ok(None) => {
                        debug!(iter, cost, regu, "expected reduction vanished, converged");
                        termination = Termination::Converged;
                        break 'outer;
                    }
                    Err(err) => {
                        if regu >= self.config.max_regu {
                            debug!(%err, regu, "regularization saturated, giving up");
                            termination = Termination::Failed;
                            break 'outer;
                        }
                        regu = (regu * REGU_INCREASE).min(self.config.max_regu);
                    }
                }
            };

            let improvement = cost - new_cost;
            trajectory = new_trajectory;
            cost = new_cost;
            gains = new_gains;
            regu = (regu * REGU_DECREASE).max(self.config.min_regu);

            debug!(iter, cost, improvement, regu, "iLQR iteration accepted");

            if improvement.abs() < self.config.break_cost_redu {
                termination = Termination::Converged;
                break;
            }
        }

        OptimizerOutcome {
            trajectory,
            gains,
            cost,
            iterations,
            termination,
            regu,
            elapsed: start.elapsed(),
        }
    }

    /// Control sequence for the initial rollout: warm-start controls padded
    /// or truncated to the configured horizon.
    fn initial_controls(&self, warm_start: Option<&Trajectory>) -> Vec<ControlVector> {
        let mut controls = warm_start
            .map(|t| t.controls().to_vec())
            .unwrap_or_default();
        controls.truncate(self.config.n);
        controls.resize(self.config.n, ControlVector::zeros());
        controls
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
