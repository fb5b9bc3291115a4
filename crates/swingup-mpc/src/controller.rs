//! The MPC controller: per-tick re-optimization with a stabilization
//! fallback.

use std::time::Duration;

use tracing::{debug, info, warn};

use swingup_core::{
    ConfigError, ControlVector, CostConfig, IlqrError, MpcControllerConfig, StateVector,
    SwingupError, TorqueLimit, Trajectory,
};
use swingup_dynamics::DynamicsOracle;
use swingup_ilqr::{backward_pass, CostModel, Gains, IlqrOptimizer, OptimizerOutcome, Termination};

/// Per-tick diagnostics, refreshed on every [`MpcController::get_control`]
/// call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickStats {
    /// Optimizer iterations spent this tick (0 on stabilization ticks).
    pub iterations: usize,
    /// Wall-clock planning time this tick.
    pub planning_time: Duration,
    /// Whether the tick used the stabilization fallback.
    pub stabilizing: bool,
    /// Whether the per-tick optimization failed and the shifted warm start
    /// was reused.
    pub optimizer_failed: bool,
}

/// Receding-horizon iLQR controller for the two-link pendulum swing-up.
///
/// Construction runs one long-horizon optimization producing the reference
/// trajectory and, via one backward pass over it, the time-varying feedback
/// gains used by the stabilization fallback. Each subsequent
/// [`get_control`](Self::get_control) call re-optimizes a short horizon from
/// the measured state.
#[derive(Debug, Clone)]
pub struct MpcController<D> {
    config: MpcControllerConfig,
    optimizer: IlqrOptimizer<D>,
    limit: TorqueLimit,
    reference: Trajectory,
    stabilization: Vec<Gains>,
    plan: Trajectory,
    regu: f64,
    stats: TickStats,
}

impl<D: DynamicsOracle + Clone> MpcController<D> {
    /// Build a controller by solving the full swing-up problem from `x0`
    /// with the long-horizon init profile.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](swingup_core::ConfigError) variants for
    /// invalid configuration and [`IlqrError::OptimizerFailed`] if the init
    /// optimization produces no usable plan.
    pub fn plan(
        config: MpcControllerConfig,
        cost_config: &CostConfig,
        goal: StateVector,
        plant: D,
        x0: StateVector,
    ) -> Result<Self, SwingupError> {
        config.validate()?;
        let cost = CostModel::new(cost_config, goal, &plant)?;
        let init = IlqrOptimizer::new(config.init_profile(), cost, plant.clone())?;
        let outcome = init.optimize(x0, None);
        if !outcome.succeeded() {
            return Err(SwingupError::Ilqr(IlqrError::OptimizerFailed));
        }
        info!(
            cost = outcome.cost,
            iterations = outcome.iterations,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "initial swing-up trajectory computed"
        );
        Self::with_reference(config, cost_config, goal, plant, outcome.trajectory)
    }

    /// Build a controller around an externally supplied reference trajectory
    /// (e.g. one loaded from CSV).
    ///
    /// # Errors
    ///
    /// Returns configuration errors (including for a reference with no
    /// control intervals), or [`IlqrError::BackwardPassSingularity`] if no
    /// stabilization gains can be computed over the reference even at
    /// maximum regularization.
    pub fn with_reference(
        config: MpcControllerConfig,
        cost_config: &CostConfig,
        goal: StateVector,
        plant: D,
        reference: Trajectory,
    ) -> Result<Self, SwingupError> {
        config.validate()?;
        if reference.horizon() == 0 {
            return Err(SwingupError::Config(ConfigError::InvalidHorizon(0)));
        }
        let cost = CostModel::new(cost_config, goal, &plant)?;
        let stabilization = stabilization_gains(&reference, &cost, &plant, &config)?;
        let optimizer = IlqrOptimizer::new(config.optimizer_profile(), cost, plant)?;

        let mut plan = reference.clone();
        plan.truncate(config.n);

        Ok(Self {
            limit: config.torque_limit(),
            regu: config.regu_init,
            optimizer,
            reference,
            stabilization,
            plan,
            stats: TickStats::default(),
            config,
        })
    }

    /// The reference trajectory the controller tracks.
    #[must_use]
    pub const fn reference(&self) -> &Trajectory {
        &self.reference
    }

    /// The most recent short-horizon plan.
    #[must_use]
    pub const fn current_plan(&self) -> &Trajectory {
        &self.plan
    }

    /// Diagnostics for the last `get_control` call.
    #[must_use]
    pub const fn last_tick(&self) -> &TickStats {
        &self.stats
    }

    /// Compute the control for measured state `x` at time `t`.
    ///
    /// Never fails: optimizer breakdown falls back to the shifted previous
    /// plan, and past the reference horizon the stabilization feedback takes
    /// over. The output is always clipped to the torque limits.
    pub fn get_control(&mut self, x: &StateVector, t: f64) -> ControlVector {
        let tick = (t / self.config.dt).round().max(0.0) as usize;

        if self.config.trajectory_stabilization {
            let remaining = self.reference.horizon().saturating_sub(tick);
            if remaining < self.config.n {
                self.stats = TickStats {
                    stabilizing: true,
                    ..TickStats::default()
                };
                return self.stabilize(x, tick);
            }
        }

        self.plan.shift();
        self.plan.set_first_state(*x);

        let outcome = self
            .optimizer
            .optimize_with_regu(*x, Some(&self.plan), self.regu);
        self.regu = outcome.regu;
        self.record_tick(&outcome);

        match outcome.termination {
            Termination::Failed => {
                warn!(tick, "per-tick optimization failed, reusing shifted plan");
            }
            _ => {
                self.plan = outcome.trajectory;
            }
        }

        self.limit.clip(&self.plan.controls()[0])
    }

    /// Time-varying LQR feedback around the reference trajectory; indices
    /// past the end saturate at the final knot.
    fn stabilize(&self, x: &StateVector, tick: usize) -> ControlVector {
        let idx = tick.min(self.reference.horizon() - 1);
        let u_ref = self.reference.controls()[idx];
        let x_ref = self.reference.states()[idx];
        let u = u_ref + self.stabilization[idx].feedback * (x - x_ref);
        self.limit.clip(&u)
    }

    fn record_tick(&mut self, outcome: &OptimizerOutcome) {
        self.stats = TickStats {
            iterations: outcome.iterations,
            planning_time: outcome.elapsed,
            stabilizing: false,
            optimizer_failed: outcome.termination == Termination::Failed,
        };
        debug!(
            iterations = outcome.iterations,
            cost = outcome.cost,
            regu = outcome.regu,
            elapsed_us = outcome.elapsed.as_micros() as u64,
            "mpc tick"
        );
    }
}

/// One backward pass over the reference, escalating regularization until the
/// control Hessian factors.
fn stabilization_gains<D: DynamicsOracle + ?Sized>(
    reference: &Trajectory,
    cost: &CostModel,
    plant: &D,
    config: &MpcControllerConfig,
) -> Result<Vec<Gains>, SwingupError> {
    let mut regu = config.min_regu;
    loop {
        match backward_pass(reference, cost, plant, regu) {
            Ok(pass) => return Ok(pass.gains),
            Err(err) if regu < config.max_regu => {
                debug!(%err, regu, "stabilization backward pass retry");
                regu = (regu * 2.0).min(config.max_regu);
            }
            Err(err) => return Err(SwingupError::Ilqr(err)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
