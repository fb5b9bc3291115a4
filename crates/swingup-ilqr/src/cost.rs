//! Quadratic running/terminal cost with an optional energy-error term.
//!
//! Running cost: `(x - g)ᵀ Q (x - g) + uᵀ R u + s_cen (E(x) - E(g))²`,
//! terminal cost the same with `Qf`/`f_cen`. Q, R, Qf are diagonal, built
//! from the scalar parameterization in
//! [`CostConfig`](swingup_core::CostConfig). Gradients and Hessians are
//! closed-form; the energy term uses the plant's analytic energy gradient
//! with a Gauss-Newton Hessian.

use nalgebra::Matrix2;

use swingup_core::{
    ConfigError, ControlVector, CostConfig, GainMatrix, StateMatrix, StateVector,
};
use swingup_dynamics::DynamicsOracle;

/// Derivatives of the running cost at one `(x, u)` sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningDerivatives {
    /// ∂c/∂x.
    pub cx: StateVector,
    /// ∂c/∂u.
    pub cu: ControlVector,
    /// ∂²c/∂x².
    pub cxx: StateMatrix,
    /// ∂²c/∂u².
    pub cuu: Matrix2<f64>,
    /// ∂²c/∂u∂x (zero here: no state/control cross terms).
    pub cux: GainMatrix,
}

/// Goal-tracking cost model. Pure: all methods are functions of their inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    q: StateVector,
    r: ControlVector,
    qf: StateVector,
    s_cen: f64,
    f_cen: f64,
    goal: StateVector,
    goal_energy: f64,
}

impl CostModel {
    /// Build a cost model for the given goal state.
    ///
    /// The goal's mechanical energy is captured from the plant so the
    /// energy-error terms compare against it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any weight is negative or non-finite.
    pub fn new<D: DynamicsOracle + ?Sized>(
        config: &CostConfig,
        goal: StateVector,
        plant: &D,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            q: StateVector::new(config.s_cp[0], config.s_cp[1], config.s_cv[0], config.s_cv[1]),
            r: ControlVector::new(config.s_cu[0], config.s_cu[1]),
            qf: StateVector::new(config.f_cp[0], config.f_cp[1], config.f_cv[0], config.f_cv[1]),
            s_cen: config.s_cen,
            f_cen: config.f_cen,
            goal,
            goal_energy: plant.energy(&goal),
        })
    }

    /// The goal state.
    #[must_use]
    pub const fn goal(&self) -> &StateVector {
        &self.goal
    }

    /// Running cost at `(x, u)`.
    pub fn running_cost<D: DynamicsOracle + ?Sized>(
        &self,
        x: &StateVector,
        u: &ControlVector,
        plant: &D,
    ) -> f64 {
        let dx = x - self.goal;
        let state = dx.component_mul(&self.q).dot(&dx);
        let control = u.component_mul(&self.r).dot(u);
        state + control + self.energy_cost(x, plant, self.s_cen)
    }

    /// Terminal cost at `x`.
    pub fn terminal_cost<D: DynamicsOracle + ?Sized>(&self, x: &StateVector, plant: &D) -> f64 {
        let dx = x - self.goal;
        dx.component_mul(&self.qf).dot(&dx) + self.energy_cost(x, plant, self.f_cen)
    }

    /// Gradients and Hessians of the running cost.
    pub fn running_derivatives<D: DynamicsOracle + ?Sized>(
        &self,
        x: &StateVector,
        u: &ControlVector,
        plant: &D,
    ) -> RunningDerivatives {
        let dx = x - self.goal;
        let mut cx = 2.0 * dx.component_mul(&self.q);
        let mut cxx = StateMatrix::from_diagonal(&(2.0 * self.q));
        self.add_energy_derivatives(x, plant, self.s_cen, &mut cx, &mut cxx);
        RunningDerivatives {
            cx,
            cu: 2.0 * u.component_mul(&self.r),
            cxx,
            cuu: Matrix2::from_diagonal(&(2.0 * self.r)),
            cux: GainMatrix::zeros(),
        }
    }

    /// Gradient and Hessian of the terminal cost.
    pub fn terminal_derivatives<D: DynamicsOracle + ?Sized>(
        &self,
        x: &StateVector,
        plant: &D,
    ) -> (StateVector, StateMatrix) {
        let dx = x - self.goal;
        let mut cx = 2.0 * dx.component_mul(&self.qf);
        let mut cxx = StateMatrix::from_diagonal(&(2.0 * self.qf));
        self.add_energy_derivatives(x, plant, self.f_cen, &mut cx, &mut cxx);
        (cx, cxx)
    }

    fn energy_cost<D: DynamicsOracle + ?Sized>(&self, x: &StateVector, plant: &D, w: f64) -> f64 {
        if w == 0.0 {
            return 0.0;
        }
        let de = plant.energy(x) - self.goal_energy;
        w * de * de
    }

    /// Gauss-Newton contribution of `w (E(x) - E_goal)²`.
    fn add_energy_derivatives<D: DynamicsOracle + ?Sized>(
        &self,
        x: &StateVector,
        plant: &D,
        w: f64,
        cx: &mut StateVector,
        cxx: &mut StateMatrix,
    ) {
        if w == 0.0 {
            return;
        }
        let de = plant.energy(x) - self.goal_energy;
        let ge = plant.energy_gradient(x);
        *cx += 2.0 * w * de * ge;
        *cxx += 2.0 * w * ge * ge.transpose();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
