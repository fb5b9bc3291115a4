//! Double pendulum plant in manipulator form.
//!
//! `M(q) q_dd + C(q, q_d) q_d + G(q) + F(q_d) = tau`, with joint angles
//! measured from the hanging position (so the stable equilibrium is the
//! origin and the swing-up goal is `[pi, 0, 0, 0]`). Inertias `i1`/`i2` are
//! taken about the respective joint axes. Friction combines viscous damping
//! and a smoothly saturated Coulomb term.
//!
//! The acrobot and pendubot are not separate models: the plant is fully
//! actuated and the passive joint emerges from a zero torque bound applied
//! by the callers' clipping, so no actuation branches appear in cost or
//! rollout code.

use nalgebra::{Matrix2, Vector2};

use swingup_core::{ControlVector, Integrator, StateVector};

use crate::integrator::{integrate, ContinuousDynamics};
use crate::oracle::DynamicsOracle;

/// Physical parameters of the two-link pendulum.
///
/// Defaults are the identified parameters of the hardware the original
/// swing-up experiments ran on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoublePendulumParams {
    /// Link masses in kg.
    pub mass: [f64; 2],
    /// Link lengths in m.
    pub length: [f64; 2],
    /// Center-of-mass distances from the joints in m.
    pub com: [f64; 2],
    /// Link inertias about the joint axes in kg·m².
    pub inertia: [f64; 2],
    /// Viscous damping coefficients in N·m·s/rad.
    pub damping: [f64; 2],
    /// Coulomb friction magnitudes in N·m.
    pub coulomb_friction: [f64; 2],
    /// Motor rotor inertia added to each joint in kg·m².
    pub motor_inertia: f64,
    /// Gravitational acceleration in m/s².
    pub gravity: f64,
}

impl Default for DoublePendulumParams {
    fn default() -> Self {
        Self {
            mass: [0.608, 0.630],
            length: [0.3, 0.2],
            com: [0.275, 0.166],
            inertia: [0.0475, 0.0798],
            damping: [0.081, 0.0],
            coulomb_friction: [0.093, 0.186],
            motor_inertia: 0.0,
            gravity: 9.81,
        }
    }
}

impl DoublePendulumParams {
    /// Frictionless variant of these parameters (conserves energy).
    #[must_use]
    pub fn frictionless(mut self) -> Self {
        self.damping = [0.0, 0.0];
        self.coulomb_friction = [0.0, 0.0];
        self
    }
}

// ---------------------------------------------------------------------------
// DoublePendulum
// ---------------------------------------------------------------------------

/// The double pendulum plant, stepped with a fixed integration scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoublePendulum {
    params: DoublePendulumParams,
    integrator: Integrator,
}

impl DoublePendulum {
    /// Create a plant with the given parameters and integration scheme.
    #[must_use]
    pub const fn new(params: DoublePendulumParams, integrator: Integrator) -> Self {
        Self { params, integrator }
    }

    /// Physical parameters.
    #[must_use]
    pub const fn params(&self) -> &DoublePendulumParams {
        &self.params
    }

    /// Mass matrix `M(q)`.
    fn mass_matrix(&self, q2: f64) -> Matrix2<f64> {
        let p = &self.params;
        let c2 = q2.cos();
        let coupling = p.mass[1] * p.length[0] * p.com[1] * c2;
        let m11 =
            p.inertia[0] + p.inertia[1] + p.mass[1] * p.length[0].powi(2) + 2.0 * coupling
                + p.motor_inertia;
        let m12 = p.inertia[1] + coupling;
        let m22 = p.inertia[1] + p.motor_inertia;
        Matrix2::new(m11, m12, m12, m22)
    }

    /// Coriolis/centrifugal torques `C(q, q_d) q_d`.
    fn coriolis(&self, q2: f64, qd: Vector2<f64>) -> Vector2<f64> {
        let p = &self.params;
        let h = p.mass[1] * p.length[0] * p.com[1] * q2.sin();
        Vector2::new(
            -h * qd[1] * (2.0 * qd[0] + qd[1]),
            h * qd[0] * qd[0],
        )
    }

    /// Gravity torques `G(q)` (gradient of the potential energy).
    fn gravity_torques(&self, q1: f64, q2: f64) -> Vector2<f64> {
        let p = &self.params;
        let g = p.gravity;
        let s1 = q1.sin();
        let s12 = (q1 + q2).sin();
        Vector2::new(
            g * (p.mass[0] * p.com[0] + p.mass[1] * p.length[0]) * s1 + g * p.mass[1] * p.com[1] * s12,
            g * p.mass[1] * p.com[1] * s12,
        )
    }

    /// Joint friction: viscous damping plus smooth Coulomb saturation.
    fn friction(&self, qd: Vector2<f64>) -> Vector2<f64> {
        let p = &self.params;
        let coulomb = |v: f64, cf: f64| cf * (100.0 * v).atan() * std::f64::consts::FRAC_2_PI;
        Vector2::new(
            p.damping[0] * qd[0] + coulomb(qd[0], p.coulomb_friction[0]),
            p.damping[1] * qd[1] + coulomb(qd[1], p.coulomb_friction[1]),
        )
    }

    /// Potential energy, zero at the hanging configuration.
    fn potential_energy(&self, q1: f64, q2: f64) -> f64 {
        let p = &self.params;
        let g = p.gravity;
        let h1 = (p.mass[0] * p.com[0] + p.mass[1] * p.length[0]) * (1.0 - q1.cos());
        let h2 = p.mass[1] * p.com[1] * (1.0 - (q1 + q2).cos());
        g * (h1 + h2)
    }

    /// Joint accelerations from the manipulator equation.
    fn accelerations(&self, x: &StateVector, u: &ControlVector) -> Vector2<f64> {
        let qd = Vector2::new(x[2], x[3]);
        let m = self.mass_matrix(x[1]);
        let rhs = u - self.coriolis(x[1], qd) - self.gravity_torques(x[0], x[1]) - self.friction(qd);
        m.lu()
            .solve(&rhs)
            .unwrap_or_else(|| Vector2::new(f64::NAN, f64::NAN))
    }
}

impl ContinuousDynamics for DoublePendulum {
    fn derivative(&self, x: &StateVector, u: &ControlVector) -> StateVector {
        let qdd = self.accelerations(x, u);
        StateVector::new(x[2], x[3], qdd[0], qdd[1])
    }
}

impl DynamicsOracle for DoublePendulum {
    fn step(&self, x: &StateVector, u: &ControlVector, dt: f64) -> StateVector {
        integrate(self.integrator, self, x, u, dt)
    }

    fn energy(&self, x: &StateVector) -> f64 {
        let qd = Vector2::new(x[2], x[3]);
        let kinetic = 0.5 * qd.dot(&(self.mass_matrix(x[1]) * qd));
        kinetic + self.potential_energy(x[0], x[1])
    }

    fn energy_gradient(&self, x: &StateVector) -> StateVector {
        let p = &self.params;
        let qd = Vector2::new(x[2], x[3]);
        let g = self.gravity_torques(x[0], x[1]);
        // dM/dq2 is the only configuration dependence of the mass matrix.
        let h = p.mass[1] * p.length[0] * p.com[1] * x[1].sin();
        let de_dq2 = g[1] - h * (qd[0] * qd[0] + qd[0] * qd[1]);
        let m_qd = self.mass_matrix(x[1]) * qd;
        StateVector::new(g[0], de_dq2, m_qd[0], m_qd[1])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plant() -> DoublePendulum {
        DoublePendulum::new(DoublePendulumParams::default(), Integrator::RungeKutta4)
    }

    fn frictionless_plant() -> DoublePendulum {
        DoublePendulum::new(
            DoublePendulumParams::default().frictionless(),
            Integrator::RungeKutta4,
        )
    }

    #[test]
    fn hanging_state_is_an_equilibrium() {
        let x = StateVector::zeros();
        let u = ControlVector::zeros();
        let xdot = plant().derivative(&x, &u);
        assert_relative_eq!(xdot.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn upright_state_is_an_equilibrium_without_friction() {
        let x = StateVector::new(std::f64::consts::PI, 0.0, 0.0, 0.0);
        let u = ControlVector::zeros();
        let xdot = frictionless_plant().derivative(&x, &u);
        assert_relative_eq!(xdot.norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn gravity_restores_toward_hanging() {
        // Small positive displacement of the first joint: gravity must
        // accelerate it back toward zero.
        let x = StateVector::new(0.1, 0.0, 0.0, 0.0);
        let xdot = frictionless_plant().derivative(&x, &ControlVector::zeros());
        assert!(xdot[2] < 0.0, "qdd1 = {} should be negative", xdot[2]);
    }

    #[test]
    fn torque_accelerates_second_joint() {
        let x = StateVector::zeros();
        let u = ControlVector::new(0.0, 1.0);
        let xdot = plant().derivative(&x, &u);
        assert!(xdot[3] > 0.0, "qdd2 = {} should be positive", xdot[3]);
    }

    #[test]
    fn mass_matrix_is_symmetric_positive_definite() {
        let plant = plant();
        for q2 in [-2.0, -0.5, 0.0, 0.7, 3.0] {
            let m = plant.mass_matrix(q2);
            assert_relative_eq!(m[(0, 1)], m[(1, 0)], epsilon = 1e-15);
            assert!(m.cholesky().is_some(), "M not PD at q2 = {q2}");
        }
    }

    #[test]
    fn energy_is_conserved_without_friction_or_control() {
        let plant = frictionless_plant();
        let mut x = StateVector::new(1.2, -0.4, 0.0, 0.0);
        let u = ControlVector::zeros();
        let e0 = plant.energy(&x);
        for _ in 0..1000 {
            x = plant.step(&x, &u, 0.001);
        }
        let e1 = plant.energy(&x);
        assert_relative_eq!(e1, e0, epsilon = 1e-4);
    }

    #[test]
    fn energy_zero_at_hanging_and_positive_upright() {
        let plant = plant();
        assert_relative_eq!(plant.energy(&StateVector::zeros()), 0.0, epsilon = 1e-15);
        let upright = StateVector::new(std::f64::consts::PI, 0.0, 0.0, 0.0);
        assert!(plant.energy(&upright) > 0.0);
    }

    #[test]
    fn energy_gradient_matches_finite_differences() {
        let plant = frictionless_plant();
        let x = StateVector::new(0.8, -1.1, 2.0, -0.7);
        let grad = plant.energy_gradient(&x);
        for i in 0..4 {
            let h = 1e-6;
            let mut xp = x;
            let mut xm = x;
            xp[i] += h;
            xm[i] -= h;
            let fd = (plant.energy(&xp) - plant.energy(&xm)) / (2.0 * h);
            assert_relative_eq!(grad[i], fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn step_is_deterministic() {
        let plant = plant();
        let x = StateVector::new(0.3, 0.1, -0.5, 0.9);
        let u = ControlVector::new(0.0, 2.0);
        assert_eq!(plant.step(&x, &u, 0.005), plant.step(&x, &u, 0.005));
    }

    #[test]
    fn damping_decays_free_swing() {
        let plant = plant();
        let mut x = StateVector::new(0.5, 0.0, 0.0, 0.0);
        let u = ControlVector::zeros();
        let e0 = plant.energy(&x);
        for _ in 0..2000 {
            x = plant.step(&x, &u, 0.001);
        }
        assert!(plant.energy(&x) < e0);
    }
}
