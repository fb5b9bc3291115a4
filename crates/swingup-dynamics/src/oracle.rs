//! The dynamics seam consumed by the optimizer and controller.

use swingup_core::{ControlVector, InputMatrix, StateMatrix, StateVector, STATE_DIM};

/// Discrete-time dynamics oracle.
///
/// Implementations must be deterministic for identical inputs — the backward
/// pass differentiates the same map the rollout integrates, and any internal
/// randomness would break gradient consistency.
pub trait DynamicsOracle {
    /// Discrete step map `x_{k+1} = f(x_k, u_k, dt)`.
    fn step(&self, x: &StateVector, u: &ControlVector, dt: f64) -> StateVector;

    /// Jacobians `(fx, fu)` of the discrete step map.
    ///
    /// The default central-finite-difference implementation is consistent
    /// with [`step`](Self::step) by construction; plants with analytic
    /// derivatives may override it.
    fn linearize(&self, x: &StateVector, u: &ControlVector, dt: f64) -> (StateMatrix, InputMatrix) {
        finite_difference_jacobians(self, x, u, dt)
    }

    /// Total mechanical energy at state `x`.
    ///
    /// Only consulted when an energy-error cost weight is nonzero; the
    /// default of `0.0` turns that term into a constant.
    fn energy(&self, _x: &StateVector) -> f64 {
        0.0
    }

    /// Gradient of [`energy`](Self::energy) w.r.t. the state.
    fn energy_gradient(&self, _x: &StateVector) -> StateVector {
        StateVector::zeros()
    }
}

/// Central finite differences of the discrete step map.
///
/// Step size scales with the magnitude of the perturbed component so the
/// approximation stays well-conditioned across the swing-up's large angle and
/// velocity ranges.
pub fn finite_difference_jacobians<D: DynamicsOracle + ?Sized>(
    dynamics: &D,
    x: &StateVector,
    u: &ControlVector,
    dt: f64,
) -> (StateMatrix, InputMatrix) {
    let mut fx = StateMatrix::zeros();
    let mut fu = InputMatrix::zeros();

    for i in 0..STATE_DIM {
        let h = 1e-6 * (1.0 + x[i].abs());
        let mut xp = *x;
        let mut xm = *x;
        xp[i] += h;
        xm[i] -= h;
        let df = (dynamics.step(&xp, u, dt) - dynamics.step(&xm, u, dt)) / (2.0 * h);
        fx.set_column(i, &df);
    }

    for j in 0..2 {
        let h = 1e-6 * (1.0 + u[j].abs());
        let mut up = *u;
        let mut um = *u;
        up[j] += h;
        um[j] -= h;
        let df = (dynamics.step(x, &up, dt) - dynamics.step(x, &um, dt)) / (2.0 * h);
        fu.set_column(j, &df);
    }

    (fx, fu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Linear map x' = A x + B u, for which finite differences are exact up
    /// to rounding.
    struct LinearPlant {
        a: StateMatrix,
        b: InputMatrix,
    }

    impl DynamicsOracle for LinearPlant {
        fn step(&self, x: &StateVector, u: &ControlVector, _dt: f64) -> StateVector {
            self.a * x + self.b * u
        }
    }

    #[test]
    fn finite_differences_recover_linear_jacobians() {
        let a = StateMatrix::new(
            1.0, 0.1, 0.0, 0.0, //
            0.0, 1.0, 0.1, 0.0, //
            0.0, 0.0, 1.0, 0.1, //
            -0.2, 0.0, 0.0, 1.0,
        );
        let b = InputMatrix::new(
            0.0, 0.0, //
            0.1, 0.0, //
            0.0, 0.1, //
            0.05, 0.05,
        );
        let plant = LinearPlant { a, b };
        let x = StateVector::new(0.3, -1.2, 4.0, 0.0);
        let u = ControlVector::new(2.0, -3.0);

        let (fx, fu) = plant.linearize(&x, &u, 0.005);
        assert_relative_eq!((fx - a).norm(), 0.0, epsilon = 1e-6);
        assert_relative_eq!((fu - b).norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn default_energy_is_zero() {
        let plant = LinearPlant {
            a: StateMatrix::identity(),
            b: InputMatrix::zeros(),
        };
        let x = StateVector::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(plant.energy(&x), 0.0);
        assert_eq!(plant.energy_gradient(&x), StateVector::zeros());
    }
}
