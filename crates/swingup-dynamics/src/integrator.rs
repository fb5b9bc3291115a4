//! Explicit time integration of continuous dynamics.

use swingup_core::{ControlVector, Integrator, StateVector};

/// Continuous-time dynamics `x_dot = f(x, u)`.
pub trait ContinuousDynamics {
    /// State derivative at `(x, u)`.
    fn derivative(&self, x: &StateVector, u: &ControlVector) -> StateVector;
}

/// Advance continuous dynamics by one step of `dt` with the given scheme.
///
/// The control is held constant over the step (zero-order hold).
pub fn integrate<D: ContinuousDynamics + ?Sized>(
    scheme: Integrator,
    dynamics: &D,
    x: &StateVector,
    u: &ControlVector,
    dt: f64,
) -> StateVector {
    match scheme {
        Integrator::Euler => x + dynamics.derivative(x, u) * dt,
        Integrator::RungeKutta4 => {
            let k1 = dynamics.derivative(x, u);
            let k2 = dynamics.derivative(&(x + k1 * (dt / 2.0)), u);
            let k3 = dynamics.derivative(&(x + k2 * (dt / 2.0)), u);
            let k4 = dynamics.derivative(&(x + k3 * dt), u);
            x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
        }
    }
}
