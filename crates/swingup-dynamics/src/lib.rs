//! Dynamics side of the swingup stack: the [`DynamicsOracle`] seam the
//! optimizer differentiates through, explicit integrators, and a concrete
//! double-pendulum plant (acrobot/pendubot by torque-limit convention).

pub mod integrator;
pub mod model;
pub mod oracle;

pub use integrator::{integrate, ContinuousDynamics};
pub use model::{DoublePendulum, DoublePendulumParams};
pub use oracle::{finite_difference_jacobians, DynamicsOracle};
