//! Iterative LQR trajectory optimization.
//!
//! The optimizer alternates two passes over a nominal trajectory:
//!
//! 1. **Backward pass** — backpropagates a local quadratic value-function
//!    approximation through the linearized dynamics, producing time-varying
//!    feedback/feedforward gains, with a regularization scalar keeping the
//!    control Hessian positive definite.
//! 2. **Forward pass** — rolls out the new policy with a backtracking line
//!    search and accepts the first step size passing an Armijo
//!    sufficient-decrease test.
//!
//! Regularization adapts between iterations: it grows on failure (shrinking
//! the step toward gradient descent) and shrinks on success (approaching a
//! full Newton step).

pub mod backward;
pub mod cost;
pub mod forward;
pub mod optimizer;
pub mod rollout;

pub use backward::{backward_pass, BackwardPass, ExpectedReduction, Gains};
pub use cost::{CostModel, RunningDerivatives};
pub use forward::forward_pass;
pub use optimizer::{IlqrOptimizer, OptimizerOutcome, Termination};
pub use rollout::{rollout, trajectory_cost};
