//! Receding-horizon control on top of the iLQR optimizer.
//!
//! The controller plans once over a long horizon, then re-optimizes a short
//! horizon at every tick, warm-started with the previous plan shifted by one
//! step. Near the end of the reference trajectory it hands over to
//! time-varying LQR feedback around the reference, so the output stays
//! well-defined for arbitrarily long runs.

pub mod controller;

pub use controller::{MpcController, TickStats};
