//! Shared foundations for the swingup stack: fixed-dimension state/control
//! types, the [`Trajectory`](types::Trajectory) container, TOML-loadable
//! configuration, the error taxonomy, and trajectory CSV exchange.

pub mod config;
pub mod error;
pub mod io;
pub mod types;

pub use config::{CostConfig, Integrator, MpcControllerConfig, OptimizerConfig};
pub use error::{ConfigError, IlqrError, SwingupError, TrajectoryError};
pub use types::{
    ControlVector, GainMatrix, InputMatrix, StateMatrix, StateVector, TorqueLimit, Trajectory,
    CONTROL_DIM, STATE_DIM,
};
