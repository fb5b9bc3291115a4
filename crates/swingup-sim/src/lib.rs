//! Plant simulation for closed-loop controller evaluation.
//!
//! The simulator integrates a dynamics oracle forward in time while
//! perturbing the sensor/actuator path the way real hardware does: Gaussian
//! measurement noise per state component, torque noise, measurement delay,
//! and reduced actuator responsiveness. All sampling takes an explicit
//! `&mut R: Rng` parameter, so identical seeds reproduce identical runs.

pub mod noise;
pub mod runner;
pub mod simulator;

pub use noise::{NoiseConfig, NoiseConfigError};
pub use runner::{run_closed_loop, ClosedLoopResult};
pub use simulator::{Simulator, SimulatorError};
