//! Forward simulation of a dynamics oracle with a perturbed sensor/actuator
//! path.

use std::collections::VecDeque;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use swingup_core::{ConfigError, ControlVector, StateVector, TorqueLimit};
use swingup_dynamics::DynamicsOracle;

use crate::noise::{NoiseConfig, NoiseConfigError};

/// Construction errors for [`Simulator`].
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    /// Invalid timestep.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Invalid perturbation parameters.
    #[error(transparent)]
    Noise(#[from] NoiseConfigError),
}

/// Plant simulator with measurement noise, torque noise, measurement delay,
/// and actuator responsiveness scaling.
///
/// The true state is held internally; [`measure`](Self::measure) exposes the
/// delayed, noise-corrupted view a controller would see on hardware.
#[derive(Debug, Clone)]
pub struct Simulator<D> {
    plant: D,
    dt: f64,
    limit: TorqueLimit,
    noise: NoiseConfig,
    state: StateVector,
    time: f64,
    // Past true states; front is the oldest retained sample.
    history: VecDeque<StateVector>,
}

impl<D: DynamicsOracle> Simulator<D> {
    /// Create a simulator starting at `x0`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError`] for a non-positive `dt` or invalid
    /// perturbation parameters.
    pub fn new(
        plant: D,
        dt: f64,
        limit: TorqueLimit,
        noise: NoiseConfig,
        x0: StateVector,
    ) -> Result<Self, SimulatorError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(ConfigError::InvalidDt(dt).into());
        }
        noise.validate()?;
        let mut history = VecDeque::with_capacity(noise.delay_steps + 1);
        history.push_back(x0);
        Ok(Self {
            plant,
            dt,
            limit,
            noise,
            state: x0,
            time: 0.0,
            history,
        })
    }

    /// The true (noise-free) current state.
    #[must_use]
    pub const fn state(&self) -> &StateVector {
        &self.state
    }

    /// Elapsed simulation time in seconds.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// The simulation timestep.
    #[must_use]
    pub const fn dt(&self) -> f64 {
        self.dt
    }

    /// Reset to `x0` at time zero, clearing the delay buffer.
    pub fn reset(&mut self, x0: StateVector) {
        self.state = x0;
        self.time = 0.0;
        self.history.clear();
        self.history.push_back(x0);
    }

    /// Measure the state as a sensor would: delayed by `delay_steps` control
    /// steps (saturating at the start of the run) with per-component
    /// Gaussian noise.
    pub fn measure<R: Rng>(&self, rng: &mut R) -> StateVector {
        let mut measured = *self.history.front().unwrap_or(&self.state);
        for (component, &sigma) in measured.iter_mut().zip(&self.noise.meas_noise_sigmas) {
            *component += gaussian(sigma, rng);
        }
        measured
    }

    /// Advance one step under commanded torque `u`.
    ///
    /// The command is scaled by the actuator responsiveness, perturbed by
    /// torque noise, and clipped to the torque limits before it reaches the
    /// plant. Returns the new true state.
    pub fn step<R: Rng>(&mut self, u: &ControlVector, rng: &mut R) -> StateVector {
        let mut applied = self.noise.u_responsiveness * u;
        for component in applied.iter_mut() {
            *component += gaussian(self.noise.u_noise_sigma, rng);
        }
        let applied = self.limit.clip(&applied);

        self.state = self.plant.step(&self.state, &applied, self.dt);
        self.time += self.dt;

        self.history.push_back(self.state);
        if self.history.len() > self.noise.delay_steps + 1 {
            self.history.pop_front();
        }
        self.state
    }
}

/// One sample of `N(0, sigma²)`; exactly zero when `sigma == 0`, keeping
/// ideal runs bit-for-bit deterministic without consuming RNG state.
fn gaussian<R: Rng>(sigma: f64, rng: &mut R) -> f64 {
    if sigma == 0.0 {
        return 0.0;
    }
    // Sigma was validated finite and positive, so the distribution exists.
    Normal::new(0.0, sigma).map_or(0.0, |dist| dist.sample(rng))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
