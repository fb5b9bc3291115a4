//! Sensor/actuator perturbation configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for perturbation parameters.
///
/// Implements [`Copy`] for cheap propagation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NoiseConfigError {
    /// A noise standard deviation was negative, NaN, or infinite.
    #[error("{field} must be finite and >= 0, got {value}")]
    InvalidSigma {
        /// Offending configuration field.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// Actuator responsiveness outside `(0, 1]`.
    #[error("u_responsiveness must be in (0, 1], got {0}")]
    InvalidResponsiveness(f64),
}

const fn default_responsiveness() -> f64 {
    1.0
}

/// Perturbations applied between the plant and the controller.
///
/// The default configuration is an ideal loop: no noise, no delay, full
/// actuator responsiveness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Gaussian measurement noise, one standard deviation per state
    /// component `[q1, q2, qd1, qd2]`.
    #[serde(default)]
    pub meas_noise_sigmas: [f64; 4],

    /// Gaussian torque noise standard deviation, applied per joint.
    #[serde(default)]
    pub u_noise_sigma: f64,

    /// Measurement delay in control steps.
    #[serde(default)]
    pub delay_steps: usize,

    /// Actuator responsiveness: commanded torque is scaled by this factor
    /// before it reaches the plant. `1.0` is ideal.
    #[serde(default = "default_responsiveness")]
    pub u_responsiveness: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            meas_noise_sigmas: [0.0; 4],
            u_noise_sigma: 0.0,
            delay_steps: 0,
            u_responsiveness: default_responsiveness(),
        }
    }
}

impl NoiseConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), NoiseConfigError> {
        for &sigma in &self.meas_noise_sigmas {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(NoiseConfigError::InvalidSigma {
                    field: "meas_noise_sigmas",
                    value: sigma,
                });
            }
        }
        if !self.u_noise_sigma.is_finite() || self.u_noise_sigma < 0.0 {
            return Err(NoiseConfigError::InvalidSigma {
                field: "u_noise_sigma",
                value: self.u_noise_sigma,
            });
        }
        if !self.u_responsiveness.is_finite()
            || self.u_responsiveness <= 0.0
            || self.u_responsiveness > 1.0
        {
            return Err(NoiseConfigError::InvalidResponsiveness(
                self.u_responsiveness,
            ));
        }
        Ok(())
    }

    /// Whether any perturbation is active.
    #[must_use]
    pub fn is_ideal(&self) -> bool {
        self.meas_noise_sigmas.iter().all(|&s| s == 0.0)
            && self.u_noise_sigma == 0.0
            && self.delay_steps == 0
            && self.u_responsiveness == 1.0
    }
}
