use thiserror::Error;

/// Top-level error type for the swingup stack.
#[derive(Debug, Error)]
pub enum SwingupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Trajectory error: {0}")]
    Trajectory(#[from] TrajectoryError),

    #[error("Optimizer error: {0}")]
    Ilqr(#[from] IlqrError),
}

/// Configuration errors. Detected eagerly at construction, never at runtime.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid dt: {0} (must be finite and > 0)")]
    InvalidDt(f64),

    #[error("Invalid horizon: {0} (must be >= 1)")]
    InvalidHorizon(usize),

    #[error("Invalid max_iter: {0} (must be >= 1)")]
    InvalidMaxIter(usize),

    #[error("Invalid regularization bounds: min={min}, max={max}, init={init}")]
    InvalidRegularization { min: f64, max: f64, init: f64 },

    #[error("Invalid value for {field}: {value} (must be finite and >= 0)")]
    NegativeWeight { field: &'static str, value: f64 },

    #[error("Invalid torque limit for joint {joint}: {value} (must be finite and >= 0)")]
    InvalidTorqueLimit { joint: usize, value: f64 },
}

/// Trajectory container and file-exchange errors.
#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("Trajectory length mismatch: {states} states, {controls} controls (need states = controls + 1)")]
    LengthMismatch { states: usize, controls: usize },

    #[error("Trajectory is empty")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed trajectory row {row}: expected {expected} numeric columns")]
    MalformedRow { row: usize, expected: usize },
}

/// Recoverable optimizer failures.
///
/// Copy + static payloads for cheap propagation in the iteration loop.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum IlqrError {
    /// Non-finite state encountered during forward simulation.
    #[error("Rollout diverged at step {step}: non-finite state")]
    RolloutDivergence { step: usize },

    /// Regularized control Hessian was not positive definite.
    #[error("Backward pass singular at step {step} (regu = {regu})")]
    BackwardPassSingularity { step: usize, regu: f64 },

    /// No line-search step satisfied the sufficient-decrease test.
    #[error("Line search exhausted: no step size gave sufficient decrease")]
    LineSearchExhausted,

    /// Regularization escalation cap reached without an accepted step.
    #[error("Optimizer failed: regularization retries exhausted")]
    OptimizerFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swingup_error_from_config_error() {
        let err = ConfigError::InvalidDt(-0.005);
        let top: SwingupError = err.into();
        assert!(matches!(top, SwingupError::Config(_)));
        assert!(top.to_string().contains("-0.005"));
    }

    #[test]
    fn swingup_error_from_trajectory_error() {
        let err = TrajectoryError::LengthMismatch {
            states: 5,
            controls: 5,
        };
        let top: SwingupError = err.into();
        assert!(matches!(top, SwingupError::Trajectory(_)));
    }

    #[test]
    fn swingup_error_from_ilqr_error() {
        let err = IlqrError::LineSearchExhausted;
        let top: SwingupError = err.into();
        assert!(matches!(top, SwingupError::Ilqr(_)));
    }

    #[test]
    fn ilqr_error_is_copy() {
        let err = IlqrError::RolloutDivergence { step: 3 };
        let err2 = err; // Copy
        assert_eq!(err, err2);
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ConfigError = io_err.into();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn ilqr_error_display_messages() {
        assert_eq!(
            IlqrError::RolloutDivergence { step: 12 }.to_string(),
            "Rollout diverged at step 12: non-finite state"
        );
        assert_eq!(
            IlqrError::BackwardPassSingularity { step: 4, regu: 0.5 }.to_string(),
            "Backward pass singular at step 4 (regu = 0.5)"
        );
        assert_eq!(
            IlqrError::LineSearchExhausted.to_string(),
            "Line search exhausted: no step size gave sufficient decrease"
        );
        assert_eq!(
            IlqrError::OptimizerFailed.to_string(),
            "Optimizer failed: regularization retries exhausted"
        );
    }

    #[test]
    fn config_error_display_messages() {
        assert_eq!(
            ConfigError::InvalidDt(0.0).to_string(),
            "Invalid dt: 0 (must be finite and > 0)"
        );
        assert_eq!(
            ConfigError::InvalidHorizon(0).to_string(),
            "Invalid horizon: 0 (must be >= 1)"
        );
        assert_eq!(
            ConfigError::InvalidTorqueLimit {
                joint: 1,
                value: -4.0
            }
            .to_string(),
            "Invalid torque limit for joint 1: -4 (must be finite and >= 0)"
        );
    }

    #[test]
    fn trajectory_error_display_messages() {
        assert_eq!(
            TrajectoryError::LengthMismatch {
                states: 3,
                controls: 3
            }
            .to_string(),
            "Trajectory length mismatch: 3 states, 3 controls (need states = controls + 1)"
        );
        assert_eq!(
            TrajectoryError::MalformedRow {
                row: 7,
                expected: 7
            }
            .to_string(),
            "Malformed trajectory row 7: expected 7 numeric columns"
        );
    }
}
