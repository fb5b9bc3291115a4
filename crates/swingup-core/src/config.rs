use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::TorqueLimit;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_n() -> usize {
    100
}
const fn default_n_init() -> usize {
    1000
}
const fn default_dt() -> f64 {
    0.005
}
const fn default_max_iter() -> usize {
    5
}
const fn default_max_iter_init() -> usize {
    100
}
const fn default_regu_init() -> f64 {
    100.0
}
const fn default_max_regu() -> f64 {
    10_000.0
}
const fn default_min_regu() -> f64 {
    0.01
}
const fn default_break_cost_redu() -> f64 {
    1e-6
}
const fn default_true() -> bool {
    true
}
const fn default_torque_limit() -> [f64; 2] {
    [0.0, 4.0]
}
const fn default_s_cu() -> [f64; 2] {
    [89.0, 89.0]
}
const fn default_s_cp() -> [f64; 2] {
    [40.0, 0.2]
}
const fn default_s_cv() -> [f64; 2] {
    [11.0, 1.0]
}
const fn default_f_cp() -> [f64; 2] {
    [66_000.0, 210_000.0]
}
const fn default_f_cv() -> [f64; 2] {
    [55_000.0, 92_000.0]
}

// ---------------------------------------------------------------------------
// Integrator
// ---------------------------------------------------------------------------

/// Time-integration scheme used by rollouts and the simulator.
///
/// The dynamics oracle's `linearize` differentiates the same discrete map, so
/// Jacobians stay consistent with whichever scheme is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    /// Explicit (forward) Euler.
    Euler,
    /// Classic 4th-order Runge-Kutta.
    #[default]
    #[serde(rename = "runge_kutta")]
    RungeKutta4,
}

// ---------------------------------------------------------------------------
// OptimizerConfig
// ---------------------------------------------------------------------------

/// Configuration for a single iLQR optimization run.
///
/// The MPC controller derives two of these from one
/// [`MpcControllerConfig`]: a long-horizon "init" profile for the offline
/// swing-up solve and a short-horizon profile for per-tick re-planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Horizon: number of control intervals.
    #[serde(default = "default_n")]
    pub n: usize,

    /// Timestep in seconds.
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// Maximum optimizer iterations.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Initial regularization scalar.
    #[serde(default = "default_regu_init")]
    pub regu_init: f64,

    /// Upper regularization bound.
    #[serde(default = "default_max_regu")]
    pub max_regu: f64,

    /// Lower regularization bound.
    #[serde(default = "default_min_regu")]
    pub min_regu: f64,

    /// Convergence threshold on per-iteration cost improvement.
    #[serde(default = "default_break_cost_redu")]
    pub break_cost_redu: f64,

    /// Integration scheme.
    #[serde(default)]
    pub integrator: Integrator,

    /// Per-joint torque bounds; zero marks a passive joint.
    #[serde(default = "default_torque_limit")]
    pub torque_limit: [f64; 2],
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            n: default_n(),
            dt: default_dt(),
            max_iter: default_max_iter(),
            regu_init: default_regu_init(),
            max_regu: default_max_regu(),
            min_regu: default_min_regu(),
            break_cost_redu: default_break_cost_redu(),
            integrator: Integrator::default(),
            torque_limit: default_torque_limit(),
        }
    }
}

impl OptimizerConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidDt(self.dt));
        }
        if self.n == 0 {
            return Err(ConfigError::InvalidHorizon(self.n));
        }
        if self.max_iter == 0 {
            return Err(ConfigError::InvalidMaxIter(self.max_iter));
        }
        let regu_ok = self.min_regu > 0.0
            && self.max_regu >= self.min_regu
            && self.regu_init >= self.min_regu
            && self.regu_init <= self.max_regu
            && self.min_regu.is_finite()
            && self.max_regu.is_finite();
        if !regu_ok {
            return Err(ConfigError::InvalidRegularization {
                min: self.min_regu,
                max: self.max_regu,
                init: self.regu_init,
            });
        }
        if !self.break_cost_redu.is_finite() || self.break_cost_redu < 0.0 {
            return Err(ConfigError::NegativeWeight {
                field: "break_cost_redu",
                value: self.break_cost_redu,
            });
        }
        for (joint, &tl) in self.torque_limit.iter().enumerate() {
            if !tl.is_finite() || tl < 0.0 {
                return Err(ConfigError::InvalidTorqueLimit { joint, value: tl });
            }
        }
        Ok(())
    }

    /// Torque bounds as a clipping helper.
    #[must_use]
    pub const fn torque_limit(&self) -> TorqueLimit {
        TorqueLimit::new(self.torque_limit)
    }
}

// ---------------------------------------------------------------------------
// MpcControllerConfig
// ---------------------------------------------------------------------------

/// Full MPC controller configuration: the per-tick optimizer profile plus the
/// one-shot init profile and the stabilization-fallback switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpcControllerConfig {
    /// Per-tick (MPC) horizon.
    #[serde(default = "default_n")]
    pub n: usize,

    /// Horizon for the initial full swing-up optimization.
    #[serde(default = "default_n_init")]
    pub n_init: usize,

    /// Control timestep in seconds.
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// Per-tick iteration cap.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Iteration cap for the initial optimization.
    #[serde(default = "default_max_iter_init")]
    pub max_iter_init: usize,

    /// Initial regularization scalar (reset at controller construction).
    #[serde(default = "default_regu_init")]
    pub regu_init: f64,

    /// Upper regularization bound.
    #[serde(default = "default_max_regu")]
    pub max_regu: f64,

    /// Lower regularization bound.
    #[serde(default = "default_min_regu")]
    pub min_regu: f64,

    /// Convergence threshold on per-iteration cost improvement.
    #[serde(default = "default_break_cost_redu")]
    pub break_cost_redu: f64,

    /// Switch to time-varying LQR feedback around the reference trajectory
    /// once the remaining reference horizon is shorter than `n`.
    #[serde(default = "default_true")]
    pub trajectory_stabilization: bool,

    /// Integration scheme.
    #[serde(default)]
    pub integrator: Integrator,

    /// Per-joint torque bounds; zero marks a passive joint.
    #[serde(default = "default_torque_limit")]
    pub torque_limit: [f64; 2],
}

impl Default for MpcControllerConfig {
    fn default() -> Self {
        Self {
            n: default_n(),
            n_init: default_n_init(),
            dt: default_dt(),
            max_iter: default_max_iter(),
            max_iter_init: default_max_iter_init(),
            regu_init: default_regu_init(),
            max_regu: default_max_regu(),
            min_regu: default_min_regu(),
            break_cost_redu: default_break_cost_redu(),
            trajectory_stabilization: default_true(),
            integrator: Integrator::default(),
            torque_limit: default_torque_limit(),
        }
    }
}

impl MpcControllerConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_init == 0 {
            return Err(ConfigError::InvalidHorizon(self.n_init));
        }
        if self.max_iter_init == 0 {
            return Err(ConfigError::InvalidMaxIter(self.max_iter_init));
        }
        self.optimizer_profile().validate()
    }

    /// The per-tick optimizer profile.
    #[must_use]
    pub fn optimizer_profile(&self) -> OptimizerConfig {
        OptimizerConfig {
            n: self.n,
            dt: self.dt,
            max_iter: self.max_iter,
            regu_init: self.regu_init,
            max_regu: self.max_regu,
            min_regu: self.min_regu,
            break_cost_redu: self.break_cost_redu,
            integrator: self.integrator,
            torque_limit: self.torque_limit,
        }
    }

    /// The one-shot init profile (long horizon, large iteration cap).
    #[must_use]
    pub fn init_profile(&self) -> OptimizerConfig {
        OptimizerConfig {
            n: self.n_init,
            max_iter: self.max_iter_init,
            ..self.optimizer_profile()
        }
    }

    /// Torque bounds as a clipping helper.
    #[must_use]
    pub const fn torque_limit(&self) -> TorqueLimit {
        TorqueLimit::new(self.torque_limit)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// CostConfig
// ---------------------------------------------------------------------------

/// Scalar cost parameterization.
///
/// `s_*` weights shape the running cost (`s_cu` control, `s_cp` position,
/// `s_cv` velocity, `s_cen` energy error), `f_*` the terminal cost. All
/// weights are diagonal entries and must be non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostConfig {
    /// Running control cost diagonal (R).
    #[serde(default = "default_s_cu")]
    pub s_cu: [f64; 2],

    /// Running position cost diagonal (Q, first two entries).
    #[serde(default = "default_s_cp")]
    pub s_cp: [f64; 2],

    /// Running velocity cost diagonal (Q, last two entries).
    #[serde(default = "default_s_cv")]
    pub s_cv: [f64; 2],

    /// Running energy-error weight.
    #[serde(default)]
    pub s_cen: f64,

    /// Terminal position cost diagonal (Qf, first two entries).
    #[serde(default = "default_f_cp")]
    pub f_cp: [f64; 2],

    /// Terminal velocity cost diagonal (Qf, last two entries).
    #[serde(default = "default_f_cv")]
    pub f_cv: [f64; 2],

    /// Terminal energy-error weight.
    #[serde(default)]
    pub f_cen: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            s_cu: default_s_cu(),
            s_cp: default_s_cp(),
            s_cv: default_s_cv(),
            s_cen: 0.0,
            f_cp: default_f_cp(),
            f_cv: default_f_cv(),
            f_cen: 0.0,
        }
    }
}

impl CostConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields: [(&'static str, &[f64]); 7] = [
            ("s_cu", &self.s_cu),
            ("s_cp", &self.s_cp),
            ("s_cv", &self.s_cv),
            ("s_cen", std::slice::from_ref(&self.s_cen)),
            ("f_cp", &self.f_cp),
            ("f_cv", &self.f_cv),
            ("f_cen", std::slice::from_ref(&self.f_cen)),
        ];
        for (field, values) in fields {
            for &value in values {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::NegativeWeight { field, value });
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(MpcControllerConfig::default().validate().is_ok());
        assert!(OptimizerConfig::default().validate().is_ok());
        assert!(CostConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_dt() {
        let config = OptimizerConfig {
            dt: 0.0,
            ..OptimizerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDt(_))
        ));
        let config = OptimizerConfig {
            dt: f64::NAN,
            ..OptimizerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_horizon() {
        let config = OptimizerConfig {
            n: 0,
            ..OptimizerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHorizon(0))
        ));
    }

    #[test]
    fn rejects_zero_iterations() {
        let config = OptimizerConfig {
            max_iter: 0,
            ..OptimizerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_regularization_bounds() {
        let config = OptimizerConfig {
            min_regu: 10.0,
            max_regu: 1.0,
            regu_init: 5.0,
            ..OptimizerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRegularization { .. })
        ));
    }

    #[test]
    fn rejects_regu_init_outside_bounds() {
        let config = OptimizerConfig {
            regu_init: 1e9,
            ..OptimizerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_torque_limit() {
        let config = OptimizerConfig {
            torque_limit: [0.0, -4.0],
            ..OptimizerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTorqueLimit { joint: 1, .. })
        ));
    }

    #[test]
    fn rejects_negative_cost_weight() {
        let config = CostConfig {
            s_cp: [-1.0, 0.2],
            ..CostConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeWeight { field: "s_cp", .. })
        ));
    }

    #[test]
    fn mpc_config_rejects_zero_init_horizon() {
        let config = MpcControllerConfig {
            n_init: 0,
            ..MpcControllerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn profiles_share_common_fields() {
        let config = MpcControllerConfig::default();
        let tick = config.optimizer_profile();
        let init = config.init_profile();
        assert_eq!(tick.n, config.n);
        assert_eq!(init.n, config.n_init);
        assert_eq!(init.max_iter, config.max_iter_init);
        assert_eq!(tick.dt, init.dt);
        assert_eq!(tick.torque_limit, init.torque_limit);
    }

    #[test]
    fn integrator_parses_from_toml() {
        let toml_str = r#"
            n = 50
            dt = 0.01
            integrator = "runge_kutta"
        "#;
        let config: MpcControllerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.integrator, Integrator::RungeKutta4);
        assert_eq!(config.n, 50);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.n_init, 1000);

        let toml_str = r#"integrator = "euler""#;
        let config: MpcControllerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.integrator, Integrator::Euler);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = MpcControllerConfig {
            n: 42,
            torque_limit: [4.0, 0.0],
            trajectory_stabilization: false,
            ..MpcControllerConfig::default()
        };
        let text = toml::to_string(&config).unwrap();
        let back: MpcControllerConfig = toml::from_str(&text).unwrap();
        assert_eq!(config, back);
    }
}
