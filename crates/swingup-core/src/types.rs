//! Fixed-dimension state/control types and the [`Trajectory`] container.
//!
//! The double pendulum has a 4-dimensional state `[q1, q2, qd1, qd2]` (joint
//! angles in radians measured from the hanging position, angular velocities
//! in rad/s) and a 2-dimensional control (joint torques in N·m). Angles are
//! never wrapped or normalized here; consumers handle wrap-around explicitly
//! where they need it.

use nalgebra::{Matrix2x4, Matrix4, Matrix4x2, Vector2, Vector4};

use crate::error::TrajectoryError;

/// State dimension: two joint angles + two angular velocities.
pub const STATE_DIM: usize = 4;

/// Control dimension: two joint torques.
pub const CONTROL_DIM: usize = 2;

/// State vector `[q1, q2, qd1, qd2]`.
pub type StateVector = Vector4<f64>;

/// Control vector `[tau1, tau2]` in N·m.
pub type ControlVector = Vector2<f64>;

/// Jacobian of the discrete step map w.r.t. the state (`fx`).
pub type StateMatrix = Matrix4<f64>;

/// Jacobian of the discrete step map w.r.t. the control (`fu`).
pub type InputMatrix = Matrix4x2<f64>;

/// Time-varying feedback gain `K_t` mapping state deviation to control.
pub type GainMatrix = Matrix2x4<f64>;

// ---------------------------------------------------------------------------
// TorqueLimit
// ---------------------------------------------------------------------------

/// Symmetric per-joint torque bounds.
///
/// A zero bound models a passive (unactuated) joint: clipping forces that
/// component to exactly `0.0`. The acrobot is `[0, tau]`, the pendubot
/// `[tau, 0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorqueLimit {
    limits: [f64; 2],
}

impl TorqueLimit {
    /// Create torque limits from per-joint bounds. Bounds must be finite and
    /// non-negative; this is validated by the configuration layer before
    /// construction.
    #[must_use]
    pub const fn new(limits: [f64; 2]) -> Self {
        Self { limits }
    }

    /// Per-joint bound magnitudes.
    #[must_use]
    pub const fn limits(&self) -> [f64; 2] {
        self.limits
    }

    /// Whether the given joint is passive (zero torque bound).
    #[must_use]
    pub fn is_passive(&self, joint: usize) -> bool {
        self.limits[joint] == 0.0
    }

    /// Clip a control vector component-wise to `[-limit, limit]`.
    #[must_use]
    pub fn clip(&self, u: &ControlVector) -> ControlVector {
        ControlVector::new(
            u[0].clamp(-self.limits[0], self.limits[0]),
            u[1].clamp(-self.limits[1], self.limits[1]),
        )
    }
}

// ---------------------------------------------------------------------------
// Trajectory
// ---------------------------------------------------------------------------

/// A discrete-time trajectory: `N + 1` states and `N` controls sampled at a
/// uniform timestep.
///
/// Invariant (checked at construction): `states.len() == controls.len() + 1`.
/// The first state is the start state; `time(i) = i * dt`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    dt: f64,
    states: Vec<StateVector>,
    controls: Vec<ControlVector>,
}

impl Trajectory {
    /// Build a trajectory from matching state/control sequences.
    ///
    /// # Errors
    ///
    /// [`TrajectoryError::Empty`] if `states` is empty,
    /// [`TrajectoryError::LengthMismatch`] if the N+1/N invariant is violated.
    pub fn new(
        dt: f64,
        states: Vec<StateVector>,
        controls: Vec<ControlVector>,
    ) -> Result<Self, TrajectoryError> {
        if states.is_empty() {
            return Err(TrajectoryError::Empty);
        }
        if states.len() != controls.len() + 1 {
            return Err(TrajectoryError::LengthMismatch {
                states: states.len(),
                controls: controls.len(),
            });
        }
        Ok(Self {
            dt,
            states,
            controls,
        })
    }

    /// A trajectory holding `x0` for `n` steps with zero controls.
    ///
    /// Useful as a cold-start guess when no reference is available.
    #[must_use]
    pub fn hold(x0: StateVector, n: usize, dt: f64) -> Self {
        Self {
            dt,
            states: vec![x0; n + 1],
            controls: vec![ControlVector::zeros(); n],
        }
    }

    /// Sample timestep in seconds.
    #[must_use]
    pub const fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of control intervals `N`.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.controls.len()
    }

    /// Time of sample `i` in seconds.
    #[must_use]
    pub fn time(&self, i: usize) -> f64 {
        i as f64 * self.dt
    }

    /// Total duration `N * dt` in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.horizon() as f64 * self.dt
    }

    /// All state samples (length `N + 1`).
    #[must_use]
    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    /// All control samples (length `N`).
    #[must_use]
    pub fn controls(&self) -> &[ControlVector] {
        &self.controls
    }

    /// The first (start) state.
    #[must_use]
    pub fn first_state(&self) -> &StateVector {
        &self.states[0]
    }

    /// The final state.
    #[must_use]
    pub fn final_state(&self) -> &StateVector {
        self.states.last().expect("trajectory is never empty")
    }

    /// Replace the start state, leaving the rest of the guess intact.
    pub fn set_first_state(&mut self, x0: StateVector) {
        self.states[0] = x0;
    }

    /// Shift by one timestep for a receding-horizon warm start: drop the
    /// first state/control and repeat the final state and control.
    ///
    /// The horizon is preserved. A zero-horizon trajectory is left unchanged.
    pub fn shift(&mut self) {
        if self.controls.is_empty() {
            return;
        }
        // After the rotation the old head sits at the back; overwrite it
        // with a repeat of the true tail.
        self.states.rotate_left(1);
        let n = self.states.len();
        self.states[n - 1] = self.states[n - 2];
        if self.controls.len() > 1 {
            self.controls.rotate_left(1);
            let m = self.controls.len();
            self.controls[m - 1] = self.controls[m - 2];
        }
    }

    /// Truncate to the first `n` control intervals (`n + 1` states).
    /// Horizons already at or below `n` are unchanged.
    pub fn truncate(&mut self, n: usize) {
        if self.horizon() > n {
            self.states.truncate(n + 1);
            self.controls.truncate(n);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_trajectory(n: usize) -> Trajectory {
        let states = (0..=n)
            .map(|i| StateVector::repeat(i as f64))
            .collect::<Vec<_>>();
        let controls = (0..n)
            .map(|i| ControlVector::repeat(i as f64 * 0.1))
            .collect::<Vec<_>>();
        Trajectory::new(0.005, states, controls).unwrap()
    }

    // -- TorqueLimit --

    #[test]
    fn clip_respects_symmetric_bounds() {
        let limit = TorqueLimit::new([4.0, 4.0]);
        let u = ControlVector::new(10.0, -7.5);
        let clipped = limit.clip(&u);
        assert_eq!(clipped, ControlVector::new(4.0, -4.0));
    }

    #[test]
    fn clip_passes_through_interior_controls() {
        let limit = TorqueLimit::new([4.0, 4.0]);
        let u = ControlVector::new(1.5, -2.0);
        assert_eq!(limit.clip(&u), u);
    }

    #[test]
    fn zero_limit_forces_exact_zero() {
        let limit = TorqueLimit::new([0.0, 4.0]);
        let clipped = limit.clip(&ControlVector::new(3.0, 2.0));
        assert_eq!(clipped[0], 0.0);
        assert_eq!(clipped[1], 2.0);
        assert!(limit.is_passive(0));
        assert!(!limit.is_passive(1));
    }

    // -- Trajectory invariants --

    #[test]
    fn new_rejects_length_mismatch() {
        let states = vec![StateVector::zeros(); 5];
        let controls = vec![ControlVector::zeros(); 5];
        let err = Trajectory::new(0.005, states, controls).unwrap_err();
        assert!(matches!(err, TrajectoryError::LengthMismatch { .. }));
    }

    #[test]
    fn new_rejects_empty() {
        let err = Trajectory::new(0.005, vec![], vec![]).unwrap_err();
        assert!(matches!(err, TrajectoryError::Empty));
    }

    #[test]
    fn hold_satisfies_invariant() {
        let traj = Trajectory::hold(StateVector::new(0.1, 0.2, 0.0, 0.0), 10, 0.005);
        assert_eq!(traj.horizon(), 10);
        assert_eq!(traj.states().len(), 11);
        assert_eq!(traj.controls().len(), 10);
        assert_eq!(*traj.first_state(), *traj.final_state());
    }

    #[test]
    fn time_and_duration() {
        let traj = ramp_trajectory(100);
        assert!((traj.time(0)).abs() < 1e-12);
        assert!((traj.time(100) - 0.5).abs() < 1e-12);
        assert!((traj.duration() - 0.5).abs() < 1e-12);
    }

    // -- shift --

    #[test]
    fn shift_drops_head_and_repeats_tail() {
        let mut traj = ramp_trajectory(3);
        traj.shift();
        assert_eq!(traj.horizon(), 3);
        // states were [0,1,2,3] -> [1,2,3,3]
        assert_eq!(traj.states()[0], StateVector::repeat(1.0));
        assert_eq!(traj.states()[3], StateVector::repeat(3.0));
        assert_eq!(traj.states()[2], traj.states()[3]);
        // controls were [0.0,0.1,0.2] -> [0.1,0.2,0.2]
        assert_eq!(traj.controls()[0], ControlVector::repeat(0.1));
        assert_eq!(traj.controls()[1], traj.controls()[2]);
    }

    #[test]
    fn shift_preserves_invariant() {
        let mut traj = ramp_trajectory(5);
        for _ in 0..10 {
            traj.shift();
            assert_eq!(traj.states().len(), traj.controls().len() + 1);
        }
    }

    // -- truncate --

    #[test]
    fn truncate_shortens_horizon() {
        let mut traj = ramp_trajectory(10);
        traj.truncate(4);
        assert_eq!(traj.horizon(), 4);
        assert_eq!(traj.states().len(), 5);
    }

    #[test]
    fn truncate_is_noop_when_already_short() {
        let mut traj = ramp_trajectory(3);
        traj.truncate(10);
        assert_eq!(traj.horizon(), 3);
    }
}
