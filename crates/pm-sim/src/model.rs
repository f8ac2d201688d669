//! TransientModel trait for pluggable dynamic systems.

use crate::error::SimResult;
use nalgebra::DVector;

/// Trait for transient (dynamic) system models.
///
/// A TransientModel must implement:
/// - State type (Clone, for snapshots)
/// - Initial state
/// - RHS (right-hand side) computation: x_dot = f(t, x)
/// - Scalar field arithmetic for integration: add states, scale by scalar
/// - A flat view of the state for error norms
pub trait TransientModel {
    /// State type (must be Clone).
    type State: Clone;

    /// Return the initial state at t=0.
    fn initial_state(&self) -> Self::State;

    /// Compute state derivative dxdt = f(t, x).
    ///
    /// Return [`crate::SimError::NonFinite`] when the derivative cannot be
    /// represented; the adaptive driver retries such steps with a smaller `dt`.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Add two states element-wise: result = a + b.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Scale a state by a scalar: result = scale * a.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;

    /// Flatten a state into its components.
    fn components(&self, x: &Self::State) -> DVector<f64>;

    fn is_finite(&self, x: &Self::State) -> bool {
        self.components(x).iter().all(|v| v.is_finite())
    }
}
