//! Error types for simulation operations.

use crate::sim::FailureReason;
use thiserror::Error;

/// Errors encountered during transient simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-finite {what} at t = {t} s")]
    NonFinite { what: &'static str, t: f64 },

    #[error("Integration stopped at t = {t_reached} s of {t_end} s: {reason}")]
    Incomplete {
        t_reached: f64,
        t_end: f64,
        reason: FailureReason,
    },

    #[error("Model error: {0}")]
    Model(#[from] pm_machine::MachineError),

    #[error("Numeric error: {0}")]
    Numeric(#[from] pm_core::PmError),
}

impl SimError {
    /// Whether a smaller step may get past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimError::NonFinite { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;
