//! Error types for machine model construction.

use pm_core::PmError;
use thiserror::Error;

/// Errors raised while building the machine model.
#[derive(Error, Debug)]
pub enum MachineError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] PmError),

    #[error("Invalid torque profile: {what}")]
    InvalidProfile { what: &'static str },

    #[error("Trajectory has {times} time points but {states} states")]
    SampleMismatch { times: usize, states: usize },
}

pub type MachineResult<T> = Result<T, MachineError>;
