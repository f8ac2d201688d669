use thiserror::Error;

pub type PmResult<T> = Result<T, PmError>;

#[derive(Error, Debug)]
pub enum PmError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Value for {what} must be positive, got {value}")]
    NonPositive { what: &'static str, value: f64 },

    #[error("Value for {what} must be non-negative, got {value}")]
    Negative { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
