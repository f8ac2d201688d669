//! pm-core: numeric foundation for pmsim.
//!
//! Contains:
//! - units (uom SI types, constructors, speed/charge conversions)
//! - numeric (Real + tolerances + float helpers)
//! - timing (opt-in wall-clock timer)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod timing;
pub mod units;

pub use error::{PmError, PmResult};
pub use numeric::*;
pub use units::*;
