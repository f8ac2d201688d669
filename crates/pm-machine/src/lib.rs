//! Permanent-magnet synchronous machine model.
//!
//! Provides:
//! - Motor and battery parameter sets with validation
//! - External hub torque profiles (step, ramp, periodic)
//! - The d/q-frame state derivative for machine + rectifier/battery load
//! - Post-processing of a state trajectory into torque, current and speed series

pub mod derived;
pub mod dynamics;
pub mod error;
pub mod params;
pub mod torque;

pub use derived::{DerivedSeries, PlotSeries, RunSummary};
pub use dynamics::{OperatingPoint, PmsmState, derivative, operating_point};
pub use error::{MachineError, MachineResult};
pub use params::{BatteryParameters, MotorParameters, ParameterSet};
pub use torque::TorqueProfile;
