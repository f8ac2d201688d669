//! Transient simulation of the PMSM generator bench.
//!
//! Provides:
//! - `TransientModel` trait for pluggable ODE systems
//! - Adaptive Dormand-Prince 5(4) integrator with step-size control
//! - Fixed-step RK4 and forward Euler integrators
//! - Simulation driver with explicit completion/failure status
//! - PMSM model adapter and one-call scenario runner

pub mod error;
pub mod integrator;
pub mod model;
pub mod pmsm;
pub mod scenario;
pub mod sim;

pub use error::{SimError, SimResult};
pub use integrator::{DormandPrince45, ForwardEuler, Integrator, RK4};
pub use model::TransientModel;
pub use pmsm::PmsmModel;
pub use scenario::{Scenario, ScenarioOutput, run_scenario, run_scenario_with_progress};
pub use sim::{
    FailureReason, IntegratorType, SimOptions, SimProgress, SimRecord, SimStats, SimStatus,
    run_sim, run_sim_with_progress,
};
