//! Scenario validation logic.
//!
//! Checks the file-level structure and solver settings. Physical constants
//! are checked when the parameter set is built.

use crate::schema::{InitialStateDef, ScenarioDef, SolverDef};

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_scenario(scenario: &ScenarioDef) -> Result<(), ValidationError> {
    if scenario.version == 0 || scenario.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    if scenario.name.trim().is_empty() {
        return Err(invalid("name", "", "must not be empty"));
    }

    validate_solver(&scenario.solver)?;
    validate_initial_state(&scenario.initial_state)?;
    Ok(())
}

fn validate_solver(solver: &SolverDef) -> Result<(), ValidationError> {
    if !solver.t_end_s.is_finite() || solver.t_end_s < 0.0 {
        return Err(invalid(
            "solver.t_end_s",
            solver.t_end_s,
            "must be finite and non-negative",
        ));
    }
    if !solver.max_step_s.is_finite() || solver.max_step_s <= 0.0 {
        return Err(invalid("solver.max_step_s", solver.max_step_s, "must be positive"));
    }
    if solver.min_step_s <= 0.0 || solver.min_step_s > solver.max_step_s {
        return Err(invalid(
            "solver.min_step_s",
            solver.min_step_s,
            "must be positive and not exceed max_step_s",
        ));
    }
    if solver.rtol <= 0.0 || solver.rtol.is_nan() {
        return Err(invalid("solver.rtol", solver.rtol, "must be positive"));
    }
    if solver.atol <= 0.0 || solver.atol.is_nan() {
        return Err(invalid("solver.atol", solver.atol, "must be positive"));
    }
    if solver.max_steps == 0 {
        return Err(invalid("solver.max_steps", 0, "must be positive"));
    }
    if solver.record_every == 0 {
        return Err(invalid("solver.record_every", 0, "must be positive"));
    }
    Ok(())
}

fn validate_initial_state(x0: &InitialStateDef) -> Result<(), ValidationError> {
    let fields = [
        ("initial_state.id_a", x0.id_a),
        ("initial_state.iq_a", x0.iq_a),
        ("initial_state.omega_rad_s", x0.omega_rad_s),
        ("initial_state.q_batt_c", x0.q_batt_c),
    ];
    for (field, value) in fields {
        if !value.is_finite() {
            return Err(invalid(field, value, "must be finite"));
        }
    }
    Ok(())
}
