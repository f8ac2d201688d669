//! Build runtime simulation objects from a scenario definition.

use crate::ProjectResult;
use crate::schema::{IntegratorDef, ScenarioDef, TorqueProfileDef};
use crate::validate::validate_scenario;
use pm_machine::{BatteryParameters, MotorParameters, ParameterSet, PmsmState, TorqueProfile};
use pm_sim::{IntegratorType, Scenario, SimOptions};
use tracing::debug;

/// Validate a definition and turn it into a runnable [`Scenario`].
///
/// # Errors
/// Returns error on structural/solver problems or non-physical constants.
pub fn compile_scenario(def: &ScenarioDef) -> ProjectResult<Scenario> {
    validate_scenario(def)?;

    let motor = MotorParameters {
        rs_ohm: def.motor.rs_ohm,
        ld_h: def.motor.ld_h,
        lq_h: def.motor.lq_h,
        pole_pairs: def.motor.pole_pairs,
        kv_rpm_per_v: def.motor.kv_rpm_per_v,
        inertia_kg_m2: def.motor.inertia_kg_m2,
        friction_n_m_s: def.motor.friction_n_m_s,
    };
    let battery = BatteryParameters {
        voltage_v: def.battery.voltage_v,
        capacity_ah: def.battery.capacity_ah,
        internal_resistance_ohm: def.battery.internal_resistance_ohm,
        rectifier_efficiency: def.battery.rectifier_efficiency,
    };
    let params = ParameterSet::new(motor, battery)?;

    let torque = compile_torque(&def.torque);
    torque.validate()?;

    let options = SimOptions {
        t_end: def.solver.t_end_s,
        max_step: def.solver.max_step_s,
        min_step: def.solver.min_step_s,
        rtol: def.solver.rtol,
        atol: def.solver.atol,
        max_steps: def.solver.max_steps,
        record_every: def.solver.record_every,
        integrator: compile_integrator(def.solver.method),
    };

    let initial_state = PmsmState {
        id_a: def.initial_state.id_a,
        iq_a: def.initial_state.iq_a,
        omega_rad_s: def.initial_state.omega_rad_s,
        q_batt_c: def.initial_state.q_batt_c,
    };

    debug!(
        name = %def.name,
        flux_linkage_wb = params.flux_linkage(),
        "compiled scenario"
    );

    Ok(Scenario {
        params,
        torque,
        initial_state,
        options,
    })
}

fn compile_torque(def: &TorqueProfileDef) -> TorqueProfile {
    match *def {
        TorqueProfileDef::Step {
            magnitude_n_m,
            t_on_s,
        } => TorqueProfile::Step {
            magnitude_n_m,
            t_on_s,
        },
        TorqueProfileDef::Ramp {
            rate_n_m_per_s,
            max_n_m,
            t_start_s,
        } => TorqueProfile::Ramp {
            rate_n_m_per_s,
            max_n_m,
            t_start_s,
        },
        TorqueProfileDef::Periodic {
            mean_n_m,
            amplitude_n_m,
            frequency_hz,
        } => TorqueProfile::Periodic {
            mean_n_m,
            amplitude_n_m,
            frequency_hz,
        },
    }
}

pub fn compile_integrator(def: IntegratorDef) -> IntegratorType {
    match def {
        IntegratorDef::DormandPrince45 => IntegratorType::DormandPrince45,
        IntegratorDef::RK4 => IntegratorType::RK4,
        IntegratorDef::ForwardEuler => IntegratorType::ForwardEuler,
    }
}
