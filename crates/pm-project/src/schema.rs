//! Scenario file schema.
//!
//! Every section and field is optional; missing values take the bench
//! reference constants, so an empty document describes the reference run.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScenarioDef {
    pub version: u32,
    pub name: String,
    pub motor: MotorDef,
    pub battery: BatteryDef,
    pub torque: TorqueProfileDef,
    pub solver: SolverDef,
    pub initial_state: InitialStateDef,
}

impl Default for ScenarioDef {
    fn default() -> Self {
        Self {
            version: crate::validate::LATEST_VERSION,
            name: "a2212-hub-generator".to_string(),
            motor: MotorDef::default(),
            battery: BatteryDef::default(),
            torque: TorqueProfileDef::default(),
            solver: SolverDef::default(),
            initial_state: InitialStateDef::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MotorDef {
    pub rs_ohm: f64,
    pub ld_h: f64,
    pub lq_h: f64,
    pub pole_pairs: u32,
    pub kv_rpm_per_v: f64,
    pub inertia_kg_m2: f64,
    pub friction_n_m_s: f64,
}

impl Default for MotorDef {
    fn default() -> Self {
        Self {
            rs_ohm: 0.5,
            ld_h: 0.001,
            lq_h: 0.001,
            pole_pairs: 4,
            kv_rpm_per_v: 1000.0,
            inertia_kg_m2: 0.01,
            friction_n_m_s: 1e-3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatteryDef {
    pub voltage_v: f64,
    pub capacity_ah: f64,
    pub internal_resistance_ohm: f64,
    pub rectifier_efficiency: f64,
}

impl Default for BatteryDef {
    fn default() -> Self {
        Self {
            voltage_v: 9.0,
            capacity_ah: 2.0,
            internal_resistance_ohm: 0.05,
            rectifier_efficiency: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TorqueProfileDef {
    Step {
        magnitude_n_m: f64,
        #[serde(default)]
        t_on_s: f64,
    },
    Ramp {
        rate_n_m_per_s: f64,
        max_n_m: f64,
        #[serde(default)]
        t_start_s: f64,
    },
    Periodic {
        mean_n_m: f64,
        amplitude_n_m: f64,
        frequency_hz: f64,
    },
}

impl Default for TorqueProfileDef {
    fn default() -> Self {
        Self::Step {
            magnitude_n_m: 22.0,
            t_on_s: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum IntegratorDef {
    #[default]
    #[serde(rename = "dp45")]
    DormandPrince45,
    #[serde(rename = "rk4")]
    RK4,
    #[serde(rename = "euler")]
    ForwardEuler,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverDef {
    pub method: IntegratorDef,
    pub t_end_s: f64,
    pub max_step_s: f64,
    pub min_step_s: f64,
    pub rtol: f64,
    pub atol: f64,
    pub max_steps: usize,
    pub record_every: usize,
}

impl Default for SolverDef {
    fn default() -> Self {
        Self {
            method: IntegratorDef::default(),
            t_end_s: 5.0,
            max_step_s: 1e-3,
            min_step_s: 1e-12,
            rtol: 1e-3,
            atol: 1e-6,
            max_steps: 1_000_000,
            record_every: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct InitialStateDef {
    pub id_a: f64,
    pub iq_a: f64,
    pub omega_rad_s: f64,
    pub q_batt_c: f64,
}
