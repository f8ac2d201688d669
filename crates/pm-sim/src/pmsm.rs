//! PMSM generator bench as a transient model.

use crate::error::{SimError, SimResult};
use crate::model::TransientModel;
use nalgebra::DVector;
use pm_machine::{ParameterSet, PmsmState, TorqueProfile, derivative};

/// Machine + rectifier/battery driven by an external hub torque.
#[derive(Clone, Debug)]
pub struct PmsmModel {
    params: ParameterSet,
    torque: TorqueProfile,
    initial: PmsmState,
}

impl PmsmModel {
    /// Model starting from the zero state.
    pub fn new(params: ParameterSet, torque: TorqueProfile) -> Self {
        Self::with_initial_state(params, torque, PmsmState::ZERO)
    }

    pub fn with_initial_state(
        params: ParameterSet,
        torque: TorqueProfile,
        initial: PmsmState,
    ) -> Self {
        Self {
            params,
            torque,
            initial,
        }
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn torque(&self) -> &TorqueProfile {
        &self.torque
    }
}

impl TransientModel for PmsmModel {
    type State = PmsmState;

    fn initial_state(&self) -> PmsmState {
        self.initial
    }

    fn rhs(&mut self, t: f64, x: &PmsmState) -> SimResult<PmsmState> {
        let dx = derivative(&self.params, &self.torque, t, x);
        if dx.is_finite() {
            Ok(dx)
        } else {
            Err(SimError::NonFinite {
                what: "state derivative",
                t,
            })
        }
    }

    fn add(&self, a: &PmsmState, b: &PmsmState) -> PmsmState {
        PmsmState {
            id_a: a.id_a + b.id_a,
            iq_a: a.iq_a + b.iq_a,
            omega_rad_s: a.omega_rad_s + b.omega_rad_s,
            q_batt_c: a.q_batt_c + b.q_batt_c,
        }
    }

    fn scale(&self, a: &PmsmState, scale: f64) -> PmsmState {
        PmsmState {
            id_a: a.id_a * scale,
            iq_a: a.iq_a * scale,
            omega_rad_s: a.omega_rad_s * scale,
            q_batt_c: a.q_batt_c * scale,
        }
    }

    fn components(&self, x: &PmsmState) -> DVector<f64> {
        DVector::from_row_slice(&x.to_array())
    }

    fn is_finite(&self, x: &PmsmState) -> bool {
        x.is_finite()
    }
}
