//! d/q-frame machine dynamics with a rectified battery load.

use crate::params::ParameterSet;
use crate::torque::TorqueProfile;

/// State of the machine and battery.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PmsmState {
    /// d-axis current (A)
    pub id_a: f64,
    /// q-axis current (A)
    pub iq_a: f64,
    /// Rotor mechanical speed (rad/s)
    pub omega_rad_s: f64,
    /// Charge delivered to the battery (A·s)
    pub q_batt_c: f64,
}

impl PmsmState {
    pub const ZERO: Self = Self {
        id_a: 0.0,
        iq_a: 0.0,
        omega_rad_s: 0.0,
        q_batt_c: 0.0,
    };

    /// Components in `[id, iq, ω, q_batt]` order.
    pub fn to_array(&self) -> [f64; 4] {
        [self.id_a, self.iq_a, self.omega_rad_s, self.q_batt_c]
    }

    pub fn from_array(x: [f64; 4]) -> Self {
        Self {
            id_a: x[0],
            iq_a: x[1],
            omega_rad_s: x[2],
            q_batt_c: x[3],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Algebraic quantities at one state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OperatingPoint {
    /// d-axis terminal voltage (V)
    pub vd: f64,
    /// q-axis terminal voltage (V)
    pub vq: f64,
    /// Electromagnetic torque Te (N·m)
    pub te: f64,
    /// DC-link current Idc (A)
    pub idc: f64,
    /// Battery current after the rectifier (A)
    pub ibat: f64,
}

/// Terminal voltages, torque and load currents at `state`.
///
/// ```text
/// vd   = Rs·id − ω·Ld·iq
/// vq   = Rs·iq + ω·Ld·id + ω·λ_m
/// Te   = 1.5·p·λ_m·iq
/// Idc  = 1.5·iq
/// Ibat = Idc·η
/// ```
pub fn operating_point(params: &ParameterSet, state: &PmsmState) -> OperatingPoint {
    let motor = params.motor();
    let lambda_m = params.flux_linkage();
    let PmsmState {
        id_a: id,
        iq_a: iq,
        omega_rad_s: omega,
        ..
    } = *state;

    let vd = motor.rs_ohm * id - omega * motor.ld_h * iq;
    let vq = motor.rs_ohm * iq + omega * motor.ld_h * id + omega * lambda_m;

    let te = 1.5 * f64::from(motor.pole_pairs) * lambda_m * iq;
    let idc = 1.5 * iq;
    let ibat = idc * params.battery().rectifier_efficiency;

    OperatingPoint {
        vd,
        vq,
        te,
        idc,
        ibat,
    }
}

/// State derivative `dx/dt = f(t, x)`.
///
/// ```text
/// d(id)/dt     = (vd − Rs·id + ω·Lq·iq) / Ld
/// d(iq)/dt     = (vq − Rs·iq − ω·Ld·id) / Lq
/// d(ω)/dt      = (T_hub(t, ω) − Te − B·ω) / J
/// d(q_batt)/dt = Ibat
/// ```
///
/// The terminal voltages are built from the same resistive and cross-coupling
/// terms the current equations subtract, so those terms cancel: `d(id)/dt`
/// reduces to `ω·iq·(Lq − Ld)/Ld` and `d(iq)/dt` to `ω·λ_m/Lq`. The
/// unreduced form is evaluated so that `Ld ≠ Lq` keeps its coupling.
pub fn derivative(
    params: &ParameterSet,
    torque: &TorqueProfile,
    t: f64,
    state: &PmsmState,
) -> PmsmState {
    let motor = params.motor();
    let op = operating_point(params, state);
    let PmsmState {
        id_a: id,
        iq_a: iq,
        omega_rad_s: omega,
        ..
    } = *state;

    let did_dt = (op.vd - motor.rs_ohm * id + omega * motor.lq_h * iq) / motor.ld_h;
    let diq_dt = (op.vq - motor.rs_ohm * iq - omega * motor.ld_h * id) / motor.lq_h;

    let t_hub = torque.torque(t, omega);
    let domega_dt = (t_hub - op.te - motor.friction_n_m_s * omega) / motor.inertia_kg_m2;

    PmsmState {
        id_a: did_dt,
        iq_a: diq_dt,
        omega_rad_s: domega_dt,
        q_batt_c: op.ibat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{BatteryParameters, MotorParameters};
    use pm_core::{Tolerances, nearly_equal};

    fn reference() -> (ParameterSet, TorqueProfile) {
        (ParameterSet::reference().unwrap(), TorqueProfile::hub_step())
    }

    #[test]
    fn zero_state_at_start_has_zero_acceleration() {
        let (params, torque) = reference();
        let dx = derivative(&params, &torque, 0.0, &PmsmState::ZERO);
        assert_eq!(dx, PmsmState::ZERO);
    }

    #[test]
    fn acceleration_just_after_start() {
        let (params, torque) = reference();
        let dx = derivative(&params, &torque, 1e-9, &PmsmState::ZERO);
        // (22 − 0 − 0) / 0.01
        assert!((dx.omega_rad_s - 2200.0).abs() < 1e-9);
    }

    #[test]
    fn d_axis_current_stays_put_with_equal_inductances() {
        let (params, torque) = reference();
        for (iq, omega) in [(0.0, 0.0), (3.0, 100.0), (-7.5, 2500.0), (400.0, 8000.0)] {
            let state = PmsmState {
                id_a: 0.0,
                iq_a: iq,
                omega_rad_s: omega,
                q_batt_c: 1.0,
            };
            let dx = derivative(&params, &torque, 0.1, &state);
            assert_eq!(dx.id_a, 0.0);
        }
    }

    #[test]
    fn q_axis_current_independent_of_currents() {
        // Open question kept as observed: the terminal voltages cancel the
        // resistive and cross-coupling terms, leaving diq/dt = ω·λ_m/Lq.
        let (params, torque) = reference();
        let omega = 300.0;
        let expected = omega * params.flux_linkage() / params.motor().lq_h;
        let tol = Tolerances {
            abs: 1e-9,
            rel: 1e-6,
        };
        for id in [-20.0, -1.0, 0.0, 2.5, 40.0] {
            let state = PmsmState {
                id_a: id,
                iq_a: 12.0,
                omega_rad_s: omega,
                q_batt_c: 0.0,
            };
            let dx = derivative(&params, &torque, 0.5, &state);
            assert!(nearly_equal(dx.iq_a, expected, tol), "id={id}: {}", dx.iq_a);
        }
    }

    #[test]
    fn unequal_inductances_restore_coupling() {
        let motor = MotorParameters {
            ld_h: 0.001,
            lq_h: 0.002,
            ..MotorParameters::default()
        };
        let params = ParameterSet::new(motor, BatteryParameters::default()).unwrap();
        let state = PmsmState {
            id_a: 0.0,
            iq_a: 5.0,
            omega_rad_s: 100.0,
            q_batt_c: 0.0,
        };
        let dx = derivative(&params, &TorqueProfile::hub_step(), 0.1, &state);
        // ω·iq·(Lq − Ld)/Ld = 100·5·1
        assert!((dx.id_a - 500.0).abs() < 1e-9);
    }

    #[test]
    fn battery_charge_rate_is_rectified_q_current() {
        let (params, torque) = reference();
        let state = PmsmState {
            id_a: 0.0,
            iq_a: 10.0,
            omega_rad_s: 50.0,
            q_batt_c: 0.0,
        };
        let dx = derivative(&params, &torque, 1.0, &state);
        assert!((dx.q_batt_c - 1.5 * 10.0 * 0.9).abs() < 1e-12);
    }

    #[test]
    fn back_torque_and_friction_oppose_hub() {
        let (params, torque) = reference();
        let state = PmsmState {
            id_a: 0.0,
            iq_a: 100.0,
            omega_rad_s: 1000.0,
            q_batt_c: 0.0,
        };
        let op = operating_point(&params, &state);
        let dx = derivative(&params, &torque, 1.0, &state);
        let expected = (22.0 - op.te - 1e-3 * 1000.0) / 0.01;
        assert!((dx.omega_rad_s - expected).abs() < 1e-9);
        assert!(dx.omega_rad_s < 2200.0);
    }

    #[test]
    fn state_array_order() {
        let state = PmsmState {
            id_a: 1.0,
            iq_a: 2.0,
            omega_rad_s: 3.0,
            q_batt_c: 4.0,
        };
        assert_eq!(state.to_array(), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(PmsmState::from_array(state.to_array()), state);
        assert!(!PmsmState::from_array([0.0, f64::NAN, 0.0, 0.0]).is_finite());
    }
}
