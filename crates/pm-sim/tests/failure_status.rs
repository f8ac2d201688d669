//! Integration test: numerical failures are reported, never passed off as complete.

use nalgebra::DVector;
use pm_machine::{MachineError, PmsmState, TorqueProfile};
use pm_sim::{
    FailureReason, IntegratorType, Scenario, SimError, SimOptions, SimResult, SimStatus,
    TransientModel, run_scenario, run_sim,
};

/// dx/dt = 1 until `t_blowup`, NaN afterwards.
struct BlowUp {
    t_blowup: f64,
}

impl TransientModel for BlowUp {
    type State = f64;

    fn initial_state(&self) -> f64 {
        0.0
    }

    fn rhs(&mut self, t: f64, _x: &f64) -> SimResult<f64> {
        if t > self.t_blowup {
            Err(SimError::NonFinite {
                what: "test derivative",
                t,
            })
        } else {
            Ok(1.0)
        }
    }

    fn add(&self, a: &f64, b: &f64) -> f64 {
        a + b
    }

    fn scale(&self, a: &f64, scale: f64) -> f64 {
        a * scale
    }

    fn components(&self, x: &f64) -> DVector<f64> {
        DVector::from_element(1, *x)
    }
}

/// dx/dt = NaN returned as a value rather than an error.
struct SilentNan;

impl TransientModel for SilentNan {
    type State = f64;

    fn initial_state(&self) -> f64 {
        1.0
    }

    fn rhs(&mut self, t: f64, _x: &f64) -> SimResult<f64> {
        Ok(if t > 0.0 { f64::NAN } else { 0.0 })
    }

    fn add(&self, a: &f64, b: &f64) -> f64 {
        a + b
    }

    fn scale(&self, a: &f64, scale: f64) -> f64 {
        a * scale
    }

    fn components(&self, x: &f64) -> DVector<f64> {
        DVector::from_element(1, *x)
    }
}

/// dx/dt = -rate·x, with the rate jumping from 1 to 1e6 after `t_stiff`.
struct Stiffening {
    t_stiff: f64,
}

impl TransientModel for Stiffening {
    type State = f64;

    fn initial_state(&self) -> f64 {
        1.0
    }

    fn rhs(&mut self, t: f64, x: &f64) -> SimResult<f64> {
        let rate = if t > self.t_stiff { 1e6 } else { 1.0 };
        Ok(-rate * x)
    }

    fn add(&self, a: &f64, b: &f64) -> f64 {
        a + b
    }

    fn scale(&self, a: &f64, scale: f64) -> f64 {
        a * scale
    }

    fn components(&self, x: &f64) -> DVector<f64> {
        DVector::from_element(1, *x)
    }
}

#[test]
fn adaptive_run_stops_at_blowup() {
    let mut model = BlowUp { t_blowup: 0.1 };
    let opts = SimOptions {
        t_end: 1.0,
        ..SimOptions::default()
    };
    let record = run_sim(&mut model, &opts).expect("failure is a status, not an error");

    assert!(!record.is_complete());
    assert!(matches!(
        record.status,
        SimStatus::Failed {
            reason: FailureReason::NonFiniteState,
            ..
        }
    ));
    assert!(record.t_reached() <= 0.1 + 1e-12);
    assert!(record.stats.rejected_steps > 0);

    match record.into_complete() {
        Err(SimError::Incomplete {
            t_reached, t_end, ..
        }) => {
            assert!(t_reached < t_end);
            assert_eq!(t_end, 1.0);
        }
        other => panic!("expected Incomplete, got {other:?}"),
    }
}

#[test]
fn silent_nan_is_caught_by_adaptive_driver() {
    let record = run_sim(&mut SilentNan, &SimOptions::default()).unwrap();
    assert!(matches!(record.status, SimStatus::Failed { .. }));
    assert_eq!(record.t, vec![0.0]);
}

#[test]
fn silent_nan_is_caught_by_fixed_step_driver() {
    let opts = SimOptions {
        integrator: IntegratorType::RK4,
        ..SimOptions::default()
    };
    let record = run_sim(&mut SilentNan, &opts).unwrap();
    assert!(matches!(
        record.status,
        SimStatus::Failed {
            reason: FailureReason::NonFiniteState,
            t,
        } if t == 0.0
    ));
}

#[test]
fn scenario_with_non_finite_start_is_an_error() {
    let scenario = Scenario {
        initial_state: PmsmState {
            omega_rad_s: f64::NAN,
            ..PmsmState::ZERO
        },
        ..Scenario::reference().unwrap()
    };
    assert!(matches!(
        run_scenario(&scenario),
        Err(SimError::Incomplete {
            reason: FailureReason::NonFiniteState,
            ..
        })
    ));
}

#[test]
fn scenario_step_limit_is_an_error() {
    let scenario = Scenario {
        options: SimOptions {
            max_steps: 100,
            ..SimOptions::default()
        },
        ..Scenario::reference().unwrap()
    };
    let err = run_scenario(&scenario).unwrap_err();
    assert!(matches!(
        err,
        SimError::Incomplete {
            reason: FailureReason::MaxStepsExceeded { steps: 100 },
            ..
        }
    ));
    assert!(format!("{err}").contains("step limit"));
}

#[test]
fn stiff_region_collapses_the_step_size() {
    let mut model = Stiffening { t_stiff: 0.2 };
    let opts = SimOptions {
        t_end: 1.0,
        min_step: 1e-4,
        ..SimOptions::default()
    };
    let record = run_sim(&mut model, &opts).unwrap();

    match record.status {
        SimStatus::Failed {
            reason: FailureReason::StepSizeCollapse { h },
            t,
        } => {
            assert!(h < 1e-4);
            assert!(t > 0.1 && t <= 0.2);
        }
        other => panic!("expected step size collapse, got {other:?}"),
    }
    assert!(record.stats.accepted_steps > 0);
    assert!(record.stats.rejected_steps > 0);

    assert!(matches!(
        record.into_complete(),
        Err(SimError::Incomplete {
            reason: FailureReason::StepSizeCollapse { .. },
            t_end,
            ..
        }) if t_end == 1.0
    ));
}

#[test]
fn unresolvable_step_ends_as_collapse_with_increasing_time() {
    let mut model = BlowUp { t_blowup: 0.1 };
    let opts = SimOptions {
        t_end: 1.0,
        min_step: 1e-30,
        max_steps: 20_000,
        ..SimOptions::default()
    };
    let record = run_sim(&mut model, &opts).unwrap();

    assert!(matches!(
        record.status,
        SimStatus::Failed {
            reason: FailureReason::StepSizeCollapse { .. },
            ..
        }
    ));
    assert!(record.stats.accepted_steps + record.stats.rejected_steps < 20_000);
    assert!(record.t.windows(2).all(|w| w[1] > w[0]));
    assert!(record.t_reached() <= 0.1);
}

#[test]
fn invalid_torque_profile_keeps_its_typed_source() {
    let scenario = Scenario {
        torque: TorqueProfile::Step {
            magnitude_n_m: f64::NAN,
            t_on_s: 0.0,
        },
        ..Scenario::reference().unwrap()
    };
    let err = run_scenario(&scenario).unwrap_err();
    assert!(matches!(
        err,
        SimError::Model(MachineError::InvalidProfile { .. })
    ));
    assert!(std::error::Error::source(&err).is_some());
}
