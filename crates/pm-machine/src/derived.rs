//! Post-processing of a state trajectory into observable series.

use crate::dynamics::{PmsmState, operating_point};
use crate::error::{MachineError, MachineResult};
use crate::params::ParameterSet;
use pm_core::units::{self, AngularVelocity, Charge, Current, Time, Torque};

/// Torque, current and speed series aligned to trajectory samples.
///
/// All series have the length of the trajectory they were computed from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DerivedSeries {
    t: Vec<f64>,
    rpm: Vec<f64>,
    te: Vec<f64>,
    ibat: Vec<f64>,
    q_batt: Vec<f64>,
}

/// One labelled `(t, value)` series for plotting.
#[derive(Clone, Copy, Debug)]
pub struct PlotSeries<'a> {
    pub label: &'static str,
    pub t: &'a [f64],
    pub values: &'a [f64],
}

impl DerivedSeries {
    /// Compute derived series over every sample of a trajectory.
    ///
    /// # Errors
    /// Returns [`MachineError::SampleMismatch`] if `t` and `states` differ in length.
    pub fn compute(
        params: &ParameterSet,
        t: &[f64],
        states: &[PmsmState],
    ) -> MachineResult<Self> {
        if t.len() != states.len() {
            return Err(MachineError::SampleMismatch {
                times: t.len(),
                states: states.len(),
            });
        }

        let n = t.len();
        let mut out = Self {
            t: t.to_vec(),
            rpm: Vec::with_capacity(n),
            te: Vec::with_capacity(n),
            ibat: Vec::with_capacity(n),
            q_batt: Vec::with_capacity(n),
        };

        for state in states {
            let op = operating_point(params, state);
            out.rpm.push(units::rad_s_to_rpm(state.omega_rad_s));
            out.te.push(op.te);
            out.ibat.push(op.ibat);
            out.q_batt.push(state.q_batt_c);
        }

        Ok(out)
    }

    /// Sample times (s)
    pub fn t(&self) -> &[f64] {
        &self.t
    }

    /// Rotor speed (RPM)
    pub fn rpm(&self) -> &[f64] {
        &self.rpm
    }

    /// Electromagnetic torque Te (N·m)
    pub fn te(&self) -> &[f64] {
        &self.te
    }

    /// Battery current after the rectifier (A)
    pub fn ibat(&self) -> &[f64] {
        &self.ibat
    }

    /// Accumulated battery charge, copied from the state (A·s)
    pub fn q_batt(&self) -> &[f64] {
        &self.q_batt
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Speed, torque, battery current and charge against time.
    pub fn plot_series(&self) -> [PlotSeries<'_>; 4] {
        [
            PlotSeries {
                label: "Speed (RPM)",
                t: &self.t,
                values: &self.rpm,
            },
            PlotSeries {
                label: "Torque (N·m)",
                t: &self.t,
                values: &self.te,
            },
            PlotSeries {
                label: "Battery Current (A)",
                t: &self.t,
                values: &self.ibat,
            },
            PlotSeries {
                label: "Battery Charge (A·s)",
                t: &self.t,
                values: &self.q_batt,
            },
        ]
    }

    /// End-of-run and peak values, or `None` for an empty series.
    pub fn summary(&self) -> Option<RunSummary> {
        let peak = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(RunSummary {
            samples: self.len(),
            final_time: units::s(*self.t.last()?),
            final_speed: units::rpm(*self.rpm.last()?),
            peak_speed: units::rpm(peak(&self.rpm)),
            final_torque: units::n_m(*self.te.last()?),
            peak_torque: units::n_m(peak(&self.te)),
            final_battery_current: units::amp(*self.ibat.last()?),
            final_charge: units::coulomb(*self.q_batt.last()?),
        })
    }
}

/// Headline figures of a run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub samples: usize,
    pub final_time: Time,
    pub final_speed: AngularVelocity,
    pub peak_speed: AngularVelocity,
    pub final_torque: Torque,
    pub peak_torque: Torque,
    pub final_battery_current: Current,
    pub final_charge: Charge,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_core::{Tolerances, nearly_equal};

    fn sample(iq: f64, omega: f64, q: f64) -> PmsmState {
        PmsmState {
            id_a: 0.0,
            iq_a: iq,
            omega_rad_s: omega,
            q_batt_c: q,
        }
    }

    #[test]
    fn series_are_aligned_with_samples() {
        let params = ParameterSet::reference().unwrap();
        let t = [0.0, 0.5, 1.0];
        let x = [sample(0.0, 0.0, 0.0), sample(2.0, 10.0, 0.1), sample(4.0, 20.0, 0.4)];
        let series = DerivedSeries::compute(&params, &t, &x).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.t(), &t);
        assert_eq!(series.q_batt(), &[0.0, 0.1, 0.4]);
        for s in series.plot_series() {
            assert_eq!(s.t.len(), s.values.len());
        }
    }

    #[test]
    fn plot_labels_carry_units() {
        let labels = DerivedSeries::default().plot_series().map(|s| s.label);
        assert_eq!(
            labels,
            [
                "Speed (RPM)",
                "Torque (N·m)",
                "Battery Current (A)",
                "Battery Charge (A·s)"
            ]
        );
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let params = ParameterSet::reference().unwrap();
        let x = [sample(0.0, 0.0, 0.0)];
        assert!(matches!(
            DerivedSeries::compute(&params, &[0.0, 1.0], &x),
            Err(MachineError::SampleMismatch {
                times: 2,
                states: 1
            })
        ));
    }

    #[test]
    fn unit_conversions() {
        let params = ParameterSet::reference().unwrap();
        let omega = 2.0 * core::f64::consts::PI;
        let series =
            DerivedSeries::compute(&params, &[1.0], &[sample(10.0, omega, 0.0)]).unwrap();
        let tol = Tolerances::default();

        assert!(nearly_equal(series.rpm()[0], 60.0, tol));
        assert!(nearly_equal(
            series.te()[0],
            1.5 * 4.0 * params.flux_linkage() * 10.0,
            tol
        ));
        assert!(nearly_equal(series.ibat()[0], 1.5 * 10.0 * 0.9, tol));
    }

    #[test]
    fn summary_tracks_final_and_peak() {
        let params = ParameterSet::reference().unwrap();
        let t = [0.0, 1.0, 2.0];
        let x = [sample(0.0, 0.0, 0.0), sample(8.0, 300.0, 1.0), sample(6.0, 200.0, 3600.0)];
        let summary = DerivedSeries::compute(&params, &t, &x)
            .unwrap()
            .summary()
            .unwrap();
        let tol = Tolerances {
            abs: 1e-9,
            rel: 1e-9,
        };

        assert_eq!(summary.samples, 3);
        assert!(nearly_equal(units::as_seconds(summary.final_time), 2.0, tol));
        assert!(nearly_equal(
            units::as_rpm(summary.peak_speed),
            units::rad_s_to_rpm(300.0),
            tol
        ));
        assert!(nearly_equal(
            units::as_rpm(summary.final_speed),
            units::rad_s_to_rpm(200.0),
            tol
        ));
        assert!(nearly_equal(units::as_amp_hours(summary.final_charge), 1.0, tol));
        assert!(units::as_n_m(summary.peak_torque) > units::as_n_m(summary.final_torque));
    }

    #[test]
    fn empty_series_has_no_summary() {
        assert!(DerivedSeries::default().summary().is_none());
    }
}
