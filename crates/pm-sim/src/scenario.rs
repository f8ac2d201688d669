//! One-call runner: parameters in, trajectory and derived series out.

use crate::error::SimResult;
use crate::pmsm::PmsmModel;
use crate::sim::{SimOptions, SimProgress, SimRecord, run_sim_with_progress};
use pm_machine::{DerivedSeries, ParameterSet, PmsmState, TorqueProfile};

/// Everything needed for one run of the generator bench.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub params: ParameterSet,
    pub torque: TorqueProfile,
    pub initial_state: PmsmState,
    pub options: SimOptions,
}

impl Scenario {
    /// A2212 machine, 9 V pack, 22 N·m hub step, 5 s from rest at `max_step = 1 ms`.
    pub fn reference() -> SimResult<Self> {
        Ok(Self {
            params: ParameterSet::reference()?,
            torque: TorqueProfile::hub_step(),
            initial_state: PmsmState::ZERO,
            options: SimOptions::default(),
        })
    }
}

/// Completed trajectory and its derived series.
#[derive(Clone, Debug)]
pub struct ScenarioOutput {
    pub trajectory: SimRecord<PmsmState>,
    pub series: DerivedSeries,
}

/// Integrate a scenario and post-process it.
///
/// # Errors
/// Returns [`crate::SimError::Incomplete`] if the integrator did not reach
/// `t_end`; no derived series are produced for a failed run.
pub fn run_scenario(scenario: &Scenario) -> SimResult<ScenarioOutput> {
    run_scenario_with_progress(scenario, None)
}

pub fn run_scenario_with_progress(
    scenario: &Scenario,
    progress: Option<&mut dyn FnMut(&SimProgress)>,
) -> SimResult<ScenarioOutput> {
    scenario.torque.validate()?;

    let mut model = PmsmModel::with_initial_state(
        scenario.params.clone(),
        scenario.torque.clone(),
        scenario.initial_state,
    );
    let trajectory =
        run_sim_with_progress(&mut model, &scenario.options, progress)?.into_complete()?;
    let series = DerivedSeries::compute(&scenario.params, &trajectory.t, &trajectory.x)?;

    Ok(ScenarioOutput { trajectory, series })
}
