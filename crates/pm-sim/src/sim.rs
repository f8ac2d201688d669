//! Simulation runner and result recording.

use std::fmt;

use tracing::{debug, info, trace, warn};

use crate::error::{SimError, SimResult};
use crate::integrator::{DormandPrince45, ForwardEuler, Integrator, RK4};
use crate::model::TransientModel;

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// Adaptive Dormand-Prince 5(4) (default, step bounded by `max_step`).
    #[default]
    DormandPrince45,
    /// 4th-order Runge-Kutta at fixed `max_step` (4 rhs calls per step).
    RK4,
    /// Forward Euler at fixed `max_step` (1 rhs call per step).
    ForwardEuler,
}

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Final simulation time (seconds)
    pub t_end: f64,
    /// Largest step the integrator may take; the fixed step for RK4/Euler (seconds)
    pub max_step: f64,
    /// Adaptive steps below this size end the run as failed (seconds)
    pub min_step: f64,
    /// Relative tolerance for adaptive step control
    pub rtol: f64,
    /// Absolute tolerance for adaptive step control
    pub atol: f64,
    /// Maximum number of step attempts (safety limit)
    pub max_steps: usize,
    /// Record every N-th accepted step (decimation)
    pub record_every: usize,
    /// Integrator type (default: Dormand-Prince 5(4))
    pub integrator: IntegratorType,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            t_end: 5.0,
            max_step: 1e-3,
            min_step: 1e-12,
            rtol: 1e-3,
            atol: 1e-6,
            max_steps: 1_000_000,
            record_every: 1,
            integrator: IntegratorType::default(),
        }
    }
}

impl SimOptions {
    fn validate(&self) -> SimResult<()> {
        if !(self.t_end.is_finite() && self.t_end >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "t_end must be finite and non-negative",
            });
        }
        if !(self.max_step.is_finite() && self.max_step > 0.0) {
            return Err(SimError::InvalidArg {
                what: "max_step must be positive",
            });
        }
        if !(self.min_step > 0.0 && self.min_step <= self.max_step) {
            return Err(SimError::InvalidArg {
                what: "min_step must be positive and not exceed max_step",
            });
        }
        if !(self.rtol > 0.0 && self.atol > 0.0) {
            return Err(SimError::InvalidArg {
                what: "rtol and atol must be positive",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        Ok(())
    }
}

/// Why an integration stopped before `t_end`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FailureReason {
    /// Adaptive step shrank below `min_step` while rejecting.
    StepSizeCollapse { h: f64 },
    /// The state or its derivative became NaN/infinite.
    NonFiniteState,
    /// `max_steps` attempts were used up.
    MaxStepsExceeded { steps: usize },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepSizeCollapse { h } => write!(f, "step size collapsed to {h:.3e} s"),
            Self::NonFiniteState => write!(f, "non-finite state or derivative"),
            Self::MaxStepsExceeded { steps } => write!(f, "step limit of {steps} exceeded"),
        }
    }
}

/// Completion status of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimStatus {
    /// Reached `t_end`.
    Completed,
    /// Stopped at time `t` for `reason`.
    Failed { reason: FailureReason, t: f64 },
}

/// Solver work counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub rhs_evals: usize,
}

impl SimStats {
    fn attempts(&self) -> usize {
        self.accepted_steps + self.rejected_steps
    }
}

/// Progress snapshot passed to the progress callback after each accepted step.
#[derive(Clone, Debug, Default)]
pub struct SimProgress {
    pub sim_time_s: f64,
    pub t_end_s: f64,
    pub fraction_complete: f64,
    pub step: usize,
    pub rejected_steps: usize,
}

/// Record of simulation results.
#[derive(Clone, Debug)]
pub struct SimRecord<S> {
    /// Time points (seconds), strictly increasing from 0
    pub t: Vec<f64>,
    /// State snapshots
    pub x: Vec<S>,
    /// Requested final time (seconds)
    pub t_end: f64,
    pub status: SimStatus,
    pub stats: SimStats,
}

impl<S> SimRecord<S> {
    pub fn is_complete(&self) -> bool {
        self.status == SimStatus::Completed
    }

    /// Last recorded time.
    pub fn t_reached(&self) -> f64 {
        self.t.last().copied().unwrap_or(0.0)
    }

    /// Keep the record only if the run reached `t_end`.
    ///
    /// # Errors
    /// Returns [`SimError::Incomplete`] for a failed run.
    pub fn into_complete(self) -> SimResult<Self> {
        match self.status {
            SimStatus::Completed => Ok(self),
            SimStatus::Failed { reason, t } => Err(SimError::Incomplete {
                t_reached: t,
                t_end: self.t_end,
                reason,
            }),
        }
    }
}

/// Decimating sample recorder; always keeps the first and last sample.
struct Recorder<S> {
    every: usize,
    t: Vec<f64>,
    x: Vec<S>,
    last_time: f64,
    last_state: S,
}

impl<S: Clone> Recorder<S> {
    fn new(every: usize, t0: f64, x0: &S) -> Self {
        Self {
            every,
            t: vec![t0],
            x: vec![x0.clone()],
            last_time: t0,
            last_state: x0.clone(),
        }
    }

    fn accept(&mut self, step: usize, t: f64, x: &S) {
        self.last_time = t;
        self.last_state = x.clone();
        if step % self.every == 0 {
            self.t.push(t);
            self.x.push(x.clone());
        }
    }

    fn finish(mut self, t_end: f64, status: SimStatus, stats: SimStats) -> SimRecord<S> {
        if self.t.last().copied() != Some(self.last_time) {
            self.t.push(self.last_time);
            self.x.push(self.last_state);
        }
        SimRecord {
            t: self.t,
            x: self.x,
            t_end,
            status,
            stats,
        }
    }
}

type ProgressFn<'a> = Option<&'a mut dyn FnMut(&SimProgress)>;

fn report(progress: &mut ProgressFn<'_>, t: f64, t_end: f64, stats: &SimStats) {
    if let Some(cb) = progress.as_mut() {
        let fraction_complete = if t_end > 0.0 {
            (t / t_end).clamp(0.0, 1.0)
        } else {
            1.0
        };
        cb(&SimProgress {
            sim_time_s: t,
            t_end_s: t_end,
            fraction_complete,
            step: stats.accepted_steps,
            rejected_steps: stats.rejected_steps,
        });
    }
}

/// Run a transient simulation from `t = 0` to `opts.t_end`.
///
/// Numerical failures (step collapse, non-finite state, step limit) do not
/// return `Err`; they end the run early and are reported in
/// [`SimRecord::status`]. Use [`SimRecord::into_complete`] to turn them into
/// errors. Invalid options and non-recoverable model errors return `Err`.
pub fn run_sim<M: TransientModel>(
    model: &mut M,
    opts: &SimOptions,
) -> SimResult<SimRecord<M::State>> {
    run_sim_with_progress(model, opts, None)
}

/// Like [`run_sim`], invoking `progress` after every accepted step.
pub fn run_sim_with_progress<M: TransientModel>(
    model: &mut M,
    opts: &SimOptions,
    mut progress: ProgressFn<'_>,
) -> SimResult<SimRecord<M::State>> {
    opts.validate()?;

    debug!(
        integrator = ?opts.integrator,
        t_end = opts.t_end,
        max_step = opts.max_step,
        rtol = opts.rtol,
        atol = opts.atol,
        "starting transient run"
    );

    let x0 = model.initial_state();
    let mut rec = Recorder::new(opts.record_every, 0.0, &x0);
    let mut stats = SimStats::default();

    let status = if !model.is_finite(&x0) {
        SimStatus::Failed {
            reason: FailureReason::NonFiniteState,
            t: 0.0,
        }
    } else {
        match opts.integrator {
            IntegratorType::DormandPrince45 => {
                integrate_adaptive(model, opts, x0, &mut rec, &mut stats, &mut progress)?
            }
            IntegratorType::RK4 => {
                integrate_fixed(&RK4, model, opts, x0, &mut rec, &mut stats, &mut progress)?
            }
            IntegratorType::ForwardEuler => integrate_fixed(
                &ForwardEuler,
                model,
                opts,
                x0,
                &mut rec,
                &mut stats,
                &mut progress,
            )?,
        }
    };

    match status {
        SimStatus::Completed => info!(
            accepted = stats.accepted_steps,
            rejected = stats.rejected_steps,
            rhs_evals = stats.rhs_evals,
            "transient run completed"
        ),
        SimStatus::Failed { reason, t } => warn!(
            t = t,
            reason = %reason,
            accepted = stats.accepted_steps,
            rejected = stats.rejected_steps,
            "transient run failed"
        ),
    }

    Ok(rec.finish(opts.t_end, status, stats))
}

fn integrate_adaptive<M: TransientModel>(
    model: &mut M,
    opts: &SimOptions,
    x0: M::State,
    rec: &mut Recorder<M::State>,
    stats: &mut SimStats,
    progress: &mut ProgressFn<'_>,
) -> SimResult<SimStatus> {
    let dp = DormandPrince45::default();
    let mut t = 0.0;
    let mut x = x0;

    let mut k1 = match model.rhs(t, &x) {
        Ok(k) => k,
        Err(e) if e.is_recoverable() => {
            return Ok(SimStatus::Failed {
                reason: FailureReason::NonFiniteState,
                t,
            });
        }
        Err(e) => return Err(e),
    };
    stats.rhs_evals += 1;

    let mut h = match DormandPrince45::initial_step(model, t, &x, &k1, opts.rtol, opts.atol) {
        Ok(h) => h,
        Err(e) if e.is_recoverable() => opts.min_step.max(1e-6 * opts.max_step),
        Err(e) => return Err(e),
    };
    stats.rhs_evals += 1;

    let mut rejected_last = false;

    while t < opts.t_end {
        if stats.attempts() >= opts.max_steps {
            return Ok(SimStatus::Failed {
                reason: FailureReason::MaxStepsExceeded {
                    steps: opts.max_steps,
                },
                t,
            });
        }

        let remaining = opts.t_end - t;
        let h_try = h.min(opts.max_step).min(remaining);
        let last = h_try >= remaining;

        // Below the resolution of `t` a step no longer advances time.
        if !last && t + h_try <= t {
            return Ok(SimStatus::Failed {
                reason: FailureReason::StepSizeCollapse { h: h_try },
                t,
            });
        }

        let outcome = match dp.attempt(model, t, &x, &k1, h_try) {
            Ok(step) => {
                stats.rhs_evals += DormandPrince45::RHS_EVALS;
                let err = DormandPrince45::error_norm(
                    model,
                    &step.error,
                    &x,
                    &step.x_new,
                    opts.rtol,
                    opts.atol,
                );
                let finite = err.is_finite() && model.is_finite(&step.x_new);
                if finite && err <= 1.0 {
                    Ok((step, err))
                } else {
                    Err((err, !finite))
                }
            }
            Err(e) if e.is_recoverable() => Err((f64::NAN, true)),
            Err(e) => return Err(e),
        };

        match outcome {
            Ok((step, err)) => {
                t = if last { opts.t_end } else { t + h_try };
                x = step.x_new;
                k1 = step.k_new;
                stats.accepted_steps += 1;
                rec.accept(stats.accepted_steps, t, &x);
                report(progress, t, opts.t_end, stats);

                let factor = dp.grow_factor(err);
                h = if rejected_last {
                    h_try * factor.min(1.0)
                } else {
                    h_try * factor
                };
                rejected_last = false;
            }
            Err((err, non_finite)) => {
                stats.rejected_steps += 1;
                h = h_try * dp.shrink_factor(err);
                trace!(t = t, h_try = h_try, err = err, non_finite = non_finite, "step rejected");
                rejected_last = true;

                if h < opts.min_step {
                    let reason = if non_finite {
                        FailureReason::NonFiniteState
                    } else {
                        FailureReason::StepSizeCollapse { h }
                    };
                    return Ok(SimStatus::Failed { reason, t });
                }
            }
        }
    }

    Ok(SimStatus::Completed)
}

fn integrate_fixed<M: TransientModel, I: Integrator>(
    integrator: &I,
    model: &mut M,
    opts: &SimOptions,
    x0: M::State,
    rec: &mut Recorder<M::State>,
    stats: &mut SimStats,
    progress: &mut ProgressFn<'_>,
) -> SimResult<SimStatus> {
    let mut t = 0.0;
    let mut x = x0;

    while t < opts.t_end {
        if stats.attempts() >= opts.max_steps {
            return Ok(SimStatus::Failed {
                reason: FailureReason::MaxStepsExceeded {
                    steps: opts.max_steps,
                },
                t,
            });
        }

        let remaining = opts.t_end - t;
        let dt = opts.max_step.min(remaining);
        let x_new = match integrator.step(model, t, &x, dt) {
            Ok(x_new) => x_new,
            Err(e) if e.is_recoverable() => {
                return Ok(SimStatus::Failed {
                    reason: FailureReason::NonFiniteState,
                    t,
                });
            }
            Err(e) => return Err(e),
        };
        stats.rhs_evals += I::RHS_EVALS;

        if !model.is_finite(&x_new) {
            stats.rejected_steps += 1;
            return Ok(SimStatus::Failed {
                reason: FailureReason::NonFiniteState,
                t,
            });
        }

        t = if dt >= remaining { opts.t_end } else { t + dt };
        x = x_new;
        stats.accepted_steps += 1;
        rec.accept(stats.accepted_steps, t, &x);
        report(progress, t, opts.t_end, stats);
    }

    Ok(SimStatus::Completed)
}
