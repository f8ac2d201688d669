//! External hub torque driving the rotor.

use crate::error::{MachineError, MachineResult};

/// Torque applied to the rotor from the gearbox/hub side.
///
/// Every variant is zero at and before its start instant (strict inequality),
/// so a run starting at `t = 0` sees no input torque at the initial sample.
/// The rotor speed is accepted by [`TorqueProfile::torque`] but not used.
#[derive(Clone, Debug, PartialEq)]
pub enum TorqueProfile {
    /// `magnitude` for `t > t_on`, `0` otherwise.
    Step { magnitude_n_m: f64, t_on_s: f64 },
    /// `min(rate·(t − t_start), max)` for `t > t_start`, `0` otherwise.
    Ramp {
        rate_n_m_per_s: f64,
        max_n_m: f64,
        t_start_s: f64,
    },
    /// `mean + amplitude·sin(2π·f·t)` for `t > 0`, `0` otherwise.
    Periodic {
        mean_n_m: f64,
        amplitude_n_m: f64,
        frequency_hz: f64,
    },
}

impl TorqueProfile {
    /// Hub torque of the bench experiment: 22 N·m from the first instant after start.
    pub const HUB_STEP_N_M: f64 = 22.0;

    pub fn hub_step() -> Self {
        Self::Step {
            magnitude_n_m: Self::HUB_STEP_N_M,
            t_on_s: 0.0,
        }
    }

    /// Check that every coefficient is finite and the timing is sensible.
    pub fn validate(&self) -> MachineResult<()> {
        let finite = |v: f64| v.is_finite();
        match *self {
            Self::Step {
                magnitude_n_m,
                t_on_s,
            } => {
                if !finite(magnitude_n_m) || !finite(t_on_s) {
                    return Err(MachineError::InvalidProfile {
                        what: "step magnitude and onset must be finite",
                    });
                }
            }
            Self::Ramp {
                rate_n_m_per_s,
                max_n_m,
                t_start_s,
            } => {
                if !finite(rate_n_m_per_s) || !finite(max_n_m) || !finite(t_start_s) {
                    return Err(MachineError::InvalidProfile {
                        what: "ramp coefficients must be finite",
                    });
                }
            }
            Self::Periodic {
                mean_n_m,
                amplitude_n_m,
                frequency_hz,
            } => {
                if !finite(mean_n_m) || !finite(amplitude_n_m) || !finite(frequency_hz) {
                    return Err(MachineError::InvalidProfile {
                        what: "periodic coefficients must be finite",
                    });
                }
                if frequency_hz < 0.0 {
                    return Err(MachineError::InvalidProfile {
                        what: "periodic frequency cannot be negative",
                    });
                }
            }
        }
        Ok(())
    }

    /// Hub torque `T_hub(t, ω)` in N·m.
    pub fn torque(&self, t: f64, _omega_rad_s: f64) -> f64 {
        match *self {
            Self::Step {
                magnitude_n_m,
                t_on_s,
            } => {
                if t > t_on_s {
                    magnitude_n_m
                } else {
                    0.0
                }
            }
            Self::Ramp {
                rate_n_m_per_s,
                max_n_m,
                t_start_s,
            } => {
                if t > t_start_s {
                    (rate_n_m_per_s * (t - t_start_s)).min(max_n_m)
                } else {
                    0.0
                }
            }
            Self::Periodic {
                mean_n_m,
                amplitude_n_m,
                frequency_hz,
            } => {
                if t > 0.0 {
                    mean_n_m
                        + amplitude_n_m * (2.0 * core::f64::consts::PI * frequency_hz * t).sin()
                } else {
                    0.0
                }
            }
        }
    }
}

impl Default for TorqueProfile {
    fn default() -> Self {
        Self::hub_step()
    }
}
