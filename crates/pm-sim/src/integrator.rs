//! Time integrators.

use crate::error::SimResult;
use crate::model::TransientModel;

/// Trait for fixed-step time integrators.
pub trait Integrator {
    /// Right-hand side evaluations per step.
    const RHS_EVALS: usize;

    /// Advance state by one time step using the transient model.
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State>;
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    const RHS_EVALS: usize = 4;

    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let k1 = model.rhs(t, x)?;

        let x2 = model.add(x, &model.scale(&k1, 0.5 * dt));
        let k2 = model.rhs(t + 0.5 * dt, &x2)?;

        let x3 = model.add(x, &model.scale(&k2, 0.5 * dt));
        let k3 = model.rhs(t + 0.5 * dt, &x3)?;

        let x4 = model.add(x, &model.scale(&k3, dt));
        let k4 = model.rhs(t + dt, &x4)?;

        // Combine: x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        let k_sum = model.add(
            &model.add(&k1, &model.scale(&k2, 2.0)),
            &model.add(&model.scale(&k3, 2.0), &k4),
        );

        Ok(model.add(x, &model.scale(&k_sum, dt / 6.0)))
    }
}

/// Forward Euler (explicit, 1st order, fast for testing).
/// Calls rhs() once per step instead of 4 times (RK4).
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    const RHS_EVALS: usize = 1;

    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let xdot = model.rhs(t, x)?;
        Ok(model.add(x, &model.scale(&xdot, dt)))
    }
}

// Dormand-Prince 5(4) tableau.
const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    // 5th-order weights; the 7th stage is evaluated at the new point (FSAL).
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];
// Difference between the 5th- and embedded 4th-order weights.
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

/// Result of one trial Dormand-Prince step.
#[derive(Clone, Debug)]
pub struct StepAttempt<S> {
    /// 5th-order solution at `t + h`
    pub x_new: S,
    /// Derivative at the new point, reused as the next first stage
    pub k_new: S,
    /// Local error estimate
    pub error: S,
}

/// Explicit Runge-Kutta 5(4) pair with first-same-as-last stage reuse.
///
/// Step control follows the usual scheme: the error estimate is scaled by
/// `atol + rtol·max(|x|, |x_new|)` per component, its RMS must not exceed 1,
/// and the next step is `h·clamp(safety·err^(-1/5), min_factor, max_factor)`.
#[derive(Clone, Debug)]
pub struct DormandPrince45 {
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for DormandPrince45 {
    fn default() -> Self {
        Self {
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
        }
    }
}

impl DormandPrince45 {
    /// Right-hand side evaluations per trial step (first stage is carried over).
    pub const RHS_EVALS: usize = 6;

    const ERROR_EXPONENT: f64 = -1.0 / 5.0;

    /// Take one trial step of size `h` from `(t, x)` where `k1 = f(t, x)`.
    pub fn attempt<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        k1: &M::State,
        h: f64,
    ) -> SimResult<StepAttempt<M::State>> {
        let mut k: Vec<M::State> = Vec::with_capacity(7);
        k.push(k1.clone());

        for stage in 1..6 {
            let xs = combine(model, x, h, &A[stage][..stage], &k);
            k.push(model.rhs(t + C[stage] * h, &xs)?);
        }

        let x_new = combine(model, x, h, &A[6], &k);
        let k_new = model.rhs(t + h, &x_new)?;
        k.push(k_new.clone());

        let zero = model.scale(x, 0.0);
        let error = combine(model, &zero, h, &E, &k);

        Ok(StepAttempt {
            x_new,
            k_new,
            error,
        })
    }

    /// RMS of the scaled error estimate.
    pub fn error_norm<M: TransientModel>(
        model: &M,
        error: &M::State,
        x: &M::State,
        x_new: &M::State,
        rtol: f64,
        atol: f64,
    ) -> f64 {
        let err = model.components(error);
        let scale = model
            .components(x)
            .abs()
            .sup(&model.components(x_new).abs())
            .map(|y| atol + rtol * y);
        rms(&err.component_div(&scale))
    }

    /// Step-size multiplier for an accepted step.
    pub fn grow_factor(&self, err_norm: f64) -> f64 {
        if err_norm == 0.0 {
            self.max_factor
        } else {
            (self.safety * err_norm.powf(Self::ERROR_EXPONENT)).min(self.max_factor)
        }
    }

    /// Step-size multiplier for a rejected step.
    pub fn shrink_factor(&self, err_norm: f64) -> f64 {
        if err_norm.is_finite() {
            (self.safety * err_norm.powf(Self::ERROR_EXPONENT)).max(self.min_factor)
        } else {
            self.min_factor
        }
    }

    /// Initial step from the derivative magnitudes at `(t0, x0)`.
    ///
    /// Uses one extra right-hand side evaluation at `t0 + h0`.
    pub fn initial_step<M: TransientModel>(
        model: &mut M,
        t0: f64,
        x0: &M::State,
        f0: &M::State,
        rtol: f64,
        atol: f64,
    ) -> SimResult<f64> {
        let y0 = model.components(x0);
        let scale = y0.abs().map(|y| atol + rtol * y);
        let d0 = rms(&y0.component_div(&scale));
        let d1 = rms(&model.components(f0).component_div(&scale));

        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };

        let x1 = model.add(x0, &model.scale(f0, h0));
        let f1 = model.rhs(t0 + h0, &x1)?;
        let df = model.components(&f1) - model.components(f0);
        let d2 = rms(&df.component_div(&scale)) / h0;

        let h1 = if d1.max(d2) <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / 5.0)
        };

        Ok((100.0 * h0).min(h1))
    }
}

/// `x + h·Σ a_i·k_i`, skipping zero weights.
fn combine<M: TransientModel>(
    model: &M,
    x: &M::State,
    h: f64,
    weights: &[f64],
    k: &[M::State],
) -> M::State {
    weights
        .iter()
        .zip(k)
        .filter(|(a, _)| **a != 0.0)
        .fold(x.clone(), |acc, (a, ki)| {
            model.add(&acc, &model.scale(ki, h * a))
        })
}

fn rms(v: &nalgebra::DVector<f64>) -> f64 {
    if v.is_empty() {
        0.0
    } else {
        v.norm() / (v.len() as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimResult;
    use nalgebra::DVector;

    /// dx/dt = λ·x
    struct Decay {
        lambda: f64,
    }

    impl TransientModel for Decay {
        type State = f64;

        fn initial_state(&self) -> f64 {
            1.0
        }

        fn rhs(&mut self, _t: f64, x: &f64) -> SimResult<f64> {
            Ok(self.lambda * x)
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
    fn tableau_rows_sum_to_nodes() {
        for (row, c) in A.iter().zip(C) {
            let sum: f64 = row.iter().sum();
            assert!((sum - c).abs() < 1e-14, "row sum {sum} != {c}");
        }
        let e_sum: f64 = E.iter().sum();
        assert!(e_sum.abs() < 1e-15);
    }

    #[test]
    fn rk4_exponential_decay() {
        let mut model = Decay { lambda: -1.0 };
        let x = RK4.step(&mut model, 0.0, &1.0, 0.1).unwrap();
        assert!((x - (-0.1_f64).exp()).abs() < 1e-6);
    }

    #[test]
    fn forward_euler_single_step() {
        let mut model = Decay { lambda: -2.0 };
        let x = ForwardEuler.step(&mut model, 0.0, &1.0, 0.1).unwrap();
        assert!((x - 0.8).abs() < 1e-12);
    }

    #[test]
    fn dormand_prince_step_is_fifth_order_accurate() {
        let mut model = Decay { lambda: -1.0 };
        let dp = DormandPrince45::default();
        let k1 = model.rhs(0.0, &1.0).unwrap();
        let step = dp.attempt(&mut model, 0.0, &1.0, &k1, 0.1).unwrap();

        assert!((step.x_new - (-0.1_f64).exp()).abs() < 1e-8);
        assert!((step.k_new + step.x_new).abs() < 1e-15);
        assert!(step.error.abs() < 1e-6);
    }

    #[test]
    fn step_factors_are_bounded() {
        let dp = DormandPrince45::default();
        assert_eq!(dp.grow_factor(0.0), 10.0);
        assert!(dp.grow_factor(0.5) > 1.0);
        assert!(dp.grow_factor(1e-12) <= 10.0);
        assert!(dp.shrink_factor(2.0) < 1.0);
        assert_eq!(dp.shrink_factor(1e9), 0.2);
        assert_eq!(dp.shrink_factor(f64::NAN), 0.2);
    }

    #[test]
    fn initial_step_for_zero_state_is_small() {
        let mut model = Decay { lambda: -1.0 };
        let f0 = 0.0;
        let h = DormandPrince45::initial_step(&mut model, 0.0, &0.0, &f0, 1e-3, 1e-6).unwrap();
        assert!(h > 0.0 && h <= 1e-3);
    }
}
