//! Explicit Runge-Kutta integration over fixed-size state vectors.
//!
//! Two methods are available: the adaptive Dormand-Prince 5(4) pair with
//! step-size control, and classic fixed-step RK4. Either one reports the
//! solution at arbitrary caller-requested times through cubic Hermite
//! interpolation between accepted steps, so requested times never constrain
//! the step size.

use log::debug;
use nalgebra::SVector;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SirError};

/// A right-hand side dy/dt = f(t, y).
pub trait OdeSystem<const N: usize> {
    fn derivative(&self, t: f64, y: &SVector<f64, N>) -> SVector<f64, N>;

    /// Largest step the system can take without leaving its physical
    /// domain, if it has one. Applied on top of `SolverConfig::max_step`.
    fn step_limit(&self) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Method {
    DormandPrince,
    Rk4 { step: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub method: Method,
    /// Relative tolerance (adaptive method only).
    pub rtol: f64,
    /// Absolute tolerance (adaptive method only).
    pub atol: f64,
    /// Budget of attempted steps per integration.
    pub max_steps: usize,
    pub max_step: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: Method::DormandPrince,
            rtol: 1e-6,
            atol: 1e-3,
            max_steps: 100_000,
            max_step: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub accepted: usize,
    pub rejected: usize,
    pub evaluations: usize,
}

impl std::ops::AddAssign for SolverStats {
    fn add_assign(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.evaluations += other.evaluations;
    }
}

#[derive(Debug, Clone)]
pub struct Solution<const N: usize> {
    /// One entry per requested time, in order.
    pub samples: Vec<(f64, SVector<f64, N>)>,
    /// State at the end of the interval.
    pub end: SVector<f64, N>,
    pub stats: SolverStats,
}

// Dormand-Prince 5(4) tableau.
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Difference between the fifth- and fourth-order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;

struct Step<const N: usize> {
    y: SVector<f64, N>,
    f: SVector<f64, N>,
    error: f64,
}

/// Checks that requested times are finite, strictly increasing, and inside
/// [t0, t1].
pub fn validate_sample_times(sample_times: &[f64], t0: f64, t1: f64) -> Result<()> {
    if let Some(t) = sample_times.iter().find(|t| !(t0..=t1).contains(*t)) {
        return Err(SirError::invalid(format!(
            "sample time {t} lies outside [{t0}, {t1}]"
        )));
    }
    if let Some(w) = sample_times.windows(2).find(|w| w[1] <= w[0]) {
        return Err(SirError::invalid(format!(
            "sample times must be strictly increasing, got {} after {}",
            w[1], w[0]
        )));
    }
    Ok(())
}

impl SolverConfig {
    fn validate(&self) -> Result<()> {
        if let Method::Rk4 { step } = self.method
            && !(step.is_finite() && step > 0.0)
        {
            return Err(SirError::invalid(format!("RK4 step must be positive, got {step}")));
        }
        if !(self.rtol.is_finite() && self.rtol > 0.0 && self.atol.is_finite() && self.atol >= 0.0)
        {
            return Err(SirError::invalid(format!(
                "tolerances must be positive, got rtol = {} atol = {}",
                self.rtol, self.atol
            )));
        }
        if let Some(max_step) = self.max_step
            && !(max_step.is_finite() && max_step > 0.0)
        {
            return Err(SirError::invalid(format!(
                "max_step must be positive, got {max_step}"
            )));
        }
        Ok(())
    }

    /// Integrates `system` from (t0, y0) to t1, reporting the state at each of
    /// `sample_times`.
    pub fn integrate<S, const N: usize>(
        &self,
        system: &S,
        t0: f64,
        y0: SVector<f64, N>,
        t1: f64,
        sample_times: &[f64],
    ) -> Result<Solution<N>>
    where
        S: OdeSystem<N>,
    {
        self.validate()?;
        if !(t0.is_finite() && t1.is_finite() && t1 > t0) {
            return Err(SirError::invalid(format!(
                "integration interval [{t0}, {t1}] is empty"
            )));
        }
        validate_sample_times(sample_times, t0, t1)?;

        let mut stats = SolverStats::default();
        let mut samples = Vec::with_capacity(sample_times.len());
        let mut pending = sample_times.iter().copied().peekable();

        let mut t = t0;
        let mut y = y0;
        let mut f = system.derivative(t, &y);
        stats.evaluations += 1;

        while let Some(ts) = pending.next_if(|&ts| ts <= t0) {
            samples.push((ts, y));
        }

        let max_step = self
            .max_step
            .unwrap_or(f64::INFINITY)
            .min(system.step_limit().unwrap_or(f64::INFINITY))
            .min(t1 - t0);
        let mut h = match self.method {
            Method::Rk4 { step } => step,
            Method::DormandPrince => {
                self.initial_step(system, t, &y, &f, &mut stats)
            }
        }
        .min(max_step);

        while t < t1 {
            if stats.accepted + stats.rejected >= self.max_steps {
                return Err(SirError::integration(
                    t,
                    format!("step budget of {} exhausted", self.max_steps),
                ));
            }

            let last = t + h >= t1 || (t1 - t - h) < 1e-12 * t1.abs().max(1.0);
            let h_try = if last { t1 - t } else { h };
            let t_new = if last { t1 } else { t + h_try };

            let step = match self.method {
                Method::Rk4 { .. } => rk4_step(system, t, &y, &f, h_try, &mut stats),
                Method::DormandPrince => {
                    dormand_prince_step(system, t, &y, &f, h_try, self, &mut stats)
                }
            };

            let finite = step.y.iter().all(|v| v.is_finite());
            match self.method {
                Method::Rk4 { .. } if !finite => {
                    return Err(SirError::integration(t, "non-finite state"));
                }
                Method::DormandPrince if !finite || step.error > 1.0 => {
                    stats.rejected += 1;
                    let factor = if finite {
                        (SAFETY * step.error.powf(-0.2)).clamp(MIN_FACTOR, 1.0)
                    } else {
                        MIN_FACTOR
                    };
                    h = h_try * factor;
                    if h < 1e-12 * t.abs().max(1.0) {
                        return Err(SirError::integration(t, "step size underflow"));
                    }
                    continue;
                }
                _ => {}
            }

            stats.accepted += 1;
            while let Some(ts) = pending.next_if(|&ts| ts <= t_new) {
                let value = if ts == t_new {
                    step.y
                } else {
                    hermite(t, h_try, &y, &f, &step.y, &step.f, ts)
                };
                samples.push((ts, value));
            }

            if let Method::DormandPrince = self.method {
                let factor = if step.error == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * step.error.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
                };
                h = (h_try * factor).min(max_step);
            }

            t = t_new;
            y = step.y;
            f = step.f;
        }

        debug!(
            "integrated [{t0}, {t1}]: {} accepted, {} rejected, {} evaluations",
            stats.accepted, stats.rejected, stats.evaluations
        );

        Ok(Solution {
            samples,
            end: y,
            stats,
        })
    }

    fn error_norm<const N: usize>(
        &self,
        error: &SVector<f64, N>,
        y: &SVector<f64, N>,
        y_new: &SVector<f64, N>,
    ) -> f64 {
        let sum: f64 = (0..N)
            .map(|i| {
                let scale = self.atol + self.rtol * y[i].abs().max(y_new[i].abs());
                (error[i] / scale).powi(2)
            })
            .sum();
        (sum / N as f64).sqrt()
    }

    // Hairer, Norsett & Wanner, Solving ODEs I, II.4.
    fn initial_step<S, const N: usize>(
        &self,
        system: &S,
        t: f64,
        y: &SVector<f64, N>,
        f: &SVector<f64, N>,
        stats: &mut SolverStats,
    ) -> f64
    where
        S: OdeSystem<N>,
    {
        let zero = SVector::<f64, N>::zeros();
        let d0 = self.error_norm(y, y, &zero);
        let d1 = self.error_norm(f, y, &zero);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let y1 = y + f * h0;
        let f1 = system.derivative(t + h0, &y1);
        stats.evaluations += 1;
        let d2 = self.error_norm(&(f1 - f), y, &zero) / h0;
        let h1 = if d1.max(d2) <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(0.2)
        };
        (100.0 * h0).min(h1)
    }
}

fn rk4_step<S, const N: usize>(
    system: &S,
    t: f64,
    y: &SVector<f64, N>,
    k1: &SVector<f64, N>,
    h: f64,
    stats: &mut SolverStats,
) -> Step<N>
where
    S: OdeSystem<N>,
{
    let k2 = system.derivative(t + 0.5 * h, &(y + k1 * (0.5 * h)));
    let k3 = system.derivative(t + 0.5 * h, &(y + k2 * (0.5 * h)));
    let k4 = system.derivative(t + h, &(y + k3 * h));
    let y_new = y + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0);
    let f_new = system.derivative(t + h, &y_new);
    stats.evaluations += 4;
    Step {
        y: y_new,
        f: f_new,
        error: 0.0,
    }
}

fn dormand_prince_step<S, const N: usize>(
    system: &S,
    t: f64,
    y: &SVector<f64, N>,
    k1: &SVector<f64, N>,
    h: f64,
    config: &SolverConfig,
    stats: &mut SolverStats,
) -> Step<N>
where
    S: OdeSystem<N>,
{
    let k2 = system.derivative(t + C2 * h, &(y + k1 * (A21 * h)));
    let k3 = system.derivative(t + C3 * h, &(y + (k1 * A31 + k2 * A32) * h));
    let k4 = system.derivative(t + C4 * h, &(y + (k1 * A41 + k2 * A42 + k3 * A43) * h));
    let k5 = system.derivative(
        t + C5 * h,
        &(y + (k1 * A51 + k2 * A52 + k3 * A53 + k4 * A54) * h),
    );
    let k6 = system.derivative(
        t + h,
        &(y + (k1 * A61 + k2 * A62 + k3 * A63 + k4 * A64 + k5 * A65) * h),
    );
    let y_new = y + (k1 * B1 + k3 * B3 + k4 * B4 + k5 * B5 + k6 * B6) * h;
    let k7 = system.derivative(t + h, &y_new);
    stats.evaluations += 6;

    let error = (k1 * E1 + k3 * E3 + k4 * E4 + k5 * E5 + k6 * E6 + k7 * E7) * h;
    Step {
        error: config.error_norm(&error, y, &y_new),
        y: y_new,
        f: k7,
    }
}

/// Cubic Hermite interpolant on [t, t + h] evaluated at `ts`, written as an
/// offset from `y0` so components that barely move are not lost to rounding.
fn hermite<const N: usize>(
    t: f64,
    h: f64,
    y0: &SVector<f64, N>,
    f0: &SVector<f64, N>,
    y1: &SVector<f64, N>,
    f1: &SVector<f64, N>,
    ts: f64,
) -> SVector<f64, N> {
    let s = (ts - t) / h;
    let s2 = s * s;
    let s3 = s2 * s;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;
    y0 + (y1 - y0) * h01 + (f0 * h10 + f1 * h11) * h
}
