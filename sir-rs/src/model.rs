use log::info;
use nalgebra::Vector3;

use crate::error::{Result, SirError};
use crate::parameters::{EpidemicParameters, MitigationSchedule};
use crate::schedule::ContactSchedule;
use crate::solver::{OdeSystem, SolverConfig, SolverStats, validate_sample_times};
use crate::state::StateVector;
use crate::trajectory::{Sample, Trajectory};

/// SIR right-hand side for a single regime, i.e. with the contact
/// multiplier held fixed.
#[derive(Debug, Clone, Copy)]
pub struct SirModel {
    pub beta: f64,
    pub gamma: f64,
    pub population: f64,
    pub multiplier: f64,
}

impl SirModel {
    pub fn new(parameters: &EpidemicParameters, multiplier: f64) -> Self {
        Self {
            beta: parameters.beta,
            gamma: parameters.gamma,
            population: parameters.population,
            multiplier,
        }
    }
}

impl OdeSystem<3> for SirModel {
    fn derivative(&self, _t: f64, y: &Vector3<f64>) -> Vector3<f64> {
        let infection = self.multiplier * self.beta * y[1] * y[0] / self.population;
        let recovery = self.gamma * y[1];
        Vector3::new(-infection, infection - recovery, recovery)
    }

    /// The per-capita rate of change of I never exceeds beta * q + gamma.
    /// Keeping h times that rate at or below one holds every stage value of
    /// I positive, so R cannot step backwards.
    fn step_limit(&self) -> Option<f64> {
        Some(1.0 / (self.multiplier * self.beta + self.gamma))
    }
}

/// 0, 1, ..., `horizon_days`.
pub fn daily_sample_times(horizon_days: u32) -> Vec<f64> {
    (0..=horizon_days).map(f64::from).collect()
}

/// Runs the model with an optional single mitigation window and the default
/// solver.
pub fn simulate(
    parameters: &EpidemicParameters,
    initial: &StateVector,
    mitigation: Option<&MitigationSchedule>,
    horizon_days: f64,
    sample_times: &[f64],
) -> Result<Trajectory> {
    let schedule = ContactSchedule::from(mitigation.copied());
    simulate_with(
        parameters,
        initial,
        &schedule,
        horizon_days,
        sample_times,
        &SolverConfig::default(),
    )
}

/// Integrates the SIR system over [0, `horizon_days`] and samples it at
/// `sample_times`.
///
/// The horizon is split at every jump of the schedule and each piece is
/// integrated separately with its own constant multiplier, so no step ever
/// straddles a change of regime.
pub fn simulate_with(
    parameters: &EpidemicParameters,
    initial: &StateVector,
    schedule: &ContactSchedule,
    horizon_days: f64,
    sample_times: &[f64],
    solver: &SolverConfig,
) -> Result<Trajectory> {
    parameters.validate()?;
    schedule.validate()?;
    if !(horizon_days.is_finite() && horizon_days > 0.0) {
        return Err(SirError::invalid(format!(
            "horizon must be positive, got {horizon_days}"
        )));
    }
    if sample_times.is_empty() {
        return Err(SirError::invalid("at least one sample time is required"));
    }
    validate_sample_times(sample_times, 0.0, horizon_days)?;
    initial.validate(parameters.population)?;

    let mut bounds = vec![0.0];
    bounds.extend(schedule.breakpoints(horizon_days));
    bounds.push(horizon_days);

    let mut y: Vector3<f64> = (*initial).into();
    let mut samples = Vec::with_capacity(sample_times.len());
    let mut stats = SolverStats::default();
    let mut next = 0;

    for segment in bounds.windows(2) {
        let (start, end) = (segment[0], segment[1]);
        let count = sample_times[next..]
            .iter()
            .take_while(|&&t| t <= end)
            .count();
        let model = SirModel::new(parameters, schedule.multiplier(start));
        let solution = solver.integrate(
            &model,
            start,
            y,
            end,
            &sample_times[next..next + count],
        )?;
        samples.extend(
            solution
                .samples
                .into_iter()
                .map(|(t, state)| Sample::new(t, state.into())),
        );
        stats += solution.stats;
        y = solution.end;
        next += count;
    }

    info!(
        "simulated {} days in {} segment(s): {} steps, {} evaluations",
        horizon_days,
        bounds.len() - 1,
        stats.accepted,
        stats.evaluations
    );

    Ok(Trajectory::new(samples))
}
