use log::info;
use sir::{
    ContactSchedule, StateVector, Trajectory, daily_sample_times, derive_initial_state,
    simulate_with,
};

use crate::parameters::ScenarioConfig;

pub struct ScenarioRun {
    pub name: &'static str,
    pub schedule: ContactSchedule,
    pub trajectory: Trajectory,
}

pub struct ScenarioResults {
    pub initial: StateVector,
    pub runs: Vec<ScenarioRun>,
}

/// Runs the unmitigated baseline and, when the configured schedule changes
/// the contact rate at all, the mitigated variant from the same start.
pub fn run(config: &ScenarioConfig) -> sir::Result<ScenarioResults> {
    let parameters = &config.parameters;
    let initial = derive_initial_state(
        &config.observed,
        parameters.confirmed_fraction,
        parameters.population,
    )?;
    info!(
        "initial state: S = {:.0}, I = {:.0}, R = {:.0}",
        initial.susceptible, initial.infected, initial.recovered
    );

    let horizon = f64::from(config.horizon_days);
    let times = daily_sample_times(config.horizon_days);

    let mut schedules = vec![("unmitigated", ContactSchedule::Constant)];
    if config.schedule != ContactSchedule::Constant {
        schedules.push(("mitigated", config.schedule.clone()));
    }

    let runs = schedules
        .into_iter()
        .map(|(name, schedule)| {
            let trajectory =
                simulate_with(parameters, &initial, &schedule, horizon, &times, &config.solver)?;
            if let Some(peak) = trajectory.peak() {
                info!(
                    "{name}: peak of {:.0} infected on day {}",
                    peak.infected, peak.t
                );
            }
            Ok(ScenarioRun {
                name,
                schedule,
                trajectory,
            })
        })
        .collect::<sir::Result<Vec<_>>>()?;

    Ok(ScenarioResults { initial, runs })
}
