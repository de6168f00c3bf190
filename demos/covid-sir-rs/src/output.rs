use std::collections::BTreeMap;

use serde::Serialize;
use sir::trajectory::CSV_HEADERS;
use sir::{ContactSchedule, Environment, StateVector, TrajectorySummary};

use crate::parameters::ScenarioConfig;
use crate::scenario::ScenarioResults;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// SHA-256 of the input section.
    pub fingerprint: String,
    pub replicate: u64,
    pub reference_date: String,
    pub initial_state: StateVector,
    pub scenarios: BTreeMap<String, ScenarioReport>,
}

#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub schedule: ContactSchedule,
    #[serde(flatten)]
    pub summary: TrajectorySummary,
}

impl RunSummary {
    pub fn new<I>(env: &Environment<I>, config: &ScenarioConfig, results: &ScenarioResults) -> Self {
        let population = config.parameters.population;
        RunSummary {
            fingerprint: env.fingerprint(),
            replicate: env.replicate,
            reference_date: config.reference_date.clone(),
            initial_state: results.initial,
            scenarios: results
                .runs
                .iter()
                .map(|run| {
                    let report = ScenarioReport {
                        schedule: run.schedule.clone(),
                        summary: run.trajectory.summarize(population, config.threshold),
                    };
                    (run.name.to_string(), report)
                })
                .collect(),
        }
    }
}

/// Writes one CSV per scenario, then the summary.
pub fn write<I>(
    env: &Environment<I>,
    config: &ScenarioConfig,
    results: &ScenarioResults,
) -> sir::Result<()> {
    for run in &results.runs {
        env.write_csv(
            &format!("sir_{}.csv", run.name),
            &CSV_HEADERS,
            &run.trajectory.csv_rows(),
        )?;
    }
    env.write_json("summary.json", &RunSummary::new(env, config, results))
}

#[cfg(test)]
mod test {
    use std::fs;

    use serde_json::{Value, json};

    use super::*;
    use crate::scenario;

    #[test]
    fn test_writes_csv_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::from_json(json!({
            "input": {
                "replicate": 2,
                "schedule": { "kind": "mitigated", "factor": 0.5, "window": { "days": 180 } }
            },
            "output": { "spec": "filesystem", "dir": dir.path().to_str().unwrap() }
        }));
        let config = ScenarioConfig::resolve(&env).unwrap();
        let results = scenario::run(&config).unwrap();
        write(&env, &config, &results).unwrap();

        let csv = fs::read_to_string(dir.path().join("sir_unmitigated.csv")).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("day,susceptible,infected,recovered"));
        assert_eq!(lines.count(), 401);
        assert!(dir.path().join("sir_mitigated.csv").exists());

        let summary: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["replicate"], 2);
        assert_eq!(summary["reference_date"], "2020-03-19");
        assert_eq!(summary["fingerprint"], env.fingerprint());
        let peak_day = summary["scenarios"]["unmitigated"]["peak_day"].as_f64().unwrap();
        assert!((50.0..=70.0).contains(&peak_day));
        assert_eq!(summary["scenarios"]["unmitigated"]["schedule"]["kind"], "constant");
        assert_eq!(summary["scenarios"]["mitigated"]["schedule"]["factor"], 0.5);
        assert!(summary["scenarios"]["mitigated"]["peak_infected"].is_number());
    }
}
