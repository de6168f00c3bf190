use serde::{Deserialize, Serialize};
use serde_json::Value;
use sir::parameters::{REFERENCE_DATE, REFERENCE_HORIZON_DAYS};
use sir::{ContactSchedule, EpidemicParameters, Environment, ObservedCaseCounts, SolverConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub parameters: EpidemicParameters,
    pub observed: ObservedCaseCounts,
    pub schedule: ContactSchedule,
    pub horizon_days: u32,
    /// Calendar date of day 0, passed through to the summary.
    pub reference_date: String,
    /// Infected count below which the epidemic is reported as receding.
    pub threshold: f64,
    pub solver: SolverConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            parameters: EpidemicParameters::default(),
            observed: ObservedCaseCounts::default(),
            schedule: ContactSchedule::Constant,
            horizon_days: REFERENCE_HORIZON_DAYS,
            reference_date: REFERENCE_DATE.to_string(),
            threshold: 1e6,
            solver: SolverConfig::default(),
        }
    }
}

impl ScenarioConfig {
    /// Builds the scenario from the `scenario` TOML file, if one is
    /// registered, with the run document's input section layered on top.
    pub fn resolve<I>(env: &Environment<I>) -> sir::Result<Self> {
        let mut merged: Value = env
            .read_toml("scenario")?
            .unwrap_or_else(|| Value::Object(Default::default()));
        merge(&mut merged, &Value::Object(env.input_json().clone()));
        Ok(serde_json::from_value(merged)?)
    }

    pub fn warn_outside_reference_ranges(&self) {
        self.parameters.warn_outside_reference_ranges();
        if let ContactSchedule::Mitigated(mitigation) = &self.schedule {
            mitigation.warn_outside_reference_ranges();
        }
    }
}

/// Recursively overlays `overrides` onto `base`; objects merge key by key,
/// anything else replaces.
fn merge(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                merge(base.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (base, value) => *base = value.clone(),
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use serde_json::json;
    use sir::{MitigationSchedule, MitigationWindow};

    use super::*;

    #[test]
    fn test_empty_input_is_reference_scenario() {
        let env = Environment::from_json(json!({ "input": {} }));
        let config = ScenarioConfig::resolve(&env).unwrap();
        assert_eq!(config, ScenarioConfig::default());
        assert_eq!(config.parameters.beta, 0.25);
        assert_eq!(config.horizon_days, 400);
    }

    #[test]
    fn test_partial_overrides() {
        let env = Environment::from_json(json!({
            "input": {
                "parameters": { "beta": 0.3 },
                "schedule": { "kind": "mitigated", "factor": 0.5, "window": { "days": 180 } },
                "seed": 1
            }
        }));
        let config = ScenarioConfig::resolve(&env).unwrap();
        assert_eq!(config.parameters.beta, 0.3);
        assert_eq!(config.parameters.gamma, 0.05);
        assert_eq!(
            config.schedule,
            ContactSchedule::Mitigated(
                MitigationSchedule::new(0.5, MitigationWindow::Days(180)).unwrap()
            )
        );
    }

    #[test]
    fn test_input_overrides_scenario_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        fs::write(
            &path,
            "horizon_days = 200\n\n[parameters]\nbeta = 0.2\ngamma = 0.1\n",
        )
        .unwrap();
        let env = Environment::from_json(json!({
            "input": { "parameters": { "gamma": 0.07 } },
            "model": { "files": { "scenario": path.to_str().unwrap() } }
        }));
        let config = ScenarioConfig::resolve(&env).unwrap();
        assert_eq!(config.horizon_days, 200);
        assert_eq!(config.parameters.beta, 0.2);
        assert_eq!(config.parameters.gamma, 0.07);
    }

    #[test]
    fn test_shipped_scenario_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/mitigated.toml");
        let env = Environment::from_json(json!({
            "model": { "files": { "scenario": path } }
        }));
        let config = ScenarioConfig::resolve(&env).unwrap();
        let defaults = ScenarioConfig::default();
        assert_eq!(config.parameters, defaults.parameters);
        assert_eq!(config.observed, defaults.observed);
        assert_eq!(config.schedule.multiplier(179.0), 0.5);
        assert_eq!(config.schedule.multiplier(180.0), 1.0);
    }

    #[test]
    fn test_merge_replaces_scalars_and_merges_objects() {
        let mut base = json!({ "a": { "x": 1, "y": 2 }, "b": 3 });
        merge(&mut base, &json!({ "a": { "y": 5 }, "b": [1] }));
        assert_eq!(base, json!({ "a": { "x": 1, "y": 5 }, "b": [1] }));
    }
}
