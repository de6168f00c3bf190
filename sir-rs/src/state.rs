use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SirError};
use crate::parameters::{ObservedCaseCounts, require_positive, validate_confirmed_fraction};

/// Compartment sizes (S, I, R). Their sum is the population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
}

impl StateVector {
    pub fn new(susceptible: f64, infected: f64, recovered: f64) -> Self {
        Self {
            susceptible,
            infected,
            recovered,
        }
    }

    pub fn total(&self) -> f64 {
        self.susceptible + self.infected + self.recovered
    }

    pub fn validate(&self, population: f64) -> Result<()> {
        let compartments = [
            ("susceptible", self.susceptible),
            ("infected", self.infected),
            ("recovered", self.recovered),
        ];
        for (name, value) in compartments {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SirError::invalid(format!(
                    "{name} compartment must be non-negative and finite, got {value}"
                )));
            }
        }
        let drift = (self.total() - population).abs();
        if drift > population * 1e-9 {
            return Err(SirError::invalid(format!(
                "compartments sum to {} but the population is {population}",
                self.total()
            )));
        }
        Ok(())
    }
}

impl From<StateVector> for Vector3<f64> {
    fn from(state: StateVector) -> Self {
        Vector3::new(state.susceptible, state.infected, state.recovered)
    }
}

impl From<Vector3<f64>> for StateVector {
    fn from(y: Vector3<f64>) -> Self {
        StateVector::new(y[0], y[1], y[2])
    }
}

/// Scales observed counts up by the confirmed fraction to estimate the true
/// compartment sizes at t = 0.
///
/// Inconsistent inputs (an active or susceptible count below zero) are
/// rejected rather than clamped.
pub fn derive_initial_state(
    observed: &ObservedCaseCounts,
    confirmed_fraction: f64,
    population: f64,
) -> Result<StateVector> {
    validate_confirmed_fraction(confirmed_fraction)?;
    require_positive("population", population)?;
    observed.validate()?;

    let total_cases = observed.cumulative_confirmed / confirmed_fraction;
    let recovered = observed.cumulative_recovered_confirmed / confirmed_fraction
        + observed.additional_recovered_offset;
    let infected = total_cases - recovered;
    let susceptible = population - infected - recovered;

    if infected < 0.0 {
        return Err(SirError::invalid(format!(
            "estimated recovered count {recovered} exceeds estimated total cases {total_cases}"
        )));
    }
    if susceptible < 0.0 {
        return Err(SirError::invalid(format!(
            "estimated cases {total_cases} exceed the population {population}"
        )));
    }

    Ok(StateVector::new(susceptible, infected, recovered))
}
