use std::ops::RangeInclusive;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SirError};

/// World population used by the reference scenarios.
pub const REFERENCE_POPULATION: f64 = 7.77e9;
pub const REFERENCE_BETA: f64 = 0.25;
pub const REFERENCE_GAMMA: f64 = 0.05;
pub const REFERENCE_CONFIRMED_FRACTION: f64 = 0.15;
pub const REFERENCE_HORIZON_DAYS: u32 = 400;
/// Calendar date of t = 0. Display only; the engine never reads it.
pub const REFERENCE_DATE: &str = "2020-03-19";
pub const REFERENCE_CUMULATIVE_CONFIRMED: f64 = 199_258.0;
pub const REFERENCE_CUMULATIVE_RECOVERED: f64 = 81_972.0;
pub const REFERENCE_RECOVERED_OFFSET: f64 = 7_956.0;

// Ranges offered by the interactive controls.
pub const BETA_RANGE: RangeInclusive<f64> = 0.01..=0.5;
pub const GAMMA_RANGE: RangeInclusive<f64> = 0.01..=0.5;
pub const MITIGATION_FACTOR_RANGE: RangeInclusive<f64> = 0.01..=1.0;
pub const MITIGATION_DURATION_RANGE: RangeInclusive<u32> = 10..=400;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpidemicParameters {
    /// Potentially infectious contacts per infected individual per day.
    pub beta: f64,
    /// Reciprocal of the mean infectious duration.
    pub gamma: f64,
    pub population: f64,
    /// Fraction of true infections that end up confirmed.
    pub confirmed_fraction: f64,
}

impl Default for EpidemicParameters {
    fn default() -> Self {
        Self {
            beta: REFERENCE_BETA,
            gamma: REFERENCE_GAMMA,
            population: REFERENCE_POPULATION,
            confirmed_fraction: REFERENCE_CONFIRMED_FRACTION,
        }
    }
}

impl EpidemicParameters {
    pub fn new(beta: f64, gamma: f64, population: f64, confirmed_fraction: f64) -> Result<Self> {
        let parameters = Self {
            beta,
            gamma,
            population,
            confirmed_fraction,
        };
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("beta", self.beta)?;
        require_positive("gamma", self.gamma)?;
        require_positive("population", self.population)?;
        validate_confirmed_fraction(self.confirmed_fraction)
    }

    /// Basic reproduction number β/γ.
    pub fn r0(&self) -> f64 {
        self.beta / self.gamma
    }

    /// Logs a warning for each value outside the range the controls offer.
    /// Such values are still simulated.
    pub fn warn_outside_reference_ranges(&self) {
        if !BETA_RANGE.contains(&self.beta) {
            warn!("beta = {} is outside the reference range {:?}", self.beta, BETA_RANGE);
        }
        if !GAMMA_RANGE.contains(&self.gamma) {
            warn!("gamma = {} is outside the reference range {:?}", self.gamma, GAMMA_RANGE);
        }
    }
}

/// Reported case counts at t = 0, used only to seed the initial state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservedCaseCounts {
    pub cumulative_confirmed: f64,
    pub cumulative_recovered_confirmed: f64,
    /// Added to the estimated recovered count; recoveries are underreported
    /// more severely than active cases.
    pub additional_recovered_offset: f64,
}

impl Default for ObservedCaseCounts {
    fn default() -> Self {
        Self {
            cumulative_confirmed: REFERENCE_CUMULATIVE_CONFIRMED,
            cumulative_recovered_confirmed: REFERENCE_CUMULATIVE_RECOVERED,
            additional_recovered_offset: REFERENCE_RECOVERED_OFFSET,
        }
    }
}

impl ObservedCaseCounts {
    pub fn validate(&self) -> Result<()> {
        require_non_negative("cumulative_confirmed", self.cumulative_confirmed)?;
        require_non_negative(
            "cumulative_recovered_confirmed",
            self.cumulative_recovered_confirmed,
        )?;
        require_non_negative(
            "additional_recovered_offset",
            self.additional_recovered_offset,
        )
    }
}

/// How long the mitigated regime lasts, counted from t = 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationWindow {
    Days(u32),
    Indefinite,
}

impl MitigationWindow {
    /// Time at which the multiplier reverts to 1.
    pub fn end(&self) -> f64 {
        match self {
            MitigationWindow::Days(days) => f64::from(*days),
            MitigationWindow::Indefinite => f64::INFINITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MitigationSchedule {
    /// Multiplier q applied to beta while the window is open.
    pub factor: f64,
    pub window: MitigationWindow,
}

impl MitigationSchedule {
    pub fn new(factor: f64, window: MitigationWindow) -> Result<Self> {
        let schedule = Self { factor, window };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn for_days(factor: f64, days: u32) -> Result<Self> {
        Self::new(factor, MitigationWindow::Days(days))
    }

    pub fn validate(&self) -> Result<()> {
        validate_factor("mitigation factor", self.factor)
    }

    pub fn multiplier(&self, t: f64) -> f64 {
        if t < self.window.end() {
            self.factor
        } else {
            1.0
        }
    }

    pub fn warn_outside_reference_ranges(&self) {
        if !MITIGATION_FACTOR_RANGE.contains(&self.factor) {
            warn!(
                "mitigation factor = {} is outside the reference range {:?}",
                self.factor, MITIGATION_FACTOR_RANGE
            );
        }
        if let MitigationWindow::Days(days) = self.window
            && !MITIGATION_DURATION_RANGE.contains(&days)
        {
            warn!(
                "mitigation duration = {days} days is outside the reference range {:?}",
                MITIGATION_DURATION_RANGE
            );
        }
    }
}

pub(crate) fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SirError::invalid(format!("{name} must be positive and finite, got {value}")))
    }
}

pub(crate) fn require_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SirError::invalid(format!(
            "{name} must be non-negative and finite, got {value}"
        )))
    }
}

pub(crate) fn validate_confirmed_fraction(value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(SirError::invalid(format!(
            "confirmed fraction must lie in (0, 1], got {value}"
        )))
    }
}

pub(crate) fn validate_factor(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SirError::invalid(format!("{name} must lie in [0, 1], got {value}")))
    }
}
