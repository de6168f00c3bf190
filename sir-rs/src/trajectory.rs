use serde::{Deserialize, Serialize};

use crate::parameters::EpidemicParameters;
use crate::schedule::ContactSchedule;
use crate::state::StateVector;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
}

impl Sample {
    pub fn new(t: f64, state: StateVector) -> Self {
        Self {
            t,
            susceptible: state.susceptible,
            infected: state.infected,
            recovered: state.recovered,
        }
    }

    pub fn state(&self) -> StateVector {
        StateVector::new(self.susceptible, self.infected, self.recovered)
    }

    pub fn total(&self) -> f64 {
        self.susceptible + self.infected + self.recovered
    }

    /// Rt = q(t) * beta / gamma * S / N.
    pub fn effective_reproduction(
        &self,
        parameters: &EpidemicParameters,
        schedule: &ContactSchedule,
    ) -> f64 {
        schedule.multiplier(self.t) * parameters.r0() * self.susceptible / parameters.population
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub t: f64,
    pub infected: f64,
}

/// Samples of one simulation run, ordered by strictly increasing time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    samples: Vec<Sample>,
}

impl Trajectory {
    pub(crate) fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest infected count; the earliest sample wins ties.
    pub fn peak(&self) -> Option<Peak> {
        self.samples
            .iter()
            .enumerate()
            .fold(None, |best: Option<Peak>, (index, sample)| match best {
                Some(peak) if peak.infected >= sample.infected => Some(peak),
                _ => Some(Peak {
                    index,
                    t: sample.t,
                    infected: sample.infected,
                }),
            })
    }

    /// Index of the first sample after the peak whose infected count is below
    /// `threshold`. `None` if the peak never reaches the threshold, since I
    /// then never drops back below it.
    pub fn first_below_after_peak(&self, threshold: f64) -> Option<usize> {
        let peak = self.peak()?;
        if peak.infected < threshold {
            return None;
        }
        self.samples[peak.index..]
            .iter()
            .position(|sample| sample.infected < threshold)
            .map(|offset| peak.index + offset)
    }

    /// Residual susceptible count at the last sample.
    pub fn final_susceptible(&self) -> Option<f64> {
        self.samples.last().map(|sample| sample.susceptible)
    }

    /// Largest |S + I + R - population| over all samples.
    pub fn max_conservation_error(&self, population: f64) -> f64 {
        self.samples
            .iter()
            .map(|sample| (sample.total() - population).abs())
            .fold(0.0, f64::max)
    }

    pub fn summarize(&self, population: f64, threshold: f64) -> TrajectorySummary {
        let peak = self.peak();
        TrajectorySummary {
            peak_day: peak.map(|p| p.t),
            peak_infected: peak.map(|p| p.infected),
            threshold,
            day_below_threshold: self
                .first_below_after_peak(threshold)
                .map(|index| self.samples[index].t),
            final_susceptible: self.final_susceptible(),
            attack_fraction: self
                .final_susceptible()
                .map(|s| 1.0 - s / population),
        }
    }

    pub fn csv_rows(&self) -> Vec<Vec<String>> {
        self.samples
            .iter()
            .map(|sample| {
                vec![
                    sample.t.to_string(),
                    sample.susceptible.to_string(),
                    sample.infected.to_string(),
                    sample.recovered.to_string(),
                ]
            })
            .collect()
    }
}

pub const CSV_HEADERS: [&str; 4] = ["day", "susceptible", "infected", "recovered"];

/// Headline numbers of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub peak_day: Option<f64>,
    pub peak_infected: Option<f64>,
    pub threshold: f64,
    pub day_below_threshold: Option<f64>,
    pub final_susceptible: Option<f64>,
    /// Share of the population no longer susceptible at the last sample.
    pub attack_fraction: Option<f64>,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parameters::MitigationSchedule;

    fn trajectory(infected: &[f64]) -> Trajectory {
        Trajectory::new(
            infected
                .iter()
                .enumerate()
                .map(|(day, &i)| {
                    let r = day as f64;
                    Sample::new(r, StateVector::new(100.0 - i - r, i, r))
                })
                .collect(),
        )
    }

    #[test]
    fn test_peak_prefers_earliest_tie() {
        let t = trajectory(&[1.0, 5.0, 9.0, 9.0, 3.0]);
        let peak = t.peak().unwrap();
        assert_eq!(peak.index, 2);
        assert_eq!(peak.t, 2.0);
        assert_eq!(peak.infected, 9.0);
    }

    #[test]
    fn test_first_below_after_peak_ignores_rise() {
        let t = trajectory(&[1.0, 5.0, 9.0, 4.0, 0.5, 0.2]);
        assert_eq!(t.first_below_after_peak(2.0), Some(4));
        assert_eq!(t.first_below_after_peak(0.1), None);
    }

    #[test]
    fn test_first_below_requires_peak_above_threshold() {
        let decaying = trajectory(&[50.0, 30.0, 10.0]);
        assert_eq!(decaying.first_below_after_peak(60.0), None);
        assert_eq!(decaying.summarize(100.0, 60.0).day_below_threshold, None);
        assert_eq!(decaying.first_below_after_peak(20.0), Some(2));
    }

    #[test]
    fn test_empty_trajectory() {
        let t = Trajectory::default();
        assert!(t.is_empty());
        assert!(t.peak().is_none());
        assert!(t.first_below_after_peak(1.0).is_none());
        assert!(t.final_susceptible().is_none());
    }

    #[test]
    fn test_summary_and_rows() {
        let t = trajectory(&[1.0, 5.0, 9.0, 4.0, 0.5]);
        let summary = t.summarize(100.0, 2.0);
        assert_eq!(summary.peak_day, Some(2.0));
        assert_eq!(summary.peak_infected, Some(9.0));
        assert_eq!(summary.day_below_threshold, Some(4.0));
        assert_eq!(summary.final_susceptible, Some(95.5));
        assert_eq!(t.max_conservation_error(100.0), 0.0);

        let rows = t.csv_rows();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[2], vec!["2", "89", "9", "2"]);
    }

    #[test]
    fn test_effective_reproduction() {
        let parameters = EpidemicParameters::new(0.25, 0.05, 100.0, 1.0).unwrap();
        let sample = Sample::new(10.0, StateVector::new(50.0, 10.0, 40.0));
        let open = ContactSchedule::Constant;
        assert_eq!(sample.effective_reproduction(&parameters, &open), 2.5);
        let closed: ContactSchedule = Some(MitigationSchedule::for_days(0.5, 30).unwrap()).into();
        assert_eq!(sample.effective_reproduction(&parameters, &closed), 1.25);
    }
}
