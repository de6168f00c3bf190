use serde::{Deserialize, Serialize};

use crate::error::{Result, SirError};
use crate::parameters::{MitigationSchedule, require_non_negative, validate_factor};

/// One phase of a multi-phase schedule. The factor holds from `start_day`
/// until the next phase starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub start_day: f64,
    pub factor: f64,
}

/// Multiplier q(t) applied to the contact rate. Every variant is piecewise
/// constant in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ContactSchedule {
    #[default]
    Constant,
    Mitigated(MitigationSchedule),
    Phased { phases: Vec<Phase> },
}

impl From<Option<MitigationSchedule>> for ContactSchedule {
    fn from(mitigation: Option<MitigationSchedule>) -> Self {
        match mitigation {
            Some(schedule) => ContactSchedule::Mitigated(schedule),
            None => ContactSchedule::Constant,
        }
    }
}

impl ContactSchedule {
    pub fn phased(phases: Vec<Phase>) -> Result<Self> {
        let schedule = ContactSchedule::Phased { phases };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ContactSchedule::Constant => Ok(()),
            ContactSchedule::Mitigated(schedule) => schedule.validate(),
            ContactSchedule::Phased { phases } => {
                for phase in phases {
                    require_non_negative("phase start", phase.start_day)?;
                    validate_factor("phase factor", phase.factor)?;
                }
                if phases.windows(2).any(|w| w[1].start_day <= w[0].start_day) {
                    return Err(SirError::invalid(
                        "phase start days must be strictly increasing",
                    ));
                }
                Ok(())
            }
        }
    }

    pub fn multiplier(&self, t: f64) -> f64 {
        match self {
            ContactSchedule::Constant => 1.0,
            ContactSchedule::Mitigated(schedule) => schedule.multiplier(t),
            ContactSchedule::Phased { phases } => phases
                .iter()
                .take_while(|phase| phase.start_day <= t)
                .last()
                .map_or(1.0, |phase| phase.factor),
        }
    }

    /// Times strictly inside (0, horizon) where q(t) jumps.
    pub fn breakpoints(&self, horizon: f64) -> Vec<f64> {
        let jumps: Vec<f64> = match self {
            ContactSchedule::Constant => Vec::new(),
            ContactSchedule::Mitigated(schedule) if schedule.factor != 1.0 => {
                vec![schedule.window.end()]
            }
            ContactSchedule::Mitigated(_) => Vec::new(),
            ContactSchedule::Phased { phases } => {
                let mut previous = 1.0;
                let mut jumps = Vec::new();
                for phase in phases {
                    if phase.factor != previous {
                        jumps.push(phase.start_day);
                    }
                    previous = phase.factor;
                }
                jumps
            }
        };
        jumps
            .into_iter()
            .filter(|&t| t > 0.0 && t < horizon)
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parameters::MitigationWindow;

    #[test]
    fn test_constant_has_no_breakpoints() {
        let schedule = ContactSchedule::Constant;
        assert_eq!(schedule.multiplier(12.0), 1.0);
        assert!(schedule.breakpoints(400.0).is_empty());
    }

    #[test]
    fn test_mitigated_breakpoint_inside_horizon() {
        let schedule: ContactSchedule = Some(MitigationSchedule::for_days(0.5, 180).unwrap()).into();
        assert_eq!(schedule.breakpoints(400.0), vec![180.0]);
        assert!(schedule.breakpoints(100.0).is_empty());
    }

    #[test]
    fn test_indefinite_and_degenerate_mitigation() {
        let forever = ContactSchedule::Mitigated(
            MitigationSchedule::new(0.5, MitigationWindow::Indefinite).unwrap(),
        );
        assert!(forever.breakpoints(400.0).is_empty());

        // A factor of one never changes the dynamics, so there is nothing to split on.
        let neutral = ContactSchedule::Mitigated(MitigationSchedule::for_days(1.0, 50).unwrap());
        assert!(neutral.breakpoints(400.0).is_empty());
    }

    #[test]
    fn test_phased_multiplier() {
        let schedule = ContactSchedule::phased(vec![
            Phase {
                start_day: 10.0,
                factor: 0.4,
            },
            Phase {
                start_day: 60.0,
                factor: 0.8,
            },
        ])
        .unwrap();
        assert_eq!(schedule.multiplier(0.0), 1.0);
        assert_eq!(schedule.multiplier(10.0), 0.4);
        assert_eq!(schedule.multiplier(59.5), 0.4);
        assert_eq!(schedule.multiplier(60.0), 0.8);
        assert_eq!(schedule.breakpoints(400.0), vec![10.0, 60.0]);
    }

    #[test]
    fn test_phased_breakpoints_skip_repeated_factors() {
        let schedule = ContactSchedule::phased(vec![
            Phase {
                start_day: 0.0,
                factor: 0.5,
            },
            Phase {
                start_day: 30.0,
                factor: 0.5,
            },
            Phase {
                start_day: 90.0,
                factor: 1.0,
            },
        ])
        .unwrap();
        assert_eq!(schedule.breakpoints(400.0), vec![90.0]);
    }

    #[test]
    fn test_breakpoint_at_tiny_start_day() {
        let schedule = ContactSchedule::phased(vec![Phase {
            start_day: 1e-300,
            factor: 0.2,
        }])
        .unwrap();
        assert_eq!(schedule.breakpoints(400.0), vec![1e-300]);
        assert_eq!(schedule.multiplier(1e-300), 0.2);
    }

    #[test]
    fn test_phased_rejects_unordered_phases() {
        let result = ContactSchedule::phased(vec![
            Phase {
                start_day: 30.0,
                factor: 0.4,
            },
            Phase {
                start_day: 30.0,
                factor: 0.8,
            },
        ]);
        assert!(matches!(result, Err(SirError::InvalidParameter(_))));
    }

    #[test]
    fn test_schedule_deserializes_tagged() {
        let schedule: ContactSchedule = serde_json::from_str(
            r#"{"kind": "mitigated", "factor": 0.5, "window": {"days": 90}}"#,
        )
        .unwrap();
        assert_eq!(schedule.multiplier(89.0), 0.5);
        assert_eq!(schedule.multiplier(90.0), 1.0);
    }
}
