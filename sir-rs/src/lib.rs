//! Deterministic SIR epidemic engine.
//!
//! Initial compartments are estimated from reported case counts
//! ([`derive_initial_state`]), then the SIR equations are integrated over a
//! fixed horizon with an optional time-windowed reduction of the contact rate
//! ([`simulate`], [`simulate_with`]). The resulting [`Trajectory`] is plain
//! data for whatever plots or tables consume it.

pub mod environment;
pub mod error;
pub mod model;
pub mod parameters;
pub mod schedule;
pub mod solver;
pub mod state;
pub mod trajectory;

pub use environment::Environment;
pub use error::{Result, SirError};
pub use model::{SirModel, daily_sample_times, simulate, simulate_with};
pub use parameters::{EpidemicParameters, MitigationSchedule, MitigationWindow, ObservedCaseCounts};
pub use schedule::{ContactSchedule, Phase};
pub use solver::{Method, SolverConfig};
pub use state::{StateVector, derive_initial_state};
pub use trajectory::{Peak, Sample, Trajectory, TrajectorySummary};
