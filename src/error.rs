//! Error taxonomy for the shift-scheduling pipeline.
//!
//! Fatal errors carry the offending entity id, field, and value so a failed
//! run can be diagnosed without re-running it. A solver time-out that still
//! produced an incumbent is *not* an error; it is reported through
//! [`crate::interpret::ScheduleResult::time_limit_reached`].

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::model::Diagnostic;
use crate::models::Violation;
use crate::validation::ValidationError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ShiftError>;

/// All failures a run can surface to its caller.
#[derive(Debug, Error)]
pub enum ShiftError {
    /// The input document could not be parsed.
    #[error("failed to parse input document: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema or reference violations found before model building.
    #[error("input validation failed with {} error(s): {}", .0.len(), summarize(.0))]
    InputValidation(Vec<ValidationError>),

    /// Horizon parameters that cannot be indexed.
    #[error("invalid time horizon: {reason}")]
    InvalidHorizon { reason: String },

    /// A forecast row with negative agents or an unknown skill group.
    #[error("invalid demand row {row} (skill group '{skill_group_id}'): {reason}")]
    InvalidDemandRow {
        row: usize,
        skill_group_id: String,
        reason: String,
    },

    /// A timestamp outside `[start_date, start_date + days)`.
    #[error("forecast row {row}: timestamp {timestamp} is outside the horizon starting {start_date} ({days} days)")]
    OutOfHorizon {
        row: usize,
        timestamp: NaiveDateTime,
        start_date: NaiveDate,
        days: u32,
    },

    /// A shift template crossing midnight while multi-day modeling is off.
    #[error("shift template '{template_id}' wraps past midnight; enable allow_wrap to model it")]
    UnsupportedWrap { template_id: String },

    /// A shift template whose shape cannot be turned into a coverage mask.
    #[error("invalid shift template '{template_id}': {reason}")]
    InvalidTemplate { template_id: String, reason: String },

    /// A weight that is not strictly positive.
    #[error("invalid understaff weight {weight} for {context}: weights must be > 0")]
    InvalidWeight { context: String, weight: f64 },

    /// Hour bounds or eligibility make the model impossible to satisfy.
    #[error("configuration is infeasible: {}", summarize(.0))]
    ConfigurationInfeasibility(Vec<Diagnostic>),

    /// The time limit expired before any feasible schedule was found.
    #[error("solver reached its time limit of {seconds}s without a feasible schedule")]
    SolverTimeout { seconds: f64 },

    /// The decoded schedule breaks a hard rule the model should enforce.
    #[error("solver returned a schedule that breaks hard rules: {}", summarize(.0))]
    InconsistentSolution(Vec<Violation>),

    /// The solver backend failed or is unavailable.
    #[error("solver error: {0}")]
    Solver(String),
}

fn summarize<T: std::fmt::Display>(items: &[T]) -> String {
    const SHOWN: usize = 5;
    let mut parts: Vec<String> = items.iter().take(SHOWN).map(|i| i.to_string()).collect();
    if items.len() > SHOWN {
        parts.push(format!("... and {} more", items.len() - SHOWN));
    }
    parts.join("; ")
}
