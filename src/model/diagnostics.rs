//! Pre-solve configuration checks.
//!
//! Detects setups no schedule can satisfy before the solver is invoked,
//! so a run fails with a named cause instead of a bare "infeasible".

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::eligibility::EligibilityFilter;
use crate::models::{Problem, HOURS_EPSILON};

/// Category of a configuration problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// `min > max` in an employment group's hour bounds.
    InvertedBounds,
    /// Weekly minimum > 0 but no template fits the daily bounds.
    NoEligibleTemplates,
    /// Weekly minimum > 0 but the employee serves no skill group.
    NoSkillGroups,
    /// Weekly minimum exceeds days-in-week × longest eligible template.
    WeeklyMinimumUnreachable,
    /// The solver proved infeasibility without a pre-solve cause.
    SolverInfeasible,
}

/// One configuration problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Category.
    pub kind: DiagnosticKind,
    /// Employee or employment group ID.
    pub entity_id: String,
    /// Description.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic.
    pub fn new(kind: DiagnosticKind, entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.kind, self.entity_id, self.message)
    }
}

/// Lists configuration problems that make the model infeasible.
///
/// An empty result does not prove feasibility; it only rules out the
/// causes checked here.
pub fn diagnose(problem: &Problem, eligibility: &EligibilityFilter) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    for group in &problem.employment_groups {
        for (axis, range) in [("week", &group.hours_per_week), ("day", &group.hours_per_day)] {
            if !range.is_ordered() {
                out.push(Diagnostic::new(
                    DiagnosticKind::InvertedBounds,
                    &group.id,
                    format!("hours per {axis}: min {} > max {}", range.min, range.max),
                ));
            }
        }
    }

    let time = &problem.time;
    for employee in &problem.employees {
        let Some(group) = problem.employment_group(&employee.employment_group_id) else {
            continue;
        };
        let weekly_min = group.hours_per_week.min;
        if weekly_min <= HOURS_EPSILON {
            continue;
        }

        let Some(longest) = eligibility.max_eligible_hours(&group.id) else {
            out.push(Diagnostic::new(
                DiagnosticKind::NoEligibleTemplates,
                &employee.id,
                format!(
                    "weekly minimum {weekly_min}h but no template fits daily bounds {}-{}h of '{}'",
                    group.hours_per_day.min, group.hours_per_day.max, group.id
                ),
            ));
            continue;
        };

        if employee.skill_group_ids.is_empty() {
            out.push(Diagnostic::new(
                DiagnosticKind::NoSkillGroups,
                &employee.id,
                format!("weekly minimum {weekly_min}h but the employee serves no skill group"),
            ));
            continue;
        }

        if let Some(week) = time.weeks().find(|&w| {
            let days = time.days_in_week(w).len() as f64;
            days * longest + HOURS_EPSILON < weekly_min
        }) {
            out.push(Diagnostic::new(
                DiagnosticKind::WeeklyMinimumUnreachable,
                &employee.id,
                format!(
                    "week {week} has {} day(s); longest eligible template is {longest}h, below the {weekly_min}h minimum",
                    time.days_in_week(week).len()
                ),
            ));
        }
    }

    out
}
