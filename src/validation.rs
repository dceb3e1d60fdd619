//! Input validation for shift-scheduling problems.
//!
//! Checks structural integrity of a [`Problem`] before any model is built.
//! Detects:
//! - Duplicate IDs
//! - References to unknown employment groups, skill groups or channels
//! - Inverted or negative hour bounds
//! - Malformed shift templates
//! - Non-positive understaffing weights
//!
//! Every issue is collected; nothing stops at the first error. Forecast
//! rows are checked by the demand aggregator, which reports the row index.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::models::{HoursRange, Problem, Stream, MINUTES_PER_DAY};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// An entity references an ID that doesn't exist.
    UnknownReference,
    /// A forecast timestamp does not parse.
    MalformedTimestamp,
    /// A clock time or date does not parse.
    MalformedClock,
    /// A weekday name does not parse.
    UnknownWeekday,
    /// `min > max`, or a negative bound.
    InvertedBounds,
    /// A template shape cannot produce a coverage mask.
    InvalidTemplate,
    /// An understaffing weight is not strictly positive.
    InvalidWeight,
    /// A template has neither or both of duration and work pattern.
    AmbiguousTemplate,
    /// A horizon parameter is out of range.
    InvalidHorizon,
    /// A solver name or limit is not usable.
    InvalidSolverSetting,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates a scheduling problem.
///
/// Checks:
/// 1. No duplicate channel, skill group, employment group, employee or template IDs
/// 2. Employees reference existing employment and skill groups
/// 3. Hour bounds are non-negative and ordered
/// 4. Templates start within the day and produce a coverage mask
/// 5. Priority weights are strictly positive
/// 6. Streams reference known channels (when channels are declared)
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_problem(problem: &Problem) -> ValidationResult {
    let mut errors = Vec::new();

    let channel_ids = unique_ids(problem.channels.iter().map(|c| c.id.as_str()), "channel", &mut errors);
    let skill_ids = unique_ids(
        problem.skill_groups.iter().map(|g| g.id.as_str()),
        "skill group",
        &mut errors,
    );
    let group_ids = unique_ids(
        problem.employment_groups.iter().map(|g| g.id.as_str()),
        "employment group",
        &mut errors,
    );
    unique_ids(problem.employees.iter().map(|e| e.id.as_str()), "employee", &mut errors);
    unique_ids(problem.templates.iter().map(|t| t.id.as_str()), "shift template", &mut errors);

    // Employees
    for employee in &problem.employees {
        if !group_ids.contains(employee.employment_group_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownReference,
                format!(
                    "Employee '{}' references unknown employment group '{}'",
                    employee.id, employee.employment_group_id
                ),
            ));
        }
        for sg in &employee.skill_group_ids {
            if !skill_ids.contains(sg.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownReference,
                    format!("Employee '{}' references unknown skill group '{sg}'", employee.id),
                ));
            }
        }
    }

    // Employment groups
    for group in &problem.employment_groups {
        check_bounds(&group.id, "week", &group.hours_per_week, &mut errors);
        check_bounds(&group.id, "day", &group.hours_per_day, &mut errors);
    }

    // Templates
    let bucket_minutes = problem.time.bucket_minutes();
    for template in &problem.templates {
        if template.start_minute >= MINUTES_PER_DAY {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidTemplate,
                format!(
                    "Template '{}' starts at minute {}, outside the day",
                    template.id, template.start_minute
                ),
            ));
            continue;
        }
        match template.worked_offsets(bucket_minutes) {
            Ok(offsets) if offsets.is_empty() => errors.push(ValidationError::new(
                ValidationErrorKind::InvalidTemplate,
                format!("Template '{}' works no buckets", template.id),
            )),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::new(ValidationErrorKind::InvalidTemplate, e.to_string())),
        }
    }

    // Priority windows
    for (wi, window) in problem.priority_windows.iter().enumerate() {
        for entry in &window.priorities {
            if let Some(w) = entry.understaff_weight {
                if !(w.is_finite() && w > 0.0) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidWeight,
                        format!(
                            "Priority window {wi}: understaff weight {w} for '{}' must be > 0",
                            entry.stream
                        ),
                    ));
                }
            }
            check_channel(&entry.stream, &channel_ids, &format!("Priority window {wi}"), &mut errors);
        }
    }

    // Operating hours and forecast streams
    for (i, hours) in problem.operating_hours.iter().enumerate() {
        check_channel(&hours.stream, &channel_ids, &format!("Operating hours {i}"), &mut errors);
    }
    let mut seen_streams = HashSet::new();
    for row in &problem.forecast {
        if seen_streams.insert(&row.stream) {
            check_channel(&row.stream, &channel_ids, "Forecast", &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Collects IDs, reporting duplicates.
fn unique_ids<'a>(
    ids: impl Iterator<Item = &'a str>,
    entity: &str,
    errors: &mut Vec<ValidationError>,
) -> HashSet<&'a str> {
    let mut set = HashSet::new();
    for id in ids {
        if !set.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {entity} ID: {id}"),
            ));
        }
    }
    set
}

fn check_bounds(group_id: &str, axis: &str, range: &HoursRange, errors: &mut Vec<ValidationError>) {
    if range.min < 0.0 || !range.is_ordered() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvertedBounds,
            format!(
                "Employment group '{group_id}': hours per {axis} [{}, {}] must satisfy 0 <= min <= max",
                range.min, range.max
            ),
        ));
    }
}

fn check_channel(
    stream: &Stream,
    channels: &HashSet<&str>,
    context: &str,
    errors: &mut Vec<ValidationError>,
) {
    if !channels.is_empty() && !channels.contains(stream.channel.as_str()) {
        errors.push(ValidationError::new(
            ValidationErrorKind::UnknownReference,
            format!("{context} references unknown channel '{}'", stream.channel),
        ));
    }
}
