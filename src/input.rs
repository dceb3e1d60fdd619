//! JSON input document.
//!
//! Mirrors the document layout one-to-one with `serde` types, then converts
//! it into a validated [`Problem`]. Every parse and reference problem is
//! collected into a single `InputValidation` error.
//!
//! # Sections
//!
//! | Key | Required | Notes |
//! |-----|----------|-------|
//! | `run`, `meta` | no | carried through, not interpreted |
//! | `time` | yes | `days` defaults to 28, `bucket_minutes` to 30 |
//! | `channels`, `skill_groups`, `employment_groups`, `employees`, `shift_templates` | yes | |
//! | `forecast` | yes | `timestamp_local` as `DD-MON-YYYY HH24:MI:SS` |
//! | `priority_rules`, `operating_hours` | no | |
//! | `agent_groups`, `skills` | no | reserved, ignored |
//! | `solver` | no | `name`, `time_limit_seconds`, `mip_gap` |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{SolverBackend, SolverSettings};
use crate::error::{Result, ShiftError};
use crate::models::{
    parse_clock, parse_forecast_timestamp, parse_weekday, Channel, ClockWindow, DaySet, Employee,
    EmploymentGroup, ForecastRow, HoursRange, OperatingHours, PriorityEntry, PriorityWindow,
    Problem, Reserved, ShiftTemplate, SkillGroup, Stream, TimeIndex, DEFAULT_BUCKET_MINUTES,
    DEFAULT_DAYS,
};
use crate::validation::{validate_problem, ValidationError, ValidationErrorKind};

/// The complete input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDocument {
    /// Run identification.
    #[serde(default)]
    pub run: Option<RunInfo>,
    /// Free-form metadata.
    #[serde(default)]
    pub meta: serde_json::Value,
    /// Horizon.
    pub time: TimeSection,
    /// Contact channels.
    #[serde(default)]
    pub channels: Vec<ChannelInput>,
    /// Skill groups.
    pub skill_groups: Vec<NamedInput>,
    /// Employment contracts.
    pub employment_groups: Vec<EmploymentGroupInput>,
    /// Forecast rows.
    #[serde(default)]
    pub forecast: Vec<ForecastInput>,
    /// Stream opening hours.
    #[serde(default)]
    pub operating_hours: Vec<OperatingHoursInput>,
    /// Priority windows, in precedence order (later wins).
    #[serde(default)]
    pub priority_rules: Vec<PriorityRuleInput>,
    /// Employees.
    pub employees: Vec<EmployeeInput>,
    /// Reserved.
    #[serde(default)]
    pub agent_groups: Vec<serde_json::Value>,
    /// Reserved.
    #[serde(default)]
    pub skills: Vec<serde_json::Value>,
    /// Shift templates.
    pub shift_templates: Vec<TemplateInput>,
    /// Solver configuration.
    #[serde(default)]
    pub solver: Option<SolverInput>,
}

/// `run` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInfo {
    #[serde(default)]
    pub schedule_id: Option<String>,
    #[serde(default)]
    pub schedule_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `time` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSection {
    /// ISO date of day 0.
    pub start_date: String,
    /// IANA zone label.
    #[serde(default)]
    pub timezone: String,
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_bucket_minutes")]
    pub bucket_minutes: u32,
}

fn default_days() -> u32 {
    DEFAULT_DAYS
}

fn default_bucket_minutes() -> u32 {
    DEFAULT_BUCKET_MINUTES
}

/// A channel entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInput {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// An `{id, name}` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedInput {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// `{min, max}` hours.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HoursInput {
    pub min: f64,
    pub max: f64,
}

/// An employment group entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmploymentGroupInput {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub hours_per_week: HoursInput,
    pub hours_per_day: HoursInput,
}

/// A forecast row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastInput {
    pub skill_group_id: String,
    pub timestamp_local: String,
    pub direction: String,
    pub channel: String,
    pub agents: i64,
}

/// An operating-hours entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingHoursInput {
    #[serde(default)]
    pub name: Option<String>,
    pub direction: String,
    pub channel: String,
    pub start_time_local: String,
    pub end_time_local: String,
    #[serde(default)]
    pub applies_to_days: Vec<String>,
}

/// A priority window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityRuleInput {
    #[serde(default)]
    pub name: Option<String>,
    pub start_time_local: String,
    pub end_time_local: String,
    #[serde(default)]
    pub applies_to_days: Vec<String>,
    #[serde(default)]
    pub priorities: Vec<PriorityInput>,
}

/// One stream ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityInput {
    pub direction: String,
    pub channel: String,
    pub rank: u32,
    #[serde(default)]
    pub understaff_weight: Option<f64>,
}

/// An employee entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeInput {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub skill_group_ids: Vec<String>,
    pub employment_group_id: String,
    #[serde(default)]
    pub pay_rate: Option<f64>,
}

/// A shift template entry: exactly one of `duration_minutes` and
/// `bucket_work_pattern`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInput {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub start_time_local: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub bucket_work_pattern: Option<Vec<u8>>,
}

/// `solver` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub time_limit_seconds: Option<f64>,
    #[serde(default)]
    pub mip_gap: Option<f64>,
}

impl InputDocument {
    /// Parses a document.
    ///
    /// # Errors
    /// `Json` if the text is not a well-formed document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Solver settings from the `solver` section (defaults when absent).
    ///
    /// # Errors
    /// `InputValidation` for unknown solver names or out-of-range limits.
    pub fn solver_settings(&self) -> Result<SolverSettings> {
        let mut settings = SolverSettings::default();
        let Some(section) = &self.solver else {
            return Ok(settings);
        };

        let mut errors = Vec::new();
        if let Some(name) = &section.name {
            match SolverBackend::from_name(name) {
                Some(backend) => settings.backend = backend,
                None => errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidSolverSetting,
                    format!("unknown solver '{name}'"),
                )),
            }
        }
        if let Some(limit) = section.time_limit_seconds {
            if !(limit.is_finite() && limit > 0.0) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidSolverSetting,
                    format!("solver time_limit_seconds must be > 0, got {limit}"),
                ));
            }
            settings.time_limit_seconds = Some(limit);
        }
        if let Some(gap) = section.mip_gap {
            if !(gap.is_finite() && gap >= 0.0) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidSolverSetting,
                    format!("solver mip_gap must be >= 0, got {gap}"),
                ));
            }
            settings.mip_gap = Some(gap);
        }

        if errors.is_empty() {
            Ok(settings)
        } else {
            Err(ShiftError::InputValidation(errors))
        }
    }

    /// Converts the document into a validated problem.
    ///
    /// # Errors
    /// `InputValidation` listing every malformed value and broken reference.
    pub fn into_problem(self) -> Result<Problem> {
        let mut errors = Vec::new();

        let time = match NaiveDate::parse_from_str(self.time.start_date.trim(), "%Y-%m-%d") {
            Ok(start) => match TimeIndex::new(start, self.time.days, self.time.bucket_minutes) {
                Ok(t) => Some(t.with_timezone(self.time.timezone.clone())),
                Err(e) => {
                    errors.push(ValidationError::new(ValidationErrorKind::InvalidHorizon, e.to_string()));
                    None
                }
            },
            Err(_) => {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MalformedClock,
                    format!("time.start_date '{}' is not an ISO date", self.time.start_date),
                ));
                None
            }
        };

        let mut problem = Problem::new(time.clone().unwrap_or_else(|| {
            TimeIndex::standard(NaiveDate::default())
        }));

        problem.channels = self
            .channels
            .into_iter()
            .map(|c| {
                let mut channel = Channel::new(c.id);
                if let Some(name) = c.name {
                    channel.name = name;
                }
                channel
            })
            .collect();

        problem.skill_groups = self
            .skill_groups
            .into_iter()
            .map(|g| {
                let name = g.name.unwrap_or_else(|| g.id.clone());
                SkillGroup::new(g.id, name)
            })
            .collect();

        problem.employment_groups = self
            .employment_groups
            .into_iter()
            .map(|g| {
                let group = EmploymentGroup::new(
                    g.id,
                    HoursRange::new(g.hours_per_week.min, g.hours_per_week.max),
                    HoursRange::new(g.hours_per_day.min, g.hours_per_day.max),
                );
                match g.name {
                    Some(name) => group.with_name(name),
                    None => group,
                }
            })
            .collect();

        problem.employees = self
            .employees
            .into_iter()
            .map(|e| {
                let mut employee =
                    Employee::new(e.id, e.employment_group_id).with_skill_groups(e.skill_group_ids);
                if let Some(name) = e.name {
                    employee = employee.with_name(name);
                }
                if let Some(rate) = e.pay_rate {
                    employee = employee.with_pay_rate(rate);
                }
                employee
            })
            .collect();

        for t in self.shift_templates {
            let Some(start) = clock(&t.start_time_local, &format!("Template '{}'", t.id), &mut errors)
            else {
                continue;
            };
            let template = match (t.duration_minutes, t.bucket_work_pattern) {
                (Some(minutes), None) => ShiftTemplate::new(t.id, start, minutes),
                (None, Some(pattern)) => ShiftTemplate::with_pattern(t.id, start, pattern),
                _ => {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::AmbiguousTemplate,
                        format!(
                            "Template '{}' needs exactly one of duration_minutes and bucket_work_pattern",
                            t.id
                        ),
                    ));
                    continue;
                }
            };
            problem.templates.push(match t.name {
                Some(name) => template.with_name(name),
                None => template,
            });
        }

        for (i, row) in self.forecast.into_iter().enumerate() {
            match parse_forecast_timestamp(&row.timestamp_local) {
                Some(ts) => problem.forecast.push(ForecastRow::new(
                    row.skill_group_id,
                    ts,
                    Stream::new(row.direction, row.channel),
                    row.agents,
                )),
                None => errors.push(ValidationError::new(
                    ValidationErrorKind::MalformedTimestamp,
                    format!(
                        "Forecast row {i}: timestamp '{}' is not DD-MON-YYYY HH24:MI:SS",
                        row.timestamp_local
                    ),
                )),
            }
        }

        for (i, rule) in self.priority_rules.into_iter().enumerate() {
            let context = format!("Priority rule {i}");
            let window = clock_window(&rule.start_time_local, &rule.end_time_local, &context, &mut errors);
            let days = day_set(&rule.applies_to_days, &context, &mut errors);
            if let Some(window) = window {
                let mut w = PriorityWindow::new(window);
                w.days = days;
                for p in rule.priorities {
                    let mut entry = PriorityEntry::new(Stream::new(p.direction, p.channel), p.rank);
                    entry.understaff_weight = p.understaff_weight;
                    w = w.with_priority(entry);
                }
                problem.priority_windows.push(w);
            }
        }

        for (i, oh) in self.operating_hours.into_iter().enumerate() {
            let context = format!("Operating hours {i}");
            let window = clock_window(&oh.start_time_local, &oh.end_time_local, &context, &mut errors);
            let days = day_set(&oh.applies_to_days, &context, &mut errors);
            if let Some(window) = window {
                problem.operating_hours.push(OperatingHours {
                    stream: Stream::new(oh.direction, oh.channel),
                    window,
                    days,
                });
            }
        }

        problem.agent_groups = Reserved::from_entries(self.agent_groups);
        problem.skills = Reserved::from_entries(self.skills);

        if time.is_some() {
            if let Err(found) = validate_problem(&problem) {
                errors.extend(found);
            }
        }
        if errors.is_empty() {
            Ok(problem)
        } else {
            Err(ShiftError::InputValidation(errors))
        }
    }
}

fn clock(text: &str, context: &str, errors: &mut Vec<ValidationError>) -> Option<u32> {
    let parsed = parse_clock(text);
    if parsed.is_none() {
        errors.push(ValidationError::new(
            ValidationErrorKind::MalformedClock,
            format!("{context}: '{text}' is not a HH:MM clock time"),
        ));
    }
    parsed
}

fn clock_window(
    start: &str,
    end: &str,
    context: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<ClockWindow> {
    let start = clock(start, context, errors);
    let end = clock(end, context, errors);
    Some(ClockWindow::new(start?, end?))
}

fn day_set(days: &[String], context: &str, errors: &mut Vec<ValidationError>) -> DaySet {
    let mut parsed = Vec::with_capacity(days.len());
    for d in days {
        match parse_weekday(d) {
            Some(w) => parsed.push(w),
            None => errors.push(ValidationError::new(
                ValidationErrorKind::UnknownWeekday,
                format!("{context}: unknown weekday '{d}'"),
            )),
        }
    }
    DaySet::only(parsed)
}
