//! Schedule (solution) model.
//!
//! A schedule records, for every employee-day, the chosen shift template
//! (or a day off), and for every worked bucket the skill group that bucket
//! is counted against. It may carry violations found when auditing it
//! against the problem's rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::TimeBucket;

/// One employee-day decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftAssignment {
    /// Employee ID.
    pub employee_id: String,
    /// Day index.
    pub day: u32,
    /// Local calendar date of the day.
    pub date: NaiveDate,
    /// Chosen template, `None` = day off.
    pub template_id: Option<String>,
    /// Minutes worked under the chosen template (0 when off).
    pub worked_minutes: u32,
}

impl ShiftAssignment {
    /// A worked day.
    pub fn working(
        employee_id: impl Into<String>,
        day: u32,
        date: NaiveDate,
        template_id: impl Into<String>,
        worked_minutes: u32,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            day,
            date,
            template_id: Some(template_id.into()),
            worked_minutes,
        }
    }

    /// A day off.
    pub fn off(employee_id: impl Into<String>, day: u32, date: NaiveDate) -> Self {
        Self {
            employee_id: employee_id.into(),
            day,
            date,
            template_id: None,
            worked_minutes: 0,
        }
    }

    /// Whether the employee works this day.
    #[inline]
    pub fn is_working(&self) -> bool {
        self.template_id.is_some()
    }

    /// Worked hours.
    #[inline]
    pub fn worked_hours(&self) -> f64 {
        f64::from(self.worked_minutes) / 60.0
    }
}

/// One worked bucket of one employee, counted against a skill group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAllocation {
    /// Employee ID.
    pub employee_id: String,
    /// Bucket the time falls in.
    pub slot: TimeBucket,
    /// Skill group the time counts toward.
    pub skill_group_id: String,
}

/// A rule violation found in a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related employee ID.
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Classification of schedule violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Template length outside the employment group's daily bounds.
    IneligibleTemplate,
    /// More than one shift on one day.
    MultipleShifts,
    /// Allocated buckets differ from the buckets the shift covers.
    AllocationMismatch,
    /// Employee allocated to a skill group they do not serve.
    SkillMismatch,
    /// Weekly hours outside the employment group's weekly bounds.
    WeeklyHours,
}

impl Violation {
    /// Creates a violation.
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} for '{}': {}", self.violation_type, self.entity_id, self.message)
    }
}

/// A complete schedule for the horizon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// One entry per employee-day, employee-major in input order.
    pub shifts: Vec<ShiftAssignment>,
    /// Worked-bucket allocations, employee-major then time order.
    pub allocations: Vec<BucketAllocation>,
    /// Violations detected in this schedule.
    pub violations: Vec<Violation>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an employee-day decision.
    pub fn add_shift(&mut self, shift: ShiftAssignment) {
        self.shifts.push(shift);
    }

    /// Adds a bucket allocation.
    pub fn add_allocation(&mut self, allocation: BucketAllocation) {
        self.allocations.push(allocation);
    }

    /// Adds a violation.
    pub fn add_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Whether the schedule has no violations.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// The worked shift of an employee on a day, if any.
    pub fn shift_for(&self, employee_id: &str, day: u32) -> Option<&ShiftAssignment> {
        self.shifts
            .iter()
            .find(|s| s.employee_id == employee_id && s.day == day && s.is_working())
    }

    /// All worked shifts of an employee.
    pub fn working_shifts_for(&self, employee_id: &str) -> Vec<&ShiftAssignment> {
        self.shifts
            .iter()
            .filter(|s| s.employee_id == employee_id && s.is_working())
            .collect()
    }

    /// All allocations of an employee.
    pub fn allocations_for(&self, employee_id: &str) -> Vec<&BucketAllocation> {
        self.allocations
            .iter()
            .filter(|a| a.employee_id == employee_id)
            .collect()
    }

    /// Employees allocated to a skill group in a bucket.
    pub fn allocated_count(&self, slot: TimeBucket, skill_group_id: &str) -> usize {
        self.allocations
            .iter()
            .filter(|a| a.slot == slot && a.skill_group_id == skill_group_id)
            .count()
    }

    /// Number of worked employee-days.
    pub fn working_shift_count(&self) -> usize {
        self.shifts.iter().filter(|s| s.is_working()).count()
    }

    /// Total worked hours per employee.
    pub fn hours_by_employee(&self) -> BTreeMap<String, f64> {
        let mut hours: BTreeMap<String, f64> = BTreeMap::new();
        for s in self.shifts.iter().filter(|s| s.is_working()) {
            *hours.entry(s.employee_id.clone()).or_insert(0.0) += s.worked_hours();
        }
        hours
    }
}
