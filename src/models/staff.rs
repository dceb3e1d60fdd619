//! Staff model: skill groups, channels, employment groups, employees.
//!
//! An employee belongs to exactly one employment group (the contract that
//! bounds their daily and weekly hours) and may serve several skill groups.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tolerance for comparing hour totals against contract bounds.
pub const HOURS_EPSILON: f64 = 1e-9;

/// A queue of work that demand is forecast for and employees are allocated to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillGroup {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

impl SkillGroup {
    /// Creates a skill group.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A contact channel (voice, chat, email, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Unique identifier, referenced by forecast rows and priority rules.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

impl Channel {
    /// Creates a channel.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
        }
    }
}

/// Closed range of hours `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoursRange {
    /// Lower bound (hours).
    pub min: f64,
    /// Upper bound (hours).
    pub max: f64,
}

impl HoursRange {
    /// Creates an hours range.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `min <= max`.
    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }

    /// Whether a value lies within the range (with tolerance).
    #[inline]
    pub fn contains(&self, hours: f64) -> bool {
        hours >= self.min - HOURS_EPSILON && hours <= self.max + HOURS_EPSILON
    }
}

/// Employment contract shared by a group of employees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmploymentGroup {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Weekly worked-hour bounds.
    pub hours_per_week: HoursRange,
    /// Daily worked-hour bounds (restricts which templates are legal).
    pub hours_per_day: HoursRange,
}

impl EmploymentGroup {
    /// Creates an employment group.
    pub fn new(id: impl Into<String>, hours_per_week: HoursRange, hours_per_day: HoursRange) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            hours_per_week,
            hours_per_day,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A schedulable employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Skill groups this employee may be allocated to.
    pub skill_group_ids: BTreeSet<String>,
    /// The employee's contract.
    pub employment_group_id: String,
    /// Hourly pay (reporting only; cost is not optimized).
    pub pay_rate: Option<f64>,
}

impl Employee {
    /// Creates an employee in the given employment group.
    pub fn new(id: impl Into<String>, employment_group_id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            skill_group_ids: BTreeSet::new(),
            employment_group_id: employment_group_id.into(),
            pay_rate: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds skill groups.
    pub fn with_skill_groups(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.skill_group_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Sets the hourly pay rate.
    pub fn with_pay_rate(mut self, rate: f64) -> Self {
        self.pay_rate = Some(rate);
        self
    }

    /// Whether this employee can serve a skill group.
    #[inline]
    pub fn serves(&self, skill_group_id: &str) -> bool {
        self.skill_group_ids.contains(skill_group_id)
    }
}
