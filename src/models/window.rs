//! Local time-of-day windows and day-of-week filters.
//!
//! Priority rules and operating hours are expressed as recurring daily
//! windows: a `[start, end)` clock range plus the weekdays it applies to.
//!
//! # Wrap
//! A window whose end is at or before its start wraps past midnight:
//! `22:00-02:00` contains `23:00` and `01:00`. `00:00-00:00` is the whole day.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::time_index::MINUTES_PER_DAY;

/// A recurring clock interval `[start, end)` in minutes after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockWindow {
    /// Interval start (minute of day, inclusive).
    pub start_minute: u32,
    /// Interval end (minute of day, exclusive). `1440` = midnight.
    pub end_minute: u32,
}

impl ClockWindow {
    /// Creates a clock window.
    pub fn new(start_minute: u32, end_minute: u32) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }

    /// A window covering the whole day.
    pub fn all_day() -> Self {
        Self::new(0, MINUTES_PER_DAY)
    }

    /// Whether the window crosses midnight.
    #[inline]
    pub fn wraps(&self) -> bool {
        self.end_minute <= self.start_minute
    }

    /// Length of the window in minutes.
    pub fn duration_minutes(&self) -> u32 {
        if self.wraps() {
            MINUTES_PER_DAY - self.start_minute + self.end_minute
        } else {
            self.end_minute - self.start_minute
        }
    }

    /// Whether a minute of day falls within this window.
    #[inline]
    pub fn contains(&self, minute: u32) -> bool {
        if self.wraps() {
            minute >= self.start_minute || minute < self.end_minute
        } else {
            minute >= self.start_minute && minute < self.end_minute
        }
    }
}

/// Set of weekdays a recurring window applies to.
///
/// Empty = every day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySet {
    days: Vec<Weekday>,
}

impl DaySet {
    /// Every day of the week.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the given weekdays.
    pub fn only(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut days: Vec<Weekday> = days.into_iter().collect();
        days.sort_by_key(|d| d.num_days_from_monday());
        days.dedup();
        Self { days }
    }

    /// Whether the set is unrestricted.
    pub fn is_all(&self) -> bool {
        self.days.is_empty()
    }

    /// Whether the set includes a weekday.
    pub fn contains(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&day)
    }
}
