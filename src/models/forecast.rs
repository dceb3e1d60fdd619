//! Demand forecast and priority rule models.
//!
//! Forecast rows carry required agents per timestamp, skill group, and
//! stream. Priority windows rank streams by importance within recurring
//! time-of-day windows; ranks become understaffing weights.

use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use super::window::{ClockWindow, DaySet};

/// A `(direction, channel)` pair, e.g. inbound voice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stream {
    /// Contact direction (`inbound`, `outbound`, ...).
    pub direction: String,
    /// Channel identifier.
    pub channel: String,
}

impl Stream {
    /// Creates a stream.
    pub fn new(direction: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            direction: direction.into(),
            channel: channel.into(),
        }
    }

    /// Whether this stream is `(direction, channel)`.
    #[inline]
    pub fn matches(&self, direction: &str, channel: &str) -> bool {
        self.direction == direction && self.channel == channel
    }
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.direction, self.channel)
    }
}

/// One forecast row: agents required at a local timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    /// Skill group the demand belongs to.
    pub skill_group_id: String,
    /// Local timestamp (any instant inside the bucket).
    pub timestamp: NaiveDateTime,
    /// Stream the demand arrives on.
    pub stream: Stream,
    /// Required agents. Negative values are rejected by aggregation.
    pub agents: i64,
}

impl ForecastRow {
    /// Creates a forecast row.
    pub fn new(
        skill_group_id: impl Into<String>,
        timestamp: NaiveDateTime,
        stream: Stream,
        agents: i64,
    ) -> Self {
        Self {
            skill_group_id: skill_group_id.into(),
            timestamp,
            stream,
            agents,
        }
    }
}

/// A stream's rank inside a priority window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityEntry {
    /// Stream being ranked.
    pub stream: Stream,
    /// Rank (1 = most important).
    pub rank: u32,
    /// Explicit weight; overrides the rank default when present.
    pub understaff_weight: Option<f64>,
}

impl PriorityEntry {
    /// Creates a rank-only entry.
    pub fn new(stream: Stream, rank: u32) -> Self {
        Self {
            stream,
            rank,
            understaff_weight: None,
        }
    }

    /// Sets an explicit understaffing weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.understaff_weight = Some(weight);
        self
    }
}

/// A recurring window that ranks streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityWindow {
    /// Local clock range `[start, end)`.
    pub window: ClockWindow,
    /// Weekdays the window applies to (empty = all).
    pub days: DaySet,
    /// Stream rankings, in definition order.
    pub priorities: Vec<PriorityEntry>,
}

impl PriorityWindow {
    /// Creates a window applying to every day.
    pub fn new(window: ClockWindow) -> Self {
        Self {
            window,
            days: DaySet::all(),
            priorities: Vec::new(),
        }
    }

    /// Restricts the window to some weekdays.
    pub fn on_days(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.days = DaySet::only(days);
        self
    }

    /// Adds a stream ranking.
    pub fn with_priority(mut self, entry: PriorityEntry) -> Self {
        self.priorities.push(entry);
        self
    }

    /// Whether the window covers a weekday and minute of day.
    #[inline]
    pub fn applies(&self, day: Weekday, minute: u32) -> bool {
        self.days.contains(day) && self.window.contains(minute)
    }

    /// The entry for a stream. Later duplicates override earlier ones.
    pub fn entry_for(&self, direction: &str, channel: &str) -> Option<&PriorityEntry> {
        self.priorities
            .iter()
            .rev()
            .find(|p| p.stream.matches(direction, channel))
    }
}

/// Opening hours of a stream. Parsed and validated, not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingHours {
    /// Stream the hours apply to.
    pub stream: Stream,
    /// Local clock range `[open, close)`.
    pub window: ClockWindow,
    /// Weekdays (empty = all).
    pub days: DaySet,
}

impl OperatingHours {
    /// Whether the stream is open at a weekday and minute of day.
    pub fn is_open(&self, day: Weekday, minute: u32) -> bool {
        self.days.contains(day) && self.window.contains(minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_display_and_match() {
        let s = Stream::new("inbound", "voice");
        assert_eq!(s.to_string(), "inbound:voice");
        assert!(s.matches("inbound", "voice"));
        assert!(!s.matches("outbound", "voice"));
    }

    #[test]
    fn test_window_applies() {
        let w = PriorityWindow::new(ClockWindow::new(480, 1020)).on_days([Weekday::Mon]);
        assert!(w.applies(Weekday::Mon, 600));
        assert!(!w.applies(Weekday::Tue, 600));
        assert!(!w.applies(Weekday::Mon, 1020));
    }

    #[test]
    fn test_entry_for_last_duplicate_wins() {
        let w = PriorityWindow::new(ClockWindow::all_day())
            .with_priority(PriorityEntry::new(Stream::new("inbound", "voice"), 1))
            .with_priority(PriorityEntry::new(Stream::new("inbound", "chat"), 2))
            .with_priority(PriorityEntry::new(Stream::new("inbound", "voice"), 3));
        assert_eq!(w.entry_for("inbound", "voice").map(|p| p.rank), Some(3));
        assert_eq!(w.entry_for("inbound", "chat").map(|p| p.rank), Some(2));
        assert!(w.entry_for("outbound", "email").is_none());
    }

    #[test]
    fn test_operating_hours() {
        let oh = OperatingHours {
            stream: Stream::new("inbound", "voice"),
            window: ClockWindow::new(420, 1260),
            days: DaySet::only([Weekday::Sat]),
        };
        assert!(oh.is_open(Weekday::Sat, 420));
        assert!(!oh.is_open(Weekday::Sat, 1260));
        assert!(!oh.is_open(Weekday::Sun, 600));
    }
}
