//! Time horizon indexing.
//!
//! The horizon is `days` consecutive local calendar days starting at
//! `start_date`, each split into equal buckets of `bucket_minutes`.
//! A bucket is addressed by `(day, bucket)`; every local timestamp inside
//! the horizon maps to exactly one bucket (the one containing it).
//!
//! # Time Model
//! Forecast timestamps are local wall-clock times. The configured timezone
//! names the zone they are expressed in; it does not shift them, and
//! day-of-week is derived from the local calendar date.

use std::ops::Range;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShiftError};

/// Default horizon length (4 weeks).
pub const DEFAULT_DAYS: u32 = 28;
/// Default bucket width.
pub const DEFAULT_BUCKET_MINUTES: u32 = 30;
/// Minutes in a calendar day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;
/// Days grouped into one week for weekly hour bounds.
pub const DAYS_PER_WEEK: u32 = 7;

/// Forecast timestamp layout: `DD-MON-YYYY HH24:MI:SS`.
const FORECAST_TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

/// A `(day, bucket)` slot in the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeBucket {
    /// Day index, 0-based from `start_date`.
    pub day: u32,
    /// Bucket index within the day, 0-based from midnight.
    pub bucket: u32,
}

impl TimeBucket {
    /// Creates a bucket address.
    pub fn new(day: u32, bucket: u32) -> Self {
        Self { day, bucket }
    }
}

/// Canonical mapping between timestamps and `(day, bucket)` slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeIndex {
    start_date: NaiveDate,
    timezone: String,
    days: u32,
    bucket_minutes: u32,
}

impl TimeIndex {
    /// Creates a horizon index.
    ///
    /// # Errors
    /// `InvalidHorizon` if `days` is zero or `bucket_minutes` does not
    /// evenly divide a day.
    pub fn new(start_date: NaiveDate, days: u32, bucket_minutes: u32) -> Result<Self> {
        if days == 0 {
            return Err(ShiftError::InvalidHorizon {
                reason: "days must be at least 1".into(),
            });
        }
        if bucket_minutes == 0 || MINUTES_PER_DAY % bucket_minutes != 0 {
            return Err(ShiftError::InvalidHorizon {
                reason: format!("bucket_minutes={bucket_minutes} does not divide a day"),
            });
        }
        Ok(Self {
            start_date,
            timezone: String::new(),
            days,
            bucket_minutes,
        })
    }

    /// Creates the default 28-day / 30-minute horizon.
    pub fn standard(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            timezone: String::new(),
            days: DEFAULT_DAYS,
            bucket_minutes: DEFAULT_BUCKET_MINUTES,
        }
    }

    /// Sets the timezone label.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// First local date of the horizon.
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Timezone label the local times are expressed in.
    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// Number of days in the horizon.
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Width of one bucket in minutes.
    pub fn bucket_minutes(&self) -> u32 {
        self.bucket_minutes
    }

    /// Buckets per calendar day.
    #[inline]
    pub fn buckets_per_day(&self) -> u32 {
        MINUTES_PER_DAY / self.bucket_minutes
    }

    /// Total buckets in the horizon.
    pub fn bucket_count(&self) -> usize {
        (self.days * self.buckets_per_day()) as usize
    }

    /// Maps a local timestamp to its bucket, or `None` if the timestamp's
    /// date is outside the horizon.
    ///
    /// Timestamps inside a bucket floor to that bucket.
    pub fn bucket_of(&self, timestamp: NaiveDateTime) -> Option<TimeBucket> {
        let offset = (timestamp.date() - self.start_date).num_days();
        if offset < 0 || offset >= i64::from(self.days) {
            return None;
        }
        let minute_of_day = timestamp.hour() * 60 + timestamp.minute();
        Some(TimeBucket::new(offset as u32, minute_of_day / self.bucket_minutes))
    }

    /// Start timestamp of a bucket, or `None` if outside the horizon.
    pub fn timestamp_of(&self, slot: TimeBucket) -> Option<NaiveDateTime> {
        if slot.day >= self.days || slot.bucket >= self.buckets_per_day() {
            return None;
        }
        let date = self.date_of(slot.day);
        let minutes = i64::from(self.bucket_start_minute(slot.bucket));
        date.and_hms_opt(0, 0, 0)
            .map(|midnight| midnight + Duration::minutes(minutes))
    }

    /// Local calendar date of a day index.
    pub fn date_of(&self, day: u32) -> NaiveDate {
        self.start_date + Duration::days(i64::from(day))
    }

    /// Day of week of a day index. Total: indexes past the horizon extrapolate.
    pub fn day_of_week(&self, day: u32) -> Weekday {
        self.date_of(day).weekday()
    }

    /// Week a day belongs to (`day div 7`, aligned to `start_date`).
    #[inline]
    pub fn week_of(day: u32) -> u32 {
        day / DAYS_PER_WEEK
    }

    /// All week indices touched by the horizon, the last one possibly partial.
    pub fn weeks(&self) -> Range<u32> {
        0..self.days.div_ceil(DAYS_PER_WEEK)
    }

    /// Day indices belonging to a week, clipped to the horizon.
    pub fn days_in_week(&self, week: u32) -> Range<u32> {
        let start = (week * DAYS_PER_WEEK).min(self.days);
        let end = (start + DAYS_PER_WEEK).min(self.days);
        start..end
    }

    /// Minute of day at which a bucket starts.
    #[inline]
    pub fn bucket_start_minute(&self, bucket: u32) -> u32 {
        bucket * self.bucket_minutes
    }

    /// `HH:MM` label of a bucket start.
    pub fn bucket_label(&self, bucket: u32) -> String {
        let minute = self.bucket_start_minute(bucket);
        format!("{:02}:{:02}", minute / 60, minute % 60)
    }

    /// Iterates all buckets in day-major order.
    pub fn iter_buckets(&self) -> impl Iterator<Item = TimeBucket> + '_ {
        let per_day = self.buckets_per_day();
        (0..self.days).flat_map(move |d| (0..per_day).map(move |b| TimeBucket::new(d, b)))
    }
}

/// Parses a forecast timestamp in `DD-MON-YYYY HH24:MI:SS` form.
///
/// The month abbreviation is case-insensitive (`01-JAN-2026 06:00:00`).
pub fn parse_forecast_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), FORECAST_TIMESTAMP_FORMAT).ok()
}

/// Parses a local clock time `HH:MM` (or `HH:MM:SS`) into minutes after midnight.
///
/// `24:00` is accepted as the end of the day.
pub fn parse_clock(text: &str) -> Option<u32> {
    let mut parts = text.trim().split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let seconds: u32 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    let total = hours * 60 + minutes;
    match total.cmp(&MINUTES_PER_DAY) {
        std::cmp::Ordering::Less => Some(total),
        std::cmp::Ordering::Equal if seconds == 0 => Some(total),
        _ => None,
    }
}

/// Parses a day-of-week key (`mon`, `Tuesday`, ...).
pub fn parse_weekday(text: &str) -> Option<Weekday> {
    text.trim().parse::<Weekday>().ok()
}
