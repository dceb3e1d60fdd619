//! Shift template model.
//!
//! A template is a reusable shift shape: a local start time plus either a
//! contiguous duration or an explicit per-bucket work pattern. Templates are
//! day-agnostic; the model instantiates them once per employee-day.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShiftError};

/// How a template's worked buckets are described.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateShape {
    /// Works every bucket for `minutes` from the start time.
    Duration { minutes: u32 },
    /// Works bucket `i` after the start iff `pattern[i] == 1`.
    Pattern(Vec<u8>),
}

/// A reusable shift shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftTemplate {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Local start time, minutes after midnight.
    pub start_minute: u32,
    /// Worked-bucket description.
    pub shape: TemplateShape,
}

impl ShiftTemplate {
    /// Creates a contiguous template.
    pub fn new(id: impl Into<String>, start_minute: u32, duration_minutes: u32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            start_minute,
            shape: TemplateShape::Duration {
                minutes: duration_minutes,
            },
        }
    }

    /// Creates a template from a per-bucket work pattern.
    pub fn with_pattern(id: impl Into<String>, start_minute: u32, pattern: Vec<u8>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            start_minute,
            shape: TemplateShape::Pattern(pattern),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// `HH:MM` label of the start time.
    pub fn start_label(&self) -> String {
        format!("{:02}:{:02}", self.start_minute / 60, self.start_minute % 60)
    }

    /// Offsets (in buckets, relative to the start bucket) that this template works.
    ///
    /// # Errors
    /// `InvalidTemplate` if the start is not bucket-aligned, the duration is
    /// not a positive multiple of `bucket_minutes`, or the pattern contains
    /// values other than 0 and 1.
    pub fn worked_offsets(&self, bucket_minutes: u32) -> Result<Vec<u32>> {
        if bucket_minutes == 0 || self.start_minute % bucket_minutes != 0 {
            return Err(self.invalid(format!(
                "start {} is not aligned to {bucket_minutes}-minute buckets",
                self.start_label()
            )));
        }
        match &self.shape {
            TemplateShape::Duration { minutes } => {
                if *minutes == 0 || minutes % bucket_minutes != 0 {
                    return Err(self.invalid(format!(
                        "duration {minutes} is not a positive multiple of {bucket_minutes} minutes"
                    )));
                }
                Ok((0..minutes / bucket_minutes).collect())
            }
            TemplateShape::Pattern(pattern) => {
                if let Some(bad) = pattern.iter().find(|&&v| v > 1) {
                    return Err(self.invalid(format!("work pattern value {bad} is not 0 or 1")));
                }
                Ok(pattern
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| **v == 1)
                    .map(|(i, _)| i as u32)
                    .collect())
            }
        }
    }

    fn invalid(&self, reason: String) -> ShiftError {
        ShiftError::InvalidTemplate {
            template_id: self.id.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_offsets() {
        let t = ShiftTemplate::new("D8", 8 * 60, 8 * 60);
        let offsets = t.worked_offsets(30).unwrap();
        assert_eq!(offsets.len(), 16);
        assert_eq!(offsets.first(), Some(&0));
        assert_eq!(offsets.last(), Some(&15));
        assert_eq!(t.start_label(), "08:00");
    }

    #[test]
    fn test_pattern_offsets_skip_breaks() {
        let t = ShiftTemplate::with_pattern("SPLIT", 9 * 60, vec![1, 1, 0, 1]);
        assert_eq!(t.worked_offsets(30).unwrap(), vec![0, 1, 3]);
    }

    #[test]
    fn test_misaligned_start_rejected() {
        let t = ShiftTemplate::new("ODD", 8 * 60 + 15, 60);
        assert!(matches!(
            t.worked_offsets(30),
            Err(ShiftError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_bad_duration_rejected() {
        assert!(ShiftTemplate::new("Z", 0, 0).worked_offsets(30).is_err());
        assert!(ShiftTemplate::new("X", 0, 45).worked_offsets(30).is_err());
    }

    #[test]
    fn test_bad_pattern_value_rejected() {
        let t = ShiftTemplate::with_pattern("P", 0, vec![1, 2]);
        assert!(t.worked_offsets(30).is_err());
    }
}
