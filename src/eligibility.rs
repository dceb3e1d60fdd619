//! Shift template coverage and eligibility.
//!
//! Expands every template into a coverage mask (the buckets it works,
//! relative to the day it is assigned on) and decides, per employment
//! group, which templates are legal: a template is eligible iff its worked
//! hours lie within the group's daily bounds.
//!
//! # Wrap
//! A template that works past midnight has mask entries with
//! `day_offset > 0`. Those are rejected with `UnsupportedWrap` unless
//! [`ModelOptions::allow_wrap`] is set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::ModelOptions;
use crate::error::{Result, ShiftError};
use crate::models::{EmploymentGroup, Problem, ShiftTemplate, TimeIndex};

/// A bucket worked by a template, relative to its assignment day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoveredBucket {
    /// Days after the assignment day (0 = same day).
    pub day_offset: u32,
    /// Bucket index within that day.
    pub bucket: u32,
}

/// Buckets a template works, in time order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageMask {
    /// Template the mask belongs to.
    pub template_id: String,
    /// Worked buckets, in time order.
    pub slots: Vec<CoveredBucket>,
    /// `slots.len() × bucket_minutes`.
    pub worked_minutes: u32,
}

impl CoverageMask {
    /// Worked hours.
    #[inline]
    pub fn worked_hours(&self) -> f64 {
        f64::from(self.worked_minutes) / 60.0
    }

    /// Whether any worked bucket falls on a later day.
    pub fn wraps(&self) -> bool {
        self.slots.iter().any(|s| s.day_offset > 0)
    }

    /// Whether the template works `bucket` on `day_offset`.
    pub fn covers(&self, day_offset: u32, bucket: u32) -> bool {
        self.slots
            .binary_search(&CoveredBucket { day_offset, bucket })
            .is_ok()
    }
}

/// Computes a template's coverage mask.
///
/// # Errors
/// - `InvalidTemplate` for misaligned starts or malformed shapes.
/// - `UnsupportedWrap` if the template crosses midnight and `allow_wrap` is off.
pub fn coverage_mask(template: &ShiftTemplate, time: &TimeIndex, allow_wrap: bool) -> Result<CoverageMask> {
    let per_day = time.buckets_per_day();
    let start = template.start_minute / time.bucket_minutes();
    let slots: Vec<CoveredBucket> = template
        .worked_offsets(time.bucket_minutes())?
        .into_iter()
        .map(|offset| {
            let absolute = start + offset;
            CoveredBucket {
                day_offset: absolute / per_day,
                bucket: absolute % per_day,
            }
        })
        .collect();

    let mask = CoverageMask {
        template_id: template.id.clone(),
        worked_minutes: slots.len() as u32 * time.bucket_minutes(),
        slots,
    };
    if mask.wraps() && !allow_wrap {
        return Err(ShiftError::UnsupportedWrap {
            template_id: template.id.clone(),
        });
    }
    Ok(mask)
}

/// Whether a template's worked hours satisfy an employment group's daily bounds.
#[inline]
pub fn is_eligible(mask: &CoverageMask, group: &EmploymentGroup) -> bool {
    group.hours_per_day.contains(mask.worked_hours())
}

/// Coverage masks and the eligibility table for one problem.
///
/// Masks are computed once per template; eligibility is memoized per
/// `(template, employment group)` pair.
#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    masks: Vec<CoverageMask>,
    eligible: HashMap<(usize, usize), bool>,
    by_group: HashMap<String, Vec<usize>>,
}

impl EligibilityFilter {
    /// Builds masks for every template and eligibility for every pair.
    ///
    /// # Errors
    /// Propagates the first template error from [`coverage_mask`].
    pub fn new(problem: &Problem, options: &ModelOptions) -> Result<Self> {
        let masks = problem
            .templates
            .iter()
            .map(|t| coverage_mask(t, &problem.time, options.allow_wrap))
            .collect::<Result<Vec<_>>>()?;

        let mut eligible = HashMap::new();
        let mut by_group: HashMap<String, Vec<usize>> = HashMap::new();
        for (gi, group) in problem.employment_groups.iter().enumerate() {
            let list = by_group.entry(group.id.clone()).or_default();
            for (ti, mask) in masks.iter().enumerate() {
                let ok = is_eligible(mask, group);
                eligible.insert((ti, gi), ok);
                if ok {
                    list.push(ti);
                }
            }
            debug!(
                employment_group = %group.id,
                eligible = list.len(),
                templates = masks.len(),
                "template eligibility"
            );
        }

        Ok(Self {
            masks,
            eligible,
            by_group,
        })
    }

    /// Mask of the template at `index` (input order).
    pub fn mask(&self, index: usize) -> Option<&CoverageMask> {
        self.masks.get(index)
    }

    /// All masks, in template input order.
    pub fn masks(&self) -> &[CoverageMask] {
        &self.masks
    }

    /// Memoized eligibility of template `template_index` for group `group_index`.
    pub fn is_eligible_index(&self, template_index: usize, group_index: usize) -> bool {
        self.eligible
            .get(&(template_index, group_index))
            .copied()
            .unwrap_or(false)
    }

    /// Template indices eligible for an employment group, in input order.
    ///
    /// Empty for unknown groups.
    pub fn eligible_templates(&self, employment_group_id: &str) -> &[usize] {
        self.by_group
            .get(employment_group_id)
            .map_or(&[], Vec::as_slice)
    }

    /// Longest eligible template for a group, in hours.
    pub fn max_eligible_hours(&self, employment_group_id: &str) -> Option<f64> {
        self.eligible_templates(employment_group_id)
            .iter()
            .map(|&ti| self.masks[ti].worked_hours())
            .fold(None, |acc, h| Some(acc.map_or(h, |a: f64| a.max(h))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HoursRange;
    use chrono::NaiveDate;

    fn time() -> TimeIndex {
        TimeIndex::standard(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap())
    }

    fn full_time() -> EmploymentGroup {
        EmploymentGroup::new("FT", HoursRange::new(32.0, 40.0), HoursRange::new(8.0, 8.0))
    }

    fn part_time() -> EmploymentGroup {
        EmploymentGroup::new("PT", HoursRange::new(0.0, 24.0), HoursRange::new(4.0, 6.0))
    }

    #[test]
    fn test_mask_for_day_template() {
        let m = coverage_mask(&ShiftTemplate::new("D8", 480, 480), &time(), false).unwrap();
        assert_eq!(m.slots.len(), 16);
        assert_eq!(m.slots[0], CoveredBucket { day_offset: 0, bucket: 16 });
        assert_eq!(m.slots[15], CoveredBucket { day_offset: 0, bucket: 31 });
        assert_eq!(m.worked_minutes, 480);
        assert!(m.covers(0, 20));
        assert!(!m.covers(0, 32));
        assert!(!m.wraps());
    }

    #[test]
    fn test_mask_for_pattern_counts_worked_only() {
        let t = ShiftTemplate::with_pattern("SPLIT", 540, vec![1, 1, 0, 0, 1, 1]);
        let m = coverage_mask(&t, &time(), false).unwrap();
        assert_eq!(m.worked_minutes, 120);
        assert!(m.covers(0, 18));
        assert!(!m.covers(0, 20));
        assert!(m.covers(0, 22));
    }

    #[test]
    fn test_wrapping_template_rejected_by_default() {
        let t = ShiftTemplate::new("LATE", 23 * 60 + 30, 60);
        assert!(matches!(
            coverage_mask(&t, &time(), false),
            Err(ShiftError::UnsupportedWrap { template_id }) if template_id == "LATE"
        ));
    }

    #[test]
    fn test_wrapping_template_with_opt_in() {
        let t = ShiftTemplate::new("LATE", 23 * 60 + 30, 60);
        let m = coverage_mask(&t, &time(), true).unwrap();
        assert_eq!(
            m.slots,
            vec![
                CoveredBucket { day_offset: 0, bucket: 47 },
                CoveredBucket { day_offset: 1, bucket: 0 },
            ]
        );
        assert!(m.wraps());
    }

    #[test]
    fn test_eligibility_by_daily_bounds() {
        let t = time();
        let eight = coverage_mask(&ShiftTemplate::new("D8", 480, 480), &t, false).unwrap();
        let four = coverage_mask(&ShiftTemplate::new("D4", 480, 240), &t, false).unwrap();
        let seven = coverage_mask(&ShiftTemplate::new("D7", 480, 420), &t, false).unwrap();
        assert!(is_eligible(&eight, &full_time()));
        assert!(!is_eligible(&four, &full_time()));
        assert!(is_eligible(&four, &part_time()));
        assert!(!is_eligible(&seven, &part_time()));
        assert!(!is_eligible(&seven, &full_time()));
    }

    #[test]
    fn test_filter_tables() {
        let problem = Problem::new(time())
            .with_employment_group(full_time())
            .with_employment_group(part_time())
            .with_template(ShiftTemplate::new("D8", 480, 480))
            .with_template(ShiftTemplate::new("D4", 480, 240))
            .with_template(ShiftTemplate::new("E6", 720, 360));
        let f = EligibilityFilter::new(&problem, &ModelOptions::default()).unwrap();
        assert_eq!(f.eligible_templates("FT"), &[0]);
        assert_eq!(f.eligible_templates("PT"), &[1, 2]);
        assert!(f.eligible_templates("nope").is_empty());
        assert!(f.is_eligible_index(0, 0));
        assert!(!f.is_eligible_index(0, 1));
        assert_eq!(f.max_eligible_hours("PT"), Some(6.0));
        assert_eq!(f.max_eligible_hours("nope"), None);
        assert_eq!(f.masks().len(), 3);
    }

    #[test]
    fn test_filter_propagates_wrap_error() {
        let problem = Problem::new(time())
            .with_employment_group(full_time())
            .with_template(ShiftTemplate::new("NIGHT", 22 * 60, 480));
        assert!(EligibilityFilter::new(&problem, &ModelOptions::default()).is_err());
        let opts = ModelOptions::default().with_allow_wrap(true);
        let f = EligibilityFilter::new(&problem, &opts).unwrap();
        assert!(f.mask(0).unwrap().wraps());
        assert_eq!(f.eligible_templates("FT"), &[0]);
    }
}
