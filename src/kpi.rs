//! Schedule quality metrics (KPIs).
//!
//! Computes staffing indicators from a decoded schedule and its coverage
//! table.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Total understaffed | Σ max(0, required − allocated) over cells |
//! | Weighted objective | Σ weight × understaffed |
//! | Coverage rate | Σ min(required, allocated) / Σ required |
//! | Understaff by stream | Cell shortfall split by each stream's share of demand |
//! | Shift count | Worked employee-days |
//! | Hours by employee | Scheduled hours over the horizon |
//!
//! Agent figures are agent-buckets (one agent for one bucket).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::interpret::CoverageRecord;
use crate::models::Schedule;

/// Schedule performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    /// Unmet agent-buckets.
    pub total_understaffed: u64,
    /// Weighted shortfall (the optimized objective).
    pub weighted_objective: f64,
    /// Required agent-buckets.
    pub total_required: u64,
    /// Allocated agent-buckets (surplus included).
    pub total_allocated: u64,
    /// Fraction of demand met (0.0..1.0); 1.0 without demand.
    pub coverage_rate: f64,
    /// Unmet agent-buckets per skill group.
    pub understaff_by_skill_group: BTreeMap<String, u64>,
    /// Unmet agent-buckets per stream (`direction:channel`), apportioned.
    pub understaff_by_stream: BTreeMap<String, f64>,
    /// Required agent-buckets per stream (`direction:channel`).
    pub required_by_stream: BTreeMap<String, u64>,
    /// Worked employee-days.
    pub shift_count: usize,
    /// Scheduled hours per employee.
    pub hours_by_employee: BTreeMap<String, f64>,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and its coverage table.
    pub fn calculate(schedule: &Schedule, coverage: &[CoverageRecord]) -> Self {
        let mut total_understaffed = 0u64;
        let mut weighted_objective = 0.0;
        let mut total_required = 0u64;
        let mut total_allocated = 0u64;
        let mut met = 0u64;
        let mut understaff_by_skill_group: BTreeMap<String, u64> = BTreeMap::new();
        let mut understaff_by_stream: BTreeMap<String, f64> = BTreeMap::new();
        let mut required_by_stream: BTreeMap<String, u64> = BTreeMap::new();

        for record in coverage {
            total_required += record.required;
            total_allocated += record.allocated;
            total_understaffed += record.understaffed;
            met += record.required.min(record.allocated);
            weighted_objective += record.penalty();

            if record.understaffed > 0 {
                *understaff_by_skill_group
                    .entry(record.skill_group_id.clone())
                    .or_insert(0) += record.understaffed;
            }

            for s in &record.streams {
                let key = format!("{}:{}", s.direction, s.channel);
                *required_by_stream.entry(key.clone()).or_insert(0) += s.agents;
                if record.understaffed > 0 && record.required > 0 {
                    let share = s.agents as f64 / record.required as f64;
                    *understaff_by_stream.entry(key).or_insert(0.0) +=
                        share * record.understaffed as f64;
                }
            }
        }

        let coverage_rate = if total_required == 0 {
            1.0
        } else {
            met as f64 / total_required as f64
        };

        Self {
            total_understaffed,
            weighted_objective,
            total_required,
            total_allocated,
            coverage_rate,
            understaff_by_skill_group,
            understaff_by_stream,
            required_by_stream,
            shift_count: schedule.working_shift_count(),
            hours_by_employee: schedule.hours_by_employee(),
        }
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_understaffed: u64, min_coverage_rate: f64) -> bool {
        self.total_understaffed <= max_understaffed && self.coverage_rate >= min_coverage_rate
    }
}
