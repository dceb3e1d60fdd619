//! Solution interpretation.
//!
//! Decodes solver values into a [`Schedule`], a coverage table and KPIs,
//! and audits the decoded schedule against the hard rules.
//!
//! # Status handling
//!
//! | Solver status | Outcome |
//! |---------------|---------|
//! | Optimal / Feasible | result |
//! | TimeLimit with incumbent | result, `time_limit_reached = true`, warning |
//! | TimeLimit without incumbent | `SolverTimeout` |
//! | Infeasible | `ConfigurationInfeasibility` |
//! | Error | `Solver` |
//!
//! A decoded schedule that fails [`verify`] is rejected with
//! `InconsistentSolution`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::config::SolverSettings;
use crate::demand::CellKey;
use crate::eligibility::EligibilityFilter;
use crate::error::{Result, ShiftError};
use crate::kpi::ScheduleKpi;
use crate::milp::{MilpSolution, SolveStatus};
use crate::model::{
    diagnose, AllocateVar, Diagnostic, DiagnosticKind, ShiftModel, ShiftModelBuilder,
};
use crate::models::{
    BucketAllocation, Problem, Schedule, ShiftAssignment, TimeBucket, TimeIndex, Violation,
    ViolationType,
};

/// Demand of one stream within a coverage cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDemand {
    /// Contact direction.
    pub direction: String,
    /// Channel.
    pub channel: String,
    /// Required agents.
    pub agents: u64,
}

/// Staffing outcome of one `(day, bucket, skill_group)` cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRecord {
    /// Bucket.
    pub slot: TimeBucket,
    /// Skill group.
    pub skill_group_id: String,
    /// Required agents.
    pub required: u64,
    /// Employees allocated.
    pub allocated: u64,
    /// Unmet demand, `max(0, required - allocated)`.
    pub understaffed: u64,
    /// Understaffing weight of the cell.
    pub weight: f64,
    /// Per-stream breakdown of `required`.
    pub streams: Vec<StreamDemand>,
}

impl CoverageRecord {
    /// Agents beyond demand.
    pub fn surplus(&self) -> u64 {
        self.allocated.saturating_sub(self.required)
    }

    /// Weighted shortfall contribution.
    pub fn penalty(&self) -> f64 {
        self.weight * self.understaffed as f64
    }
}

/// Result of a solved run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// Solver status.
    pub status: SolveStatus,
    /// `Σ weight × understaffed` of the decoded schedule.
    pub objective: f64,
    /// The solver stopped at its time limit; the schedule may be suboptimal.
    pub time_limit_reached: bool,
    /// Solver wall-clock seconds.
    pub solve_seconds: f64,
    /// Shifts and allocations.
    pub schedule: Schedule,
    /// Coverage per cell, in cell order.
    pub coverage: Vec<CoverageRecord>,
    /// Summary metrics.
    pub kpi: ScheduleKpi,
}

impl ScheduleResult {
    /// Coverage record of a cell. `coverage` is in cell order.
    pub fn coverage_for(&self, slot: TimeBucket, skill_group_id: &str) -> Option<&CoverageRecord> {
        self.coverage
            .binary_search_by(|c| (c.slot, c.skill_group_id.as_str()).cmp(&(slot, skill_group_id)))
            .ok()
            .map(|i| &self.coverage[i])
    }
}

/// Interprets a solver outcome for a built model.
///
/// # Errors
/// - `ConfigurationInfeasibility` when the solver proves infeasibility.
/// - `SolverTimeout` when the time limit expired without an incumbent.
/// - `Solver` for backend failures.
/// - `InconsistentSolution` when the decoded schedule fails [`verify`].
pub fn interpret(
    builder: &ShiftModelBuilder<'_>,
    model: &ShiftModel,
    solution: &MilpSolution,
    settings: &SolverSettings,
) -> Result<ScheduleResult> {
    let elapsed = solution.elapsed.as_secs_f64();
    info!(status = ?solution.status, seconds = elapsed, "solver finished");

    match solution.status {
        SolveStatus::Infeasible => {
            let mut diagnostics = diagnose(builder.problem(), builder.eligibility());
            if diagnostics.is_empty() {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::SolverInfeasible,
                    &model.milp.name,
                    solution
                        .message
                        .clone()
                        .unwrap_or_else(|| "no schedule satisfies the hard constraints".into()),
                ));
            }
            return Err(ShiftError::ConfigurationInfeasibility(diagnostics));
        }
        SolveStatus::Error => {
            return Err(ShiftError::Solver(
                solution
                    .message
                    .clone()
                    .unwrap_or_else(|| "unknown solver failure".into()),
            ));
        }
        SolveStatus::TimeLimit if !solution.has_incumbent() => {
            return Err(ShiftError::SolverTimeout {
                seconds: settings.time_limit_seconds.unwrap_or(elapsed),
            });
        }
        SolveStatus::TimeLimit => {
            warn!(
                seconds = elapsed,
                limit = ?settings.time_limit_seconds,
                "time limit reached; returning best schedule found"
            );
        }
        SolveStatus::Optimal | SolveStatus::Feasible => {}
    }

    let problem = builder.problem();
    let schedule = decode_schedule(problem, builder.eligibility(), model, solution);
    let coverage = coverage_table(builder, &schedule);
    let objective: f64 = coverage.iter().map(CoverageRecord::penalty).sum();
    if let Some(reported) = solution.objective {
        debug!(reported, decoded = objective, "objective check");
    }

    let violations = verify(problem, builder.eligibility(), &schedule);
    if !violations.is_empty() {
        warn!(
            violations = violations.len(),
            "decoded schedule breaks hard rules"
        );
        return Err(ShiftError::InconsistentSolution(violations));
    }

    let kpi = ScheduleKpi::calculate(&schedule, &coverage);
    info!(
        shifts = kpi.shift_count,
        understaffed = kpi.total_understaffed,
        objective,
        "schedule interpreted"
    );

    Ok(ScheduleResult {
        status: solution.status,
        objective,
        time_limit_reached: solution.status == SolveStatus::TimeLimit,
        solve_seconds: elapsed,
        schedule,
        coverage,
        kpi,
    })
}

/// Reads shift and allocation decisions from solver values.
fn decode_schedule(
    problem: &Problem,
    eligibility: &EligibilityFilter,
    model: &ShiftModel,
    solution: &MilpSolution,
) -> Schedule {
    let time = &problem.time;
    let mut chosen: BTreeMap<(usize, u32), Vec<usize>> = BTreeMap::new();
    for a in model.vars.assign.iter().filter(|a| solution.is_set(a.var)) {
        chosen.entry((a.employee, a.day)).or_default().push(a.template);
    }
    let mut worked: BTreeMap<usize, Vec<&AllocateVar>> = BTreeMap::new();
    for a in model.vars.allocate.iter().filter(|a| solution.is_set(a.var)) {
        worked.entry(a.employee).or_default().push(a);
    }

    let mut schedule = Schedule::new();
    for (ei, employee) in problem.employees.iter().enumerate() {
        for day in 0..time.days() {
            let date = time.date_of(day);
            let templates = chosen.get(&(ei, day)).map(Vec::as_slice).unwrap_or(&[]);
            if templates.is_empty() {
                schedule.add_shift(ShiftAssignment::off(&employee.id, day, date));
            }
            for &ti in templates {
                if let Some(mask) = eligibility.mask(ti) {
                    schedule.add_shift(ShiftAssignment::working(
                        &employee.id,
                        day,
                        date,
                        &mask.template_id,
                        mask.worked_minutes,
                    ));
                }
            }
        }
        for a in worked.remove(&ei).unwrap_or_default() {
            schedule.add_allocation(BucketAllocation {
                employee_id: employee.id.clone(),
                slot: a.slot,
                skill_group_id: a.skill_group_id.clone(),
            });
        }
    }
    schedule
}

/// Builds coverage records for every cell with demand rows or allocations.
fn coverage_table(builder: &ShiftModelBuilder<'_>, schedule: &Schedule) -> Vec<CoverageRecord> {
    let mut allocated: BTreeMap<CellKey, u64> = BTreeMap::new();
    for a in &schedule.allocations {
        *allocated
            .entry(CellKey::new(a.slot, a.skill_group_id.as_str()))
            .or_insert(0) += 1;
    }

    let cells: BTreeSet<CellKey> = builder
        .demand()
        .iter()
        .map(|(k, _)| k.clone())
        .chain(allocated.keys().cloned())
        .collect();

    cells
        .into_iter()
        .map(|key| {
            let cell = builder.demand().get(key.slot, &key.skill_group_id);
            let required = cell.map_or(0, |c| c.agents);
            let got = allocated.get(&key).copied().unwrap_or(0);
            CoverageRecord {
                weight: builder.weights().get(key.slot, &key.skill_group_id),
                streams: cell
                    .map(|c| {
                        c.streams
                            .iter()
                            .map(|(s, agents)| StreamDemand {
                                direction: s.direction.clone(),
                                channel: s.channel.clone(),
                                agents: *agents,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                required,
                allocated: got,
                understaffed: required.saturating_sub(got),
                slot: key.slot,
                skill_group_id: key.skill_group_id,
            }
        })
        .collect()
}

/// Audits a schedule against the hard rules.
///
/// Checks, per employee:
/// - every worked template is eligible for the employment group,
/// - at most one shift per day,
/// - allocated buckets are exactly the buckets the shifts cover, once each,
/// - allocations only target skill groups the employee serves,
/// - weekly hours lie within the employment group's weekly bounds.
pub fn verify(problem: &Problem, eligibility: &EligibilityFilter, schedule: &Schedule) -> Vec<Violation> {
    let time = &problem.time;
    let mut violations = Vec::new();

    for employee in &problem.employees {
        let eg = problem.employment_group(&employee.employment_group_id);
        let eligible = eligibility.eligible_templates(&employee.employment_group_id);
        let shifts = schedule.working_shifts_for(&employee.id);

        let mut per_day: BTreeMap<u32, usize> = BTreeMap::new();
        let mut weekly: BTreeMap<u32, f64> = BTreeMap::new();
        let mut expected: BTreeSet<TimeBucket> = BTreeSet::new();
        for shift in &shifts {
            *per_day.entry(shift.day).or_insert(0) += 1;
            *weekly.entry(TimeIndex::week_of(shift.day)).or_insert(0.0) += shift.worked_hours();

            let Some(template_id) = shift.template_id.as_deref() else {
                continue;
            };
            let index = problem.templates.iter().position(|t| t.id == template_id);
            if !index.is_some_and(|ti| eligible.contains(&ti)) {
                violations.push(Violation::new(
                    ViolationType::IneligibleTemplate,
                    &employee.id,
                    format!("template '{template_id}' on day {} is not eligible", shift.day),
                ));
            }
            if let Some(mask) = index.and_then(|ti| eligibility.mask(ti)) {
                expected.extend(
                    mask.slots
                        .iter()
                        .map(|s| TimeBucket::new(shift.day + s.day_offset, s.bucket))
                        .filter(|s| s.day < time.days()),
                );
            }
        }

        for (day, count) in per_day.iter().filter(|(_, c)| **c > 1) {
            violations.push(Violation::new(
                ViolationType::MultipleShifts,
                &employee.id,
                format!("{count} shifts on day {day}"),
            ));
        }

        let mut allocated: BTreeMap<TimeBucket, usize> = BTreeMap::new();
        for a in schedule.allocations_for(&employee.id) {
            *allocated.entry(a.slot).or_insert(0) += 1;
            if !employee.serves(&a.skill_group_id) {
                violations.push(Violation::new(
                    ViolationType::SkillMismatch,
                    &employee.id,
                    format!(
                        "allocated to '{}' at day {} bucket {}",
                        a.skill_group_id, a.slot.day, a.slot.bucket
                    ),
                ));
            }
        }
        let mismatched = expected
            .iter()
            .filter(|s| allocated.get(s).copied().unwrap_or(0) != 1)
            .chain(allocated.keys().filter(|s| !expected.contains(s)))
            .count();
        if mismatched > 0 {
            violations.push(Violation::new(
                ViolationType::AllocationMismatch,
                &employee.id,
                format!("{mismatched} bucket(s) where allocations differ from worked time"),
            ));
        }

        if let Some(eg) = eg {
            for week in time.weeks() {
                let hours = weekly.get(&week).copied().unwrap_or(0.0);
                if !eg.hours_per_week.contains(hours) {
                    violations.push(Violation::new(
                        ViolationType::WeeklyHours,
                        &employee.id,
                        format!(
                            "week {week}: {hours}h outside {}-{}h",
                            eg.hours_per_week.min, eg.hours_per_week.max
                        ),
                    ));
                }
            }
        }
    }

    violations
}
