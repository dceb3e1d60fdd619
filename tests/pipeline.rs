//! End-to-end runs on the bundled `microlp` backend.
#![cfg(feature = "microlp")]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use u_shift::config::{ModelOptions, SolverBackend, SolverSettings};
use u_shift::input::InputDocument;
use u_shift::interpret::{verify, ScheduleResult};
use u_shift::milp::{GoodLpSolver, SolveStatus};
use u_shift::model::{prepare, DiagnosticKind};
use u_shift::models::{Problem, TimeBucket};
use u_shift::pipeline::{build_model, solve_json, solve_problem};
use u_shift::ShiftError;

/// One skill group, one 8h template at 08:00, full-time contract with no
/// weekly minimum. `forecast` rows are `(day, "HH:MM", agents)`.
fn document(employees: usize, forecast: &[(u32, &str, i64)]) -> Value {
    let rows: Vec<Value> = forecast
        .iter()
        .map(|(day, clock, agents)| {
            json!({
                "skill_group_id": "sales",
                "timestamp_local": format!("{:02}-JAN-2026 {clock}:00", 5 + day),
                "direction": "inbound",
                "channel": "voice",
                "agents": agents
            })
        })
        .collect();
    let staff: Vec<Value> = (1..=employees)
        .map(|i| {
            json!({
                "id": format!("e{i}"),
                "skill_group_ids": ["sales"],
                "employment_group_id": "full_time"
            })
        })
        .collect();

    json!({
        "time": {"start_date": "2026-01-05", "timezone": "UTC", "days": 7, "bucket_minutes": 30},
        "channels": [{"id": "voice"}],
        "skill_groups": [{"id": "sales", "name": "Sales"}],
        "employment_groups": [{
            "id": "full_time",
            "hours_per_week": {"min": 0, "max": 40},
            "hours_per_day": {"min": 8, "max": 8}
        }],
        "forecast": rows,
        "priority_rules": [{
            "start_time_local": "00:00",
            "end_time_local": "00:00",
            "priorities": [{"direction": "inbound", "channel": "voice", "rank": 1, "understaff_weight": 100.0}]
        }],
        "employees": staff,
        "shift_templates": [{"id": "D8", "start_time_local": "08:00", "duration_minutes": 480}],
        "solver": {"name": "microlp"}
    })
}

fn problem(doc: Value) -> Problem {
    InputDocument::from_json(&doc.to_string())
        .unwrap()
        .into_problem()
        .unwrap()
}

fn solve(p: &Problem) -> u_shift::Result<ScheduleResult> {
    let settings = SolverSettings::default().with_backend(SolverBackend::MicroLp);
    solve_problem(p, &ModelOptions::default(), &settings, &GoodLpSolver::new(SolverBackend::MicroLp))
}

fn assert_audit_clean(p: &Problem, r: &ScheduleResult) {
    let (_, _, eligibility) = prepare(p, &ModelOptions::default()).unwrap();
    let violations = verify(p, &eligibility, &r.schedule);
    assert!(violations.is_empty(), "{violations:?}");
    assert!(r.schedule.violations.is_empty());
}

#[test]
fn test_demand_fully_covered() {
    let p = problem(document(2, &[(0, "10:00", 2)]));
    let r = solve(&p).unwrap();

    assert_eq!(r.status, SolveStatus::Optimal);
    assert!(!r.time_limit_reached);
    assert_eq!(r.objective, 0.0);
    let cell = r.coverage_for(TimeBucket::new(0, 20), "sales").unwrap();
    assert_eq!(cell.required, 2);
    assert_eq!(cell.allocated, 2);
    assert_eq!(cell.understaffed, 0);
    assert_eq!(r.kpi.total_understaffed, 0);
    assert_audit_clean(&p, &r);
}

#[test]
fn test_shortfall_is_weighted() {
    let p = problem(document(3, &[(0, "10:00", 5)]));
    let r = solve(&p).unwrap();

    let cell = r.coverage_for(TimeBucket::new(0, 20), "sales").unwrap();
    assert_eq!(cell.allocated, 3);
    assert_eq!(cell.understaffed, 2);
    assert_eq!(cell.weight, 100.0);
    assert!((r.objective - 200.0).abs() < 1e-6);
    assert_eq!(r.kpi.understaff_by_skill_group["sales"], 2);
    assert_audit_clean(&p, &r);
}

#[test]
fn test_bucket_demand_sums_streams() {
    let mut doc = document(4, &[(0, "10:00", 2)]);
    doc["channels"] = json!([{"id": "voice"}, {"id": "chat"}]);
    doc["forecast"].as_array_mut().unwrap().push(json!({
        "skill_group_id": "sales",
        "timestamp_local": "05-JAN-2026 10:15:00",
        "direction": "inbound",
        "channel": "chat",
        "agents": 1
    }));
    let r = solve(&problem(doc)).unwrap();

    let cell = r.coverage_for(TimeBucket::new(0, 20), "sales").unwrap();
    assert_eq!(cell.required, 3);
    assert_eq!(cell.streams.len(), 2);
    assert_eq!(cell.understaffed, 0);
}

#[test]
fn test_last_defined_window_wins() {
    let mut doc = document(0, &[(0, "10:00", 3)]);
    doc["priority_rules"].as_array_mut().unwrap().push(json!({
        "start_time_local": "09:00",
        "end_time_local": "12:00",
        "priorities": [{"direction": "inbound", "channel": "voice", "rank": 3}]
    }));
    let r = solve(&problem(doc)).unwrap();

    let cell = r.coverage_for(TimeBucket::new(0, 20), "sales").unwrap();
    assert_eq!(cell.weight, 1.0);
    assert!((r.objective - 3.0).abs() < 1e-9);
}

#[test]
fn test_repeated_runs_agree() {
    let p = problem(document(3, &[(0, "08:00", 1), (0, "10:00", 2), (2, "14:30", 3)]));
    let a = solve(&p).unwrap();
    let b = solve(&p).unwrap();

    assert_eq!(
        serde_json::to_value(&a.schedule).unwrap(),
        serde_json::to_value(&b.schedule).unwrap()
    );
    assert_eq!(
        serde_json::to_value(&a.coverage).unwrap(),
        serde_json::to_value(&b.coverage).unwrap()
    );
    assert_eq!(a.objective, b.objective);
}

#[test]
fn test_solve_json() {
    let text = document(2, &[(1, "09:30", 2)]).to_string();
    let r = solve_json(&text, &ModelOptions::default()).unwrap();
    assert_eq!(r.objective, 0.0);
    assert_eq!(r.kpi.required_by_stream["inbound:voice"], 2);
}

#[test]
fn test_unreachable_minimum_reported_before_solving() {
    let mut doc = document(1, &[]);
    doc["time"]["days"] = json!(3);
    doc["employment_groups"][0]["hours_per_week"] = json!({"min": 32, "max": 40});
    let err = solve(&problem(doc)).unwrap_err();

    let ShiftError::ConfigurationInfeasibility(diagnostics) = err else {
        panic!("expected infeasibility, got {err:?}");
    };
    assert_eq!(diagnostics[0].kind, DiagnosticKind::WeeklyMinimumUnreachable);
    assert_eq!(diagnostics[0].entity_id, "e1");
}

#[test]
fn test_solver_proves_infeasibility() {
    // Only 8h shifts exist, so weekly hours are multiples of 8 and never in [10, 12].
    let mut doc = document(1, &[]);
    doc["employment_groups"][0]["hours_per_week"] = json!({"min": 10, "max": 12});
    let err = solve(&problem(doc)).unwrap_err();

    let ShiftError::ConfigurationInfeasibility(diagnostics) = err else {
        panic!("expected infeasibility, got {err:?}");
    };
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::SolverInfeasible);
}

#[test]
fn test_weekly_maximum_limits_shifts() {
    let mut doc = document(1, &[]);
    doc["employment_groups"][0]["hours_per_week"] = json!({"min": 0, "max": 16});
    let forecast: Vec<(u32, &str, i64)> = (0..7).map(|d| (d, "12:00", 1)).collect();
    doc["forecast"] = document(1, &forecast)["forecast"].clone();
    let p = problem(doc);
    let r = solve(&p).unwrap();

    assert_eq!(r.schedule.working_shift_count(), 2);
    assert_eq!(r.kpi.total_understaffed, 5);
    assert_audit_clean(&p, &r);
}

#[test]
fn test_model_size_scales_with_eligibility() {
    let p = problem(document(2, &[(0, "10:00", 1)]));
    let stats = build_model(&p, &ModelOptions::default()).unwrap().stats();

    // 2 employees × 7 days × 1 template; 16 covered buckets per shift.
    assert_eq!(stats.assign_vars, 14);
    assert_eq!(stats.allocate_vars, 2 * 7 * 16);
    assert_eq!(stats.understaff_vars, 1);
}

#[test]
fn test_random_demand_keeps_invariants() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..5 {
        let forecast: Vec<(u32, String, i64)> = (0..6)
            .map(|_| {
                let day = rng.random_range(0..3);
                let hour = rng.random_range(6..20);
                let half = if rng.random_bool(0.5) { 30 } else { 0 };
                (day, format!("{hour:02}:{half:02}"), rng.random_range(0..4))
            })
            .collect();
        let rows: Vec<(u32, &str, i64)> = forecast
            .iter()
            .map(|(d, c, a)| (*d, c.as_str(), *a))
            .collect();
        let p = problem(document(3, &rows));
        let r = solve(&p).unwrap();

        let recomputed: f64 = r
            .coverage
            .iter()
            .map(|c| c.weight * c.required.saturating_sub(c.allocated) as f64)
            .sum();
        assert!((r.objective - recomputed).abs() < 1e-6);
        // Three days fit the weekly maximum, so all three employees can
        // work every day: only demand beyond three agents stays unmet.
        for c in &r.coverage {
            let minute = c.slot.bucket * 30;
            if (480..960).contains(&minute) {
                assert_eq!(c.understaffed, c.required.saturating_sub(3), "{c:?}");
            } else {
                assert_eq!(c.understaffed, c.required, "{c:?}");
            }
        }
        assert_audit_clean(&p, &r);
    }
}

fn assert_one_group_per_worked_bucket(r: &ScheduleResult) {
    let mut seen = BTreeSet::new();
    for a in &r.schedule.allocations {
        assert!(
            seen.insert((a.employee_id.as_str(), a.slot)),
            "{} counted twice at {:?}",
            a.employee_id,
            a.slot
        );
    }
}

#[test]
fn test_multi_skill_employee_serves_one_group_per_bucket() {
    let mut doc = document(2, &[(0, "10:00", 1), (0, "12:00", 2)]);
    doc["skill_groups"] = json!([{"id": "sales"}, {"id": "care"}]);
    for e in doc["employees"].as_array_mut().unwrap() {
        e["skill_group_ids"] = json!(["sales", "care"]);
    }
    doc["forecast"].as_array_mut().unwrap().push(json!({
        "skill_group_id": "care",
        "timestamp_local": "05-JAN-2026 10:00:00",
        "direction": "inbound",
        "channel": "voice",
        "agents": 1
    }));
    let p = problem(doc);
    let r = solve(&p).unwrap();

    assert_one_group_per_worked_bucket(&r);
    assert_eq!(r.kpi.total_understaffed, 0);
    let sales = r.coverage_for(TimeBucket::new(0, 20), "sales").unwrap();
    let care = r.coverage_for(TimeBucket::new(0, 20), "care").unwrap();
    assert_eq!((sales.allocated, care.allocated), (1, 1));
    // Both employees end up on "sales" at noon.
    let noon = r.coverage_for(TimeBucket::new(0, 24), "sales").unwrap();
    assert_eq!(noon.allocated, 2);
    assert_audit_clean(&p, &r);
}

#[test]
fn test_wrapped_shifts_never_double_count() {
    let mut doc = document(1, &[]);
    doc["time"]["days"] = json!(2);
    doc["skill_groups"] = json!([{"id": "a"}, {"id": "b"}]);
    doc["employees"][0]["skill_group_ids"] = json!(["a", "b"]);
    doc["shift_templates"] = json!([
        {"id": "N", "start_time_local": "20:00", "duration_minutes": 480},
        {"id": "E", "start_time_local": "00:00", "duration_minutes": 480}
    ]);
    let rows: Vec<Value> = ["a", "b"]
        .iter()
        .map(|g| {
            json!({
                "skill_group_id": g,
                "timestamp_local": "06-JAN-2026 01:00:00",
                "direction": "inbound",
                "channel": "voice",
                "agents": 1
            })
        })
        .collect();
    doc["forecast"] = Value::Array(rows);
    let p = problem(doc);
    let options = ModelOptions::default().with_allow_wrap(true);
    let settings = SolverSettings::default().with_backend(SolverBackend::MicroLp);
    let r = solve_problem(&p, &options, &settings, &GoodLpSolver::new(SolverBackend::MicroLp)).unwrap();

    assert_one_group_per_worked_bucket(&r);
    let slot = TimeBucket::new(1, 2);
    let a = r.coverage_for(slot, "a").unwrap();
    let b = r.coverage_for(slot, "b").unwrap();
    assert_eq!(a.allocated + b.allocated, 1);
    assert_eq!(a.understaffed + b.understaffed, 1);
    assert!((r.objective - 100.0).abs() < 1e-6);

    let (_, _, eligibility) = prepare(&p, &options).unwrap();
    assert!(verify(&p, &eligibility, &r.schedule).is_empty());
}

#[test]
fn test_time_limit_without_incumbent_is_reported() {
    let p = problem(document(3, &[(0, "10:00", 2), (1, "09:00", 1)]));
    let settings = SolverSettings::default()
        .with_backend(SolverBackend::MicroLp)
        .with_time_limit(0.0);
    let err = solve_problem(
        &p,
        &ModelOptions::default(),
        &settings,
        &GoodLpSolver::new(SolverBackend::MicroLp),
    )
    .unwrap_err();

    assert!(matches!(err, ShiftError::SolverTimeout { seconds } if seconds == 0.0), "{err:?}");
}

#[test]
fn test_generous_limits_still_reach_optimum() {
    let p = problem(document(2, &[(0, "10:00", 2)]));
    let settings = SolverSettings::default()
        .with_backend(SolverBackend::MicroLp)
        .with_time_limit(60.0)
        .with_mip_gap(0.0);
    let r = solve_problem(
        &p,
        &ModelOptions::default(),
        &settings,
        &GoodLpSolver::new(SolverBackend::MicroLp),
    )
    .unwrap();

    assert_eq!(r.status, SolveStatus::Optimal);
    assert!(!r.time_limit_reached);
    assert_eq!(r.objective, 0.0);
}
