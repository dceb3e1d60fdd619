//! `good_lp` backends for [`MilpSolver`].
//!
//! Both backends receive the time limit and the relative MIP gap. The
//! backend's own solution status decides the outcome class:
//!
//! | `good_lp` outcome | [`SolveStatus`] |
//! |-------------------|-----------------|
//! | `Ok`, `Optimal` | `Optimal` |
//! | `Ok`, `GapLimit` | `Feasible` |
//! | `Ok`, `TimeLimit` | `TimeLimit` (with values) |
//! | `Err(Infeasible)` | `Infeasible` |
//! | `Err` after the limit expired | `TimeLimit` (no values) |
//! | other `Err` | `Error` |

use good_lp::{
    constraint, variable, Constraint, Expression, ProblemVariables, ResolutionError, Solution,
    SolutionStatus, SolverModel, Variable, WithMipGap, WithTimeLimit,
};
use std::time::Instant;
use tracing::{debug, warn};

use super::{LinearConstraint, MilpModel, MilpSolution, MilpSolver, Sense, SolveStatus, VarKind};
use crate::config::{SolverBackend, SolverSettings};

const CONSTANT_TOLERANCE: f64 = 1e-9;

/// [`MilpSolver`] backed by `good_lp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoodLpSolver {
    backend: SolverBackend,
}

impl GoodLpSolver {
    /// Creates a solver for a backend.
    pub fn new(backend: SolverBackend) -> Self {
        Self { backend }
    }

    /// The backend this solver runs.
    pub fn backend(&self) -> SolverBackend {
        self.backend
    }
}

/// Picks the solver for a run.
///
/// A requested `cbc` backend falls back to `microlp` (with a warning) when
/// the crate was built without the `cbc` feature.
pub fn solver_for(settings: &SolverSettings) -> Box<dyn MilpSolver> {
    let backend = match settings.backend {
        SolverBackend::Cbc if !cfg!(feature = "cbc") => {
            warn!("cbc backend not compiled in; falling back to microlp");
            SolverBackend::MicroLp
        }
        other => other,
    };
    Box::new(GoodLpSolver::new(backend))
}

/// A model translated into `good_lp` terms.
struct Translated {
    vars: ProblemVariables,
    handles: Vec<Variable>,
    objective: Expression,
    constraints: Vec<Constraint>,
}

/// Translates a model. Constant constraints are checked here; the name of
/// the first violated one is returned as the error.
fn translate(model: &MilpModel) -> Result<Translated, String> {
    let mut vars = ProblemVariables::new();
    let handles: Vec<Variable> = model
        .variables
        .iter()
        .map(|v| {
            let def = match v.kind {
                VarKind::Binary => variable().binary(),
                VarKind::Continuous { lower, upper } => match upper {
                    Some(u) => variable().min(lower).max(u),
                    None => variable().min(lower),
                },
            };
            vars.add(def.name(v.name.clone()))
        })
        .collect();

    let objective = expression(&model.objective, &handles);

    let mut constraints = Vec::with_capacity(model.constraints.len());
    for c in &model.constraints {
        if c.terms.iter().all(|(_, coef)| *coef == 0.0) {
            if !c.is_satisfied(&[], CONSTANT_TOLERANCE) {
                return Err(c.name.clone());
            }
            continue;
        }
        constraints.push(to_constraint(c, &handles));
    }

    Ok(Translated {
        vars,
        handles,
        objective,
        constraints,
    })
}

fn expression(terms: &[(super::VarId, f64)], handles: &[Variable]) -> Expression {
    let mut expr = Expression::from(0.0);
    for (v, coef) in terms {
        expr += *coef * handles[v.0];
    }
    expr
}

fn to_constraint(c: &LinearConstraint, handles: &[Variable]) -> Constraint {
    let lhs = expression(&c.terms, handles);
    let rhs = c.rhs;
    match c.sense {
        Sense::Le => constraint!(lhs <= rhs),
        Sense::Ge => constraint!(lhs >= rhs),
        Sense::Eq => constraint!(lhs == rhs),
    }
}

/// Applies the run's time limit and MIP gap to a backend model.
fn with_limits<M>(mut problem: M, settings: &SolverSettings) -> Result<M, String>
where
    M: WithTimeLimit + WithMipGap,
{
    if let Some(limit) = settings.time_limit_seconds {
        problem = problem.with_time_limit(limit);
    }
    if let Some(gap) = settings.mip_gap {
        problem = problem
            .with_mip_gap(gap as f32)
            .map_err(|e| format!("invalid mip gap {gap}: {e}"))?;
    }
    Ok(problem)
}

/// Outcome class of a solution the backend returned.
fn status_of(status: SolutionStatus) -> SolveStatus {
    match status {
        SolutionStatus::Optimal => SolveStatus::Optimal,
        SolutionStatus::GapLimit => SolveStatus::Feasible,
        SolutionStatus::TimeLimit => SolveStatus::TimeLimit,
    }
}

/// Outcome class of a backend error.
///
/// microlp reports an expired budget without an incumbent as an error
/// whose message starts with "Time limit"; CBC only reports "Stopped".
fn error_status(error: &ResolutionError, over_budget: bool) -> SolveStatus {
    match error {
        ResolutionError::Infeasible => SolveStatus::Infeasible,
        ResolutionError::Other(msg) if msg.starts_with("Time limit") => SolveStatus::TimeLimit,
        _ if over_budget => SolveStatus::TimeLimit,
        _ => SolveStatus::Error,
    }
}

/// Solves a prepared `good_lp` model and maps the outcome.
fn run<M>(
    problem: M,
    handles: &[Variable],
    settings: &SolverSettings,
    started: Instant,
) -> MilpSolution
where
    M: SolverModel<Error = ResolutionError>,
{
    let outcome = problem.solve();
    let elapsed = started.elapsed();

    match outcome {
        Ok(solution) => {
            let values: Vec<f64> = handles.iter().map(|&h| solution.value(h)).collect();
            MilpSolution {
                status: status_of(solution.status()),
                values,
                objective: None,
                elapsed,
                message: None,
            }
        }
        Err(e) => {
            let over_budget = settings
                .time_limit_seconds
                .is_some_and(|limit| elapsed.as_secs_f64() >= limit);
            let status = error_status(&e, over_budget);
            let message = match status {
                SolveStatus::Infeasible => "problem is infeasible".to_string(),
                _ => e.to_string(),
            };
            MilpSolution::failed(status, elapsed, message)
        }
    }
}

impl GoodLpSolver {
    #[cfg(feature = "microlp")]
    fn solve_microlp(&self, t: Translated, settings: &SolverSettings, started: Instant) -> MilpSolution {
        let mut problem = match with_limits(t.vars.minimise(t.objective).using(good_lp::microlp), settings) {
            Ok(p) => p,
            Err(msg) => return MilpSolution::failed(SolveStatus::Error, started.elapsed(), msg),
        };
        for c in t.constraints {
            problem = problem.with(c);
        }
        run(problem, &t.handles, settings, started)
    }

    #[cfg(not(feature = "microlp"))]
    fn solve_microlp(&self, _t: Translated, _settings: &SolverSettings, started: Instant) -> MilpSolution {
        MilpSolution::failed(
            SolveStatus::Error,
            started.elapsed(),
            "microlp backend not compiled in",
        )
    }

    #[cfg(feature = "cbc")]
    fn solve_cbc(&self, t: Translated, settings: &SolverSettings, started: Instant) -> MilpSolution {
        let mut problem = match with_limits(t.vars.minimise(t.objective).using(good_lp::coin_cbc), settings) {
            Ok(p) => p,
            Err(msg) => return MilpSolution::failed(SolveStatus::Error, started.elapsed(), msg),
        };
        problem.set_parameter("log", "0");
        for c in t.constraints {
            problem = problem.with(c);
        }
        run(problem, &t.handles, settings, started)
    }

    #[cfg(not(feature = "cbc"))]
    fn solve_cbc(&self, t: Translated, settings: &SolverSettings, started: Instant) -> MilpSolution {
        warn!("cbc backend not compiled in; solving with microlp");
        self.solve_microlp(t, settings, started)
    }
}

impl MilpSolver for GoodLpSolver {
    fn name(&self) -> &str {
        match self.backend {
            SolverBackend::MicroLp => "microlp",
            SolverBackend::Cbc => "cbc",
        }
    }

    fn solve(&self, model: &MilpModel, settings: &SolverSettings) -> MilpSolution {
        let started = Instant::now();
        let translated = match translate(model) {
            Ok(t) => t,
            Err(name) => {
                return MilpSolution::failed(
                    SolveStatus::Infeasible,
                    started.elapsed(),
                    format!("constant constraint '{name}' cannot hold"),
                )
            }
        };
        debug!(
            backend = self.name(),
            variables = translated.handles.len(),
            constraints = translated.constraints.len(),
            "solving model"
        );

        let mut solution = match self.backend {
            SolverBackend::MicroLp => self.solve_microlp(translated, settings, started),
            SolverBackend::Cbc => self.solve_cbc(translated, settings, started),
        };
        if solution.has_incumbent() {
            solution.objective = Some(model.evaluate_objective(&solution.values));
        }
        solution
    }
}
