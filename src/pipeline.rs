//! End-to-end run: document → problem → model → solution → result.
//!
//! Stages, each logged at `info` level:
//!
//! 1. Parse and validate the input document
//! 2. Aggregate demand, resolve weights, filter templates
//! 3. Diagnose configuration infeasibilities
//! 4. Build and solve the MILP
//! 5. Interpret the solution

use tracing::info;

use crate::config::{ModelOptions, SolverSettings};
use crate::error::{Result, ShiftError};
use crate::input::InputDocument;
use crate::interpret::ScheduleResult;
use crate::milp::{solver_for, MilpSolver};
use crate::model::{diagnose, prepare, ShiftModel, ShiftModelBuilder};
use crate::models::Problem;
use crate::validation::validate_problem;

/// Solves a JSON input document with the solver it names.
///
/// # Errors
/// Any [`ShiftError`] from parsing, validation, diagnosis or solving.
pub fn solve_json(text: &str, options: &ModelOptions) -> Result<ScheduleResult> {
    let document = InputDocument::from_json(text)?;
    let settings = document.solver_settings()?;
    let problem = document.into_problem()?;
    info!(
        employees = problem.employees.len(),
        templates = problem.templates.len(),
        forecast_rows = problem.forecast.len(),
        days = problem.time.days(),
        "input loaded"
    );
    let solver = solver_for(&settings);
    solve_problem(&problem, options, &settings, solver.as_ref())
}

/// Solves a problem with a given solver.
///
/// # Errors
/// - `InputValidation` if the problem fails [`validate_problem`].
/// - `ConfigurationInfeasibility` if pre-solve diagnosis finds a cause.
/// - Aggregation, template and solver errors as documented on each stage.
pub fn solve_problem<S: MilpSolver + ?Sized>(
    problem: &Problem,
    options: &ModelOptions,
    settings: &SolverSettings,
    solver: &S,
) -> Result<ScheduleResult> {
    validate_problem(problem).map_err(ShiftError::InputValidation)?;

    let (demand, weights, eligibility) = prepare(problem, options)?;
    info!(
        cells = demand.len(),
        required = demand.total_agents(),
        "demand prepared"
    );

    let diagnostics = diagnose(problem, &eligibility);
    if !diagnostics.is_empty() {
        return Err(ShiftError::ConfigurationInfeasibility(diagnostics));
    }

    ShiftModelBuilder::new(problem, &demand, &weights, &eligibility).solve(solver, settings)
}

/// Builds the model for a problem without solving it.
///
/// # Errors
/// Validation, aggregation and template errors.
pub fn build_model(problem: &Problem, options: &ModelOptions) -> Result<ShiftModel> {
    validate_problem(problem).map_err(ShiftError::InputValidation)?;
    let (demand, weights, eligibility) = prepare(problem, options)?;
    Ok(ShiftModelBuilder::new(problem, &demand, &weights, &eligibility).build())
}
