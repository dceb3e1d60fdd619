//! Solver-neutral mixed-integer linear programs.
//!
//! The model builder emits a [`MilpModel`]; any [`MilpSolver`] turns it into
//! a [`MilpSolution`]. Keeping the model independent of a backend lets the
//! builder be tested without a solver and lets backends be swapped by
//! configuration.
//!
//! # Conventions
//! - Variables are numbered densely in creation order ([`VarId`]).
//! - The objective is always minimized.
//! - Constraint terms are `(variable, coefficient)` pairs; duplicates add up.

mod backend;

pub use backend::{solver_for, GoodLpSolver};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SolverSettings;

/// Index of a variable in a [`MilpModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub usize);

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VarKind {
    /// 0 or 1.
    Binary,
    /// Real in `[lower, upper]` (`upper = None` is unbounded).
    Continuous { lower: f64, upper: Option<f64> },
}

/// A decision variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilpVariable {
    /// Human-readable name (for logs and LP dumps).
    pub name: String,
    /// Domain.
    pub kind: VarKind,
}

/// Constraint relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// `lhs ≤ rhs`
    Le,
    /// `lhs ≥ rhs`
    Ge,
    /// `lhs = rhs`
    Eq,
}

/// `Σ coef × var  (sense)  rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    /// Constraint name.
    pub name: String,
    /// Left-hand side terms.
    pub terms: Vec<(VarId, f64)>,
    /// Relation.
    pub sense: Sense,
    /// Right-hand side constant.
    pub rhs: f64,
}

impl LinearConstraint {
    /// Creates a constraint.
    pub fn new(name: impl Into<String>, terms: Vec<(VarId, f64)>, sense: Sense, rhs: f64) -> Self {
        Self {
            name: name.into(),
            terms,
            sense,
            rhs,
        }
    }

    /// Left-hand side value under an assignment.
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values.get(v.0).copied().unwrap_or(0.0))
            .sum()
    }

    /// Whether the constraint holds under an assignment, within `tol`.
    pub fn is_satisfied(&self, values: &[f64], tol: f64) -> bool {
        let lhs = self.lhs(values);
        match self.sense {
            Sense::Le => lhs <= self.rhs + tol,
            Sense::Ge => lhs >= self.rhs - tol,
            Sense::Eq => (lhs - self.rhs).abs() <= tol,
        }
    }
}

/// A minimization MILP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MilpModel {
    /// Model name.
    pub name: String,
    /// Variables, indexed by [`VarId`].
    pub variables: Vec<MilpVariable>,
    /// Constraints, in insertion order.
    pub constraints: Vec<LinearConstraint>,
    /// Objective terms (minimized).
    pub objective: Vec<(VarId, f64)>,
}

impl MilpModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn push(&mut self, name: String, kind: VarKind) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(MilpVariable { name, kind });
        id
    }

    /// Adds a binary variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.push(name.into(), VarKind::Binary)
    }

    /// Adds a continuous variable with `lower ≤ x ≤ upper`.
    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: Option<f64>) -> VarId {
        self.push(name.into(), VarKind::Continuous { lower, upper })
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    /// Replaces the objective.
    pub fn set_objective(&mut self, terms: Vec<(VarId, f64)>) {
        self.objective = terms;
    }

    /// Number of variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of binary variables.
    pub fn binary_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value under an assignment.
    pub fn evaluate_objective(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|(v, c)| c * values.get(v.0).copied().unwrap_or(0.0))
            .sum()
    }

    /// Names of constraints violated by an assignment (bounds included).
    pub fn check(&self, values: &[f64], tol: f64) -> Vec<String> {
        let mut violated = Vec::new();
        for (i, var) in self.variables.iter().enumerate() {
            let x = values.get(i).copied().unwrap_or(0.0);
            let ok = match var.kind {
                VarKind::Binary => x.abs() <= tol || (x - 1.0).abs() <= tol,
                VarKind::Continuous { lower, upper } => {
                    x >= lower - tol && upper.map_or(true, |u| x <= u + tol)
                }
            };
            if !ok {
                violated.push(format!("bounds({})", var.name));
            }
        }
        violated.extend(
            self.constraints
                .iter()
                .filter(|c| !c.is_satisfied(values, tol))
                .map(|c| c.name.clone()),
        );
        violated
    }
}

/// Outcome class reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Proven optimal (within the MIP gap).
    Optimal,
    /// Feasible incumbent, optimality not proven.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// Time limit reached; `values` is set iff an incumbent exists.
    TimeLimit,
    /// Backend failure.
    Error,
}

/// Values and status returned by a solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilpSolution {
    /// Outcome class.
    pub status: SolveStatus,
    /// Value per variable, indexed by [`VarId`]; empty without an incumbent.
    pub values: Vec<f64>,
    /// Objective value of the incumbent.
    pub objective: Option<f64>,
    /// Wall-clock time spent in the backend.
    pub elapsed: Duration,
    /// Backend diagnostic, if any.
    pub message: Option<String>,
}

impl MilpSolution {
    /// A solution without an incumbent.
    pub fn failed(status: SolveStatus, elapsed: Duration, message: impl Into<String>) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: None,
            elapsed,
            message: Some(message.into()),
        }
    }

    /// Whether variable values are available.
    pub fn has_incumbent(&self) -> bool {
        match self.status {
            SolveStatus::Optimal | SolveStatus::Feasible => true,
            SolveStatus::TimeLimit => !self.values.is_empty(),
            SolveStatus::Infeasible | SolveStatus::Error => false,
        }
    }

    /// Value of a variable (0 when absent).
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }

    /// Whether a binary variable is set (value > 0.5).
    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > 0.5
    }
}

/// A MILP backend.
pub trait MilpSolver {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Solves a model under the given limits.
    ///
    /// Failures are reported through [`MilpSolution::status`], never by panic.
    fn solve(&self, model: &MilpModel, settings: &SolverSettings) -> MilpSolution;
}
