//! Contact-center workforce scheduling for the U-Engine ecosystem.
//!
//! Translates employees, employment contracts, shift templates and
//! time-bucketed demand forecasts into a mixed-integer linear program that
//! assigns each employee at most one shift per day, covering skill-group
//! demand as closely as priority-weighted understaffing penalties allow.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `TimeIndex`, `Employee`, `EmploymentGroup`,
//!   `ShiftTemplate`, `ForecastRow`, `PriorityWindow`, `Schedule`
//! - **`demand`**: Forecast rows → per-(day, bucket, skill group) demand
//! - **`weights`**: Priority windows → understaffing weight per cell
//! - **`eligibility`**: Template coverage masks and contract legality
//! - **`model`**: MILP formulation and pre-solve diagnostics
//! - **`milp`**: Solver-neutral MILP and `good_lp` backends
//! - **`interpret`**: Solver output → schedule, coverage, KPIs, audit
//! - **`kpi`**: Staffing indicators
//! - **`input`**: JSON input document
//! - **`validation`**: Input integrity checks (duplicate IDs, references, bounds)
//! - **`pipeline`**: End-to-end run
//!
//! # Architecture
//!
//! The crate formulates; it does not implement a MILP algorithm. Models are
//! handed to any [`milp::MilpSolver`]; the bundled backends delegate to
//! `good_lp` (`microlp` by default, CBC behind the `cbc` feature).
//!
//! # References
//!
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of
//!   applications, methods and models"
//! - Dantzig (1954), "A comment on Edie's traffic delays at toll booths"

pub mod config;
pub mod demand;
pub mod eligibility;
pub mod error;
pub mod input;
pub mod interpret;
pub mod kpi;
pub mod milp;
pub mod model;
pub mod models;
pub mod pipeline;
pub mod validation;
pub mod weights;

pub use error::{Result, ShiftError};
