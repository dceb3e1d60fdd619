//! Run configuration: model-building options and solver settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, ShiftError};

/// Rank whose default weight applies to buckets no priority window covers.
pub const FALLBACK_RANK: u32 = 5;

/// Immutable mapping from priority rank to default understaffing weight.
///
/// | Rank | Weight |
/// |------|--------|
/// | 1 | 100 |
/// | 2 | 10 |
/// | 3 | 1 |
/// | 4 | 0.3 |
/// | 5 | 0.1 |
/// | other | 0.05 |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RankWeightTableRaw")]
pub struct RankWeightTable {
    by_rank: BTreeMap<u32, f64>,
    other: f64,
}

/// Unchecked wire form of [`RankWeightTable`].
#[derive(Deserialize)]
struct RankWeightTableRaw {
    by_rank: BTreeMap<u32, f64>,
    other: f64,
}

impl TryFrom<RankWeightTableRaw> for RankWeightTable {
    type Error = ShiftError;

    fn try_from(raw: RankWeightTableRaw) -> Result<Self> {
        for (rank, weight) in &raw.by_rank {
            check_positive(*weight, format!("rank {rank}"))?;
        }
        check_positive(raw.other, "unlisted ranks".to_string())?;
        Ok(Self {
            by_rank: raw.by_rank,
            other: raw.other,
        })
    }
}

impl Default for RankWeightTable {
    fn default() -> Self {
        Self {
            by_rank: BTreeMap::from([(1, 100.0), (2, 10.0), (3, 1.0), (4, 0.3), (5, 0.1)]),
            other: 0.05,
        }
    }
}

impl RankWeightTable {
    /// Default weight for a rank.
    pub fn weight_for(&self, rank: u32) -> f64 {
        self.by_rank.get(&rank).copied().unwrap_or(self.other)
    }

    /// Weight for buckets without any matching priority window.
    pub fn fallback(&self) -> f64 {
        self.weight_for(FALLBACK_RANK)
    }

    /// Overrides one rank's weight.
    ///
    /// # Errors
    /// `InvalidWeight` if the weight is not strictly positive.
    pub fn with_rank(mut self, rank: u32, weight: f64) -> Result<Self> {
        check_positive(weight, format!("rank {rank}"))?;
        self.by_rank.insert(rank, weight);
        Ok(self)
    }

    /// Overrides the weight of ranks without an explicit entry.
    ///
    /// # Errors
    /// `InvalidWeight` if the weight is not strictly positive.
    pub fn with_other(mut self, weight: f64) -> Result<Self> {
        check_positive(weight, "unlisted ranks".to_string())?;
        self.other = weight;
        Ok(self)
    }
}

fn check_positive(weight: f64, context: String) -> Result<()> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(ShiftError::InvalidWeight { context, weight })
    }
}

/// Options controlling model formulation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Model templates that run past midnight onto the next day.
    pub allow_wrap: bool,
    /// Rank → default weight table.
    pub rank_weights: RankWeightTable,
}

impl ModelOptions {
    /// Enables or disables multi-day (wrapping) templates.
    pub fn with_allow_wrap(mut self, allow_wrap: bool) -> Self {
        self.allow_wrap = allow_wrap;
        self
    }

    /// Replaces the rank weight table.
    pub fn with_rank_weights(mut self, table: RankWeightTable) -> Self {
        self.rank_weights = table;
        self
    }
}

/// MILP backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverBackend {
    /// Pure-Rust branch and bound (always available with the default feature).
    MicroLp,
    /// COIN-OR CBC (requires the `cbc` feature).
    Cbc,
}

impl SolverBackend {
    /// Maps a document solver name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cbc" | "coin_cbc" => Some(Self::Cbc),
            "microlp" => Some(Self::MicroLp),
            _ => None,
        }
    }
}

/// Solver limits passed with every solve call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Requested backend.
    pub backend: SolverBackend,
    /// Wall-clock budget in seconds (`None` = unlimited).
    pub time_limit_seconds: Option<f64>,
    /// Relative optimality gap tolerance.
    pub mip_gap: Option<f64>,
}

impl Default for SolverBackend {
    /// CBC when compiled in, otherwise `microlp`.
    fn default() -> Self {
        if cfg!(feature = "cbc") {
            Self::Cbc
        } else {
            Self::MicroLp
        }
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            backend: SolverBackend::default(),
            time_limit_seconds: None,
            mip_gap: None,
        }
    }
}

impl SolverSettings {
    /// Sets the backend.
    pub fn with_backend(mut self, backend: SolverBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the time limit.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_seconds = Some(seconds);
        self
    }

    /// Sets the relative MIP gap.
    pub fn with_mip_gap(mut self, gap: f64) -> Self {
        self.mip_gap = Some(gap);
        self
    }
}
