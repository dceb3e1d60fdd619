//! Understaffing weight resolution.
//!
//! Turns recurring priority windows into a numeric penalty for each unit of
//! unmet demand.
//!
//! # Resolution
//!
//! 1. A window matches a bucket when its weekdays include the bucket's day
//!    and its `[start, end)` clock range contains the bucket's start time.
//! 2. Among matching windows that rank the stream, the **last defined**
//!    window wins.
//! 3. The winning entry's `understaff_weight` is used if present, otherwise
//!    the rank default from [`RankWeightTable`].
//! 4. A stream no window ranks gets the fallback weight (rank 5, `0.1`).
//!
//! A cell's weight is the demand-weighted mean of its streams' weights:
//! `Σ(agents_s × w_s) / Σ agents_s`. Empty cells get the fallback.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::RankWeightTable;
use crate::demand::{CellKey, DemandCell, DemandTable};
use crate::models::{PriorityWindow, TimeBucket, TimeIndex};

/// Resolves stream weights from priority windows.
#[derive(Debug, Clone)]
pub struct WeightResolver<'a> {
    time: &'a TimeIndex,
    windows: &'a [PriorityWindow],
    ranks: RankWeightTable,
}

impl<'a> WeightResolver<'a> {
    /// Creates a resolver with the default rank table.
    pub fn new(time: &'a TimeIndex, windows: &'a [PriorityWindow]) -> Self {
        Self {
            time,
            windows,
            ranks: RankWeightTable::default(),
        }
    }

    /// Uses a custom rank table.
    pub fn with_rank_weights(mut self, ranks: RankWeightTable) -> Self {
        self.ranks = ranks;
        self
    }

    /// Weight for buckets and streams no window ranks.
    pub fn fallback_weight(&self) -> f64 {
        self.ranks.fallback()
    }

    /// Understaffing weight of a stream in a bucket. Always positive.
    pub fn weight(&self, day: u32, bucket: u32, direction: &str, channel: &str) -> f64 {
        self.ranked_weight(day, bucket, direction, channel)
            .unwrap_or_else(|| self.fallback_weight())
    }

    /// Weight from the last matching window that ranks the stream, if any.
    fn ranked_weight(&self, day: u32, bucket: u32, direction: &str, channel: &str) -> Option<f64> {
        let weekday = self.time.day_of_week(day);
        let minute = self.time.bucket_start_minute(bucket);
        self.windows
            .iter()
            .rev()
            .filter(|w| w.applies(weekday, minute))
            .find_map(|w| w.entry_for(direction, channel))
            .map(|entry| {
                entry
                    .understaff_weight
                    .unwrap_or_else(|| self.ranks.weight_for(entry.rank))
            })
    }

    /// Demand-weighted weight of one cell.
    pub fn cell_weight(&self, slot: TimeBucket, cell: &DemandCell) -> f64 {
        if cell.agents == 0 {
            return self.fallback_weight();
        }
        let weighted: f64 = cell
            .streams
            .iter()
            .map(|(stream, agents)| {
                *agents as f64 * self.weight(slot.day, slot.bucket, &stream.direction, &stream.channel)
            })
            .sum();
        weighted / cell.agents as f64
    }

    /// Resolves weights for every cell of a demand table.
    pub fn resolve(&self, demand: &DemandTable) -> CellWeights {
        let mut weights = BTreeMap::new();
        let mut unranked = 0usize;
        for (key, cell) in demand.iter() {
            let all_unranked = cell.streams.keys().all(|s| {
                self.ranked_weight(key.slot.day, key.slot.bucket, &s.direction, &s.channel)
                    .is_none()
            });
            if all_unranked {
                unranked += 1;
            }
            weights.insert(key.clone(), self.cell_weight(key.slot, cell));
        }
        debug!(
            cells = weights.len(),
            fallback_cells = unranked,
            fallback_weight = self.fallback_weight(),
            "resolved understaff weights"
        );
        CellWeights {
            weights,
            fallback: self.fallback_weight(),
        }
    }
}

/// Resolved weight per demand cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellWeights {
    weights: BTreeMap<CellKey, f64>,
    fallback: f64,
}

impl CellWeights {
    /// Weight of a cell; the fallback for cells without demand rows.
    pub fn get(&self, slot: TimeBucket, skill_group_id: &str) -> f64 {
        self.weights
            .get(&CellKey::new(slot, skill_group_id))
            .copied()
            .unwrap_or(self.fallback)
    }

    /// Fallback weight.
    pub fn fallback(&self) -> f64 {
        self.fallback
    }

    /// Iterates resolved weights in cell order.
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, f64)> {
        self.weights.iter().map(|(k, w)| (k, *w))
    }

    /// Number of resolved cells.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether no cells were resolved.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
