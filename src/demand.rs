//! Demand aggregation.
//!
//! Collapses raw forecast rows into required agents per
//! `(day, bucket, skill_group)`, keeping the per-stream breakdown the
//! weight resolver needs.
//!
//! # Determinism
//! Agents are integers and cells live in ordered maps, so the table is
//! identical for every ordering of the input rows.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::{Result, ShiftError};
use crate::models::{ForecastRow, SkillGroup, Stream, TimeBucket, TimeIndex};

/// Key of a demand cell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey {
    /// Bucket.
    pub slot: TimeBucket,
    /// Skill group ID.
    pub skill_group_id: String,
}

impl CellKey {
    /// Creates a cell key.
    pub fn new(slot: TimeBucket, skill_group_id: impl Into<String>) -> Self {
        Self {
            slot,
            skill_group_id: skill_group_id.into(),
        }
    }
}

/// Required agents in one `(day, bucket, skill_group)` cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandCell {
    /// Sum of `agents` over all contributing rows.
    pub agents: u64,
    /// Agents per contributing stream.
    pub streams: BTreeMap<Stream, u64>,
}

/// Aggregated demand for the whole horizon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandTable {
    cells: BTreeMap<CellKey, DemandCell>,
}

impl DemandTable {
    /// Aggregates forecast rows.
    ///
    /// Rows mapping to the same cell are summed, never overwritten.
    ///
    /// # Errors
    /// - `InvalidDemandRow` if a row has negative agents or an unknown skill group.
    /// - `OutOfHorizon` if a row's timestamp is outside the horizon.
    pub fn aggregate(
        time: &TimeIndex,
        skill_groups: &[SkillGroup],
        rows: &[ForecastRow],
    ) -> Result<Self> {
        let known: BTreeSet<&str> = skill_groups.iter().map(|g| g.id.as_str()).collect();
        let mut table = Self::default();

        for (i, row) in rows.iter().enumerate() {
            if !known.contains(row.skill_group_id.as_str()) {
                return Err(ShiftError::InvalidDemandRow {
                    row: i,
                    skill_group_id: row.skill_group_id.clone(),
                    reason: "unknown skill group".into(),
                });
            }
            let agents = u64::try_from(row.agents).map_err(|_| ShiftError::InvalidDemandRow {
                row: i,
                skill_group_id: row.skill_group_id.clone(),
                reason: format!("agents must be >= 0, got {}", row.agents),
            })?;
            let slot = time
                .bucket_of(row.timestamp)
                .ok_or_else(|| ShiftError::OutOfHorizon {
                    row: i,
                    timestamp: row.timestamp,
                    start_date: time.start_date(),
                    days: time.days(),
                })?;

            let cell = table
                .cells
                .entry(CellKey::new(slot, row.skill_group_id.as_str()))
                .or_default();
            cell.agents += agents;
            *cell.streams.entry(row.stream.clone()).or_insert(0) += agents;
        }

        debug!(
            rows = rows.len(),
            cells = table.cells.len(),
            agents = table.total_agents(),
            "aggregated forecast demand"
        );
        Ok(table)
    }

    /// The cell for a bucket and skill group.
    pub fn get(&self, slot: TimeBucket, skill_group_id: &str) -> Option<&DemandCell> {
        self.cells.get(&CellKey::new(slot, skill_group_id))
    }

    /// Required agents for a bucket and skill group (0 if absent).
    pub fn required(&self, slot: TimeBucket, skill_group_id: &str) -> u64 {
        self.get(slot, skill_group_id).map_or(0, |c| c.agents)
    }

    /// Iterates cells in `(day, bucket, skill_group)` order.
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &DemandCell)> {
        self.cells.iter()
    }

    /// Cells with strictly positive demand.
    pub fn positive_cells(&self) -> impl Iterator<Item = (&CellKey, &DemandCell)> {
        self.cells.iter().filter(|(_, c)| c.agents > 0)
    }

    /// Number of cells (including zero-demand cells that had rows).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no rows were aggregated.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Sum of all required agents (agent-buckets).
    pub fn total_agents(&self) -> u64 {
        self.cells.values().map(|c| c.agents).sum()
    }

    /// Required agent-buckets per stream.
    pub fn required_by_stream(&self) -> BTreeMap<Stream, u64> {
        let mut totals = BTreeMap::new();
        for cell in self.cells.values() {
            for (stream, agents) in &cell.streams {
                *totals.entry(stream.clone()).or_insert(0) += agents;
            }
        }
        totals
    }

    /// Required agent-buckets per skill group.
    pub fn required_by_skill_group(&self) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::new();
        for (key, cell) in &self.cells {
            *totals.entry(key.skill_group_id.clone()).or_insert(0) += cell.agents;
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_forecast_timestamp;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn time() -> TimeIndex {
        TimeIndex::standard(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap())
    }

    fn groups() -> Vec<SkillGroup> {
        vec![SkillGroup::new("sales", "Sales"), SkillGroup::new("care", "Care")]
    }

    fn row(sg: &str, ts: &str, channel: &str, agents: i64) -> ForecastRow {
        ForecastRow::new(
            sg,
            parse_forecast_timestamp(ts).unwrap(),
            Stream::new("inbound", channel),
            agents,
        )
    }

    fn sample_rows() -> Vec<ForecastRow> {
        vec![
            row("sales", "05-JAN-2026 08:00:00", "voice", 3),
            row("sales", "05-JAN-2026 08:00:00", "voice", 2),
            row("sales", "05-JAN-2026 08:15:00", "chat", 1),
            row("care", "05-JAN-2026 08:00:00", "voice", 4),
            row("care", "06-JAN-2026 23:30:00", "email", 0),
            row("sales", "12-JAN-2026 09:30:00", "voice", 7),
        ]
    }

    #[test]
    fn test_duplicates_are_summed() {
        let t = DemandTable::aggregate(&time(), &groups(), &sample_rows()).unwrap();
        let cell = t.get(TimeBucket::new(0, 16), "sales").unwrap();
        assert_eq!(cell.agents, 6);
        assert_eq!(cell.streams[&Stream::new("inbound", "voice")], 5);
        assert_eq!(cell.streams[&Stream::new("inbound", "chat")], 1);
        assert_eq!(t.required(TimeBucket::new(0, 16), "care"), 4);
        assert_eq!(t.required(TimeBucket::new(7, 19), "sales"), 7);
        assert_eq!(t.required(TimeBucket::new(3, 3), "sales"), 0);
    }

    #[test]
    fn test_zero_rows_kept_but_not_positive() {
        let t = DemandTable::aggregate(&time(), &groups(), &sample_rows()).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.positive_cells().count(), 3);
        assert_eq!(t.total_agents(), 17);
    }

    #[test]
    fn test_row_order_does_not_matter() {
        let rows = sample_rows();
        let expected = DemandTable::aggregate(&time(), &groups(), &rows).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let mut shuffled = rows.clone();
            shuffled.shuffle(&mut rng);
            let actual = DemandTable::aggregate(&time(), &groups(), &shuffled).unwrap();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_negative_agents_rejected() {
        let rows = vec![row("sales", "05-JAN-2026 08:00:00", "voice", -1)];
        let err = DemandTable::aggregate(&time(), &groups(), &rows).unwrap_err();
        assert!(matches!(err, ShiftError::InvalidDemandRow { row: 0, .. }));
    }

    #[test]
    fn test_unknown_skill_group_rejected() {
        let rows = vec![
            row("sales", "05-JAN-2026 08:00:00", "voice", 1),
            row("billing", "05-JAN-2026 08:00:00", "voice", 1),
        ];
        let err = DemandTable::aggregate(&time(), &groups(), &rows).unwrap_err();
        match err {
            ShiftError::InvalidDemandRow {
                row, skill_group_id, ..
            } => {
                assert_eq!(row, 1);
                assert_eq!(skill_group_id, "billing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_horizon_rejected() {
        let rows = vec![
            row("sales", "05-JAN-2026 08:00:00", "voice", 1),
            row("sales", "03-FEB-2026 08:00:00", "voice", 1),
        ];
        assert!(matches!(
            DemandTable::aggregate(&time(), &groups(), &rows),
            Err(ShiftError::OutOfHorizon { row: 1, .. })
        ));
    }

    #[test]
    fn test_totals_by_stream_and_group() {
        let t = DemandTable::aggregate(&time(), &groups(), &sample_rows()).unwrap();
        let by_stream = t.required_by_stream();
        assert_eq!(by_stream[&Stream::new("inbound", "voice")], 16);
        assert_eq!(by_stream[&Stream::new("inbound", "chat")], 1);
        assert_eq!(by_stream[&Stream::new("inbound", "email")], 0);
        let by_group = t.required_by_skill_group();
        assert_eq!(by_group["sales"], 13);
        assert_eq!(by_group["care"], 4);
    }
}
