//! Probability × impact heat-map aggregation.
//!
//! [`aggregate`] buckets risk records into the fixed 5×5 grid. Buckets are
//! stored in rendering order: impact descending as rows (5 → 1), probability
//! ascending as columns (1 → 5), so the top-left corner is the
//! high-impact/low-probability cell and the top-right is the hottest.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Width of each axis.
pub const SCALE: u8 = 5;
/// Number of buckets in a grid.
pub const GRID_CELLS: usize = (SCALE as usize) * (SCALE as usize);

/// A risk as delivered by the dashboard API.
///
/// Probability and impact are kept signed so that out-of-range values
/// survive deserialisation and can be excluded by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    #[serde(default, alias = "risk_id", deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    pub category: String,
    pub department: String,
    pub probability: i32,
    pub impact: i32,
}

impl RiskRecord {
    /// Likelihood × impact.
    pub fn score(&self) -> i64 {
        i64::from(self.probability) * i64::from(self.impact)
    }

    /// Whether both axes fall inside 1..=5.
    pub fn in_range(&self) -> bool {
        axis(self.probability).is_some() && axis(self.impact).is_some()
    }
}

fn axis(v: i32) -> Option<u8> {
    u8::try_from(v).ok().filter(|v| (1..=SCALE).contains(v))
}

/// Accept either `"RISK-2025-0001"` or `17` for an identifier.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(s)) => s,
        Some(Id::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

/// Severity level 1..=5 for a cell.
///
/// `ceil(score / 5)`, with any score above 20 forced to 5.
pub fn severity_level(probability: u8, impact: u8) -> u8 {
    let score = u32::from(probability) * u32::from(impact);
    if score > 20 {
        5
    } else {
        score.div_ceil(5).max(1) as u8
    }
}

/// One cell of the grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapBucket {
    pub probability: u8,
    pub impact: u8,
    pub severity: u8,
    /// Member records, unpaged, for drill-down.
    pub records: Vec<RiskRecord>,
}

impl HeatmapBucket {
    fn empty(probability: u8, impact: u8) -> Self {
        Self {
            probability,
            impact,
            severity: severity_level(probability, impact),
            records: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Likelihood × impact for the cell.
    pub fn score(&self) -> u8 {
        self.probability * self.impact
    }
}

/// The full 5×5 grid, always 25 buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapGrid {
    buckets: Vec<HeatmapBucket>,
    excluded: usize,
}

impl Default for HeatmapGrid {
    fn default() -> Self {
        aggregate(&[])
    }
}

impl HeatmapGrid {
    /// All buckets in rendering order.
    pub fn buckets(&self) -> &[HeatmapBucket] {
        &self.buckets
    }

    /// Rows from impact 5 down to impact 1, each ordered by probability 1..=5.
    pub fn rows(&self) -> impl Iterator<Item = &[HeatmapBucket]> {
        self.buckets.chunks(SCALE as usize)
    }

    /// Look up the bucket for a (probability, impact) pair.
    pub fn get(&self, probability: u8, impact: u8) -> Option<&HeatmapBucket> {
        index_of(probability, impact).map(|i| &self.buckets[i])
    }

    /// Number of in-range records placed in the grid.
    pub fn total(&self) -> usize {
        self.buckets.iter().map(HeatmapBucket::count).sum()
    }

    /// Records left out because an axis was outside 1..=5.
    pub fn excluded(&self) -> usize {
        self.excluded
    }
}

fn index_of(probability: u8, impact: u8) -> Option<usize> {
    if !(1..=SCALE).contains(&probability) || !(1..=SCALE).contains(&impact) {
        return None;
    }
    let row = (SCALE - impact) as usize;
    let col = (probability - 1) as usize;
    Some(row * SCALE as usize + col)
}

/// Bucket records into a fresh 5×5 grid.
///
/// Records whose probability or impact lies outside 1..=5 are excluded from
/// every bucket rather than clamped; callers are expected to validate first.
pub fn aggregate(records: &[RiskRecord]) -> HeatmapGrid {
    let mut buckets = Vec::with_capacity(GRID_CELLS);
    for impact in (1..=SCALE).rev() {
        for probability in 1..=SCALE {
            buckets.push(HeatmapBucket::empty(probability, impact));
        }
    }

    let mut excluded = 0usize;
    for record in records {
        let slot = axis(record.probability)
            .zip(axis(record.impact))
            .and_then(|(p, i)| index_of(p, i));
        match slot {
            Some(idx) => buckets[idx].records.push(record.clone()),
            None => {
                excluded += 1;
                debug!(
                    id = %record.id,
                    probability = record.probability,
                    impact = record.impact,
                    "record outside heat-map domain, excluded"
                );
            }
        }
    }

    HeatmapGrid { buckets, excluded }
}
