//! Dashboard snapshots: the unit of state the refresh controller swaps.

use chrono::{DateTime, Days, Utc};
use serde::Serialize;

use crate::classify::{Taxonomy, classify};
use crate::heatmap::{HeatmapGrid, RiskRecord, aggregate};
use crate::payload::{CategoryCount, DashboardPayload, SummaryMetrics, TrendPoint};

/// Where a snapshot's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Nothing fetched yet.
    Empty,
    Live,
    /// Fixed-shape fallback applied after a failed fetch.
    Synthetic,
}

/// An immutable bundle of everything the dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub summary: SummaryMetrics,
    pub trend_series: Vec<TrendPoint>,
    pub category_distribution: Vec<CategoryCount>,
    pub records: Vec<RiskRecord>,
    pub heatmap: HeatmapGrid,
    pub source: SnapshotSource,
    pub taken_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    /// The state before the first fetch completes.
    pub fn empty(taken_at: DateTime<Utc>) -> Self {
        Self {
            summary: SummaryMetrics::default(),
            trend_series: Vec::new(),
            category_distribution: Vec::new(),
            records: Vec::new(),
            heatmap: HeatmapGrid::default(),
            source: SnapshotSource::Empty,
            taken_at,
        }
    }

    /// Build a snapshot from a validated payload, aggregating the heat map.
    pub fn from_payload(payload: DashboardPayload, taken_at: DateTime<Utc>) -> Self {
        let heatmap = aggregate(&payload.heatmap_data);
        Self {
            summary: payload.summary,
            trend_series: payload.risk_trends,
            category_distribution: payload.category_distribution,
            records: payload.heatmap_data,
            heatmap,
            source: SnapshotSource::Live,
            taken_at,
        }
    }

    /// Deterministic fallback data covering every field.
    ///
    /// The shape depends only on `taken_at`'s date: 30 trend days ending on
    /// that date, six categories, and a fixed register of twelve risks whose
    /// counts feed the summary.
    pub fn synthetic(taken_at: DateTime<Utc>) -> Self {
        let records: Vec<RiskRecord> = SYNTHETIC_RISKS
            .iter()
            .enumerate()
            .map(|(n, &(title, category, department, probability, impact))| RiskRecord {
                id: format!("DEMO-{:03}", n + 1),
                title: title.to_string(),
                category: category.to_string(),
                department: department.to_string(),
                probability,
                impact,
            })
            .collect();

        let mut summary = SummaryMetrics {
            total_risks: records.len() as u64,
            total_assessments: 24,
            completed_assessments: 18,
            pending_assessments: 6,
            total_controls: 40,
            effective_controls: 31,
            compliance_score: 85.0,
            ..SummaryMetrics::default()
        };
        for r in &records {
            match classify(Taxonomy::Risk, r.score()).label {
                "Low" => summary.low_risks += 1,
                "Medium" => summary.medium_risks += 1,
                _ => summary.high_risks += 1,
            }
        }

        let today = taken_at.date_naive();
        let trend_series = (0..30u64)
            .filter_map(|i| {
                let date = today.checked_sub_days(Days::new(29 - i))?;
                Some(TrendPoint {
                    date,
                    count: (i * 7 + 3) % 6,
                })
            })
            .collect();

        let category_distribution = SYNTHETIC_CATEGORIES
            .iter()
            .map(|&(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();

        let heatmap = aggregate(&records);
        Self {
            summary,
            trend_series,
            category_distribution,
            records,
            heatmap,
            source: SnapshotSource::Synthetic,
            taken_at,
        }
    }

    /// All four top-level data sections are non-empty.
    pub fn is_fully_populated(&self) -> bool {
        self.summary.total_risks > 0
            && !self.trend_series.is_empty()
            && !self.category_distribution.is_empty()
            && self.heatmap.total() > 0
    }
}

const SYNTHETIC_CATEGORIES: &[(&str, u64)] = &[
    ("Operational", 4),
    ("Financial", 3),
    ("Technology", 2),
    ("Compliance", 1),
    ("Strategic", 1),
    ("Reputational", 1),
];

const SYNTHETIC_RISKS: &[(&str, &str, &str, i32, i32)] = &[
    ("Contribution collection arrears", "Financial", "Finance", 4, 5),
    ("Core system outage", "Technology", "Information Technology", 3, 5),
    ("Benefit payment fraud", "Operational", "Benefits Administration", 3, 4),
    ("Investment concentration", "Financial", "Investments", 2, 4),
    ("Regulatory reporting delay", "Compliance", "Compliance", 3, 3),
    ("Key staff turnover", "Operational", "Human Resources", 3, 2),
    ("Vendor contract lapse", "Operational", "Operations", 2, 2),
    ("Data quality gaps", "Technology", "Information Technology", 4, 2),
    ("Strategy misalignment", "Strategic", "Executive", 1, 4),
    ("Negative press coverage", "Reputational", "Public Relations", 2, 1),
    ("Audit finding backlog", "Operational", "Internal Audit", 1, 2),
    ("Cash forecasting error", "Financial", "Finance", 1, 1),
];
