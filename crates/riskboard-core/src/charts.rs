//! Chart datasets derived from a snapshot.

use serde::Serialize;

use crate::classify::{Taxonomy, series_colors};
use crate::snapshot::DashboardSnapshot;

/// Line color of the daily trend.
pub const TREND_COLOR: &str = "#0d6efd";

/// Colors cycled across category slices.
pub const CATEGORY_PALETTE: &[&str] = &[
    "#0d6efd", "#6610f2", "#20c997", "#fd7e14", "#d63384", "#0dcaf0", "#6c757d", "#198754",
];

/// One chart dataset: labels, values and per-point colors, index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Vec<&'static str>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Every chart the dashboard draws.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardCharts {
    pub trend: ChartSeries,
    pub categories: ChartSeries,
    pub risk_levels: ChartSeries,
}

impl DashboardCharts {
    pub fn from_snapshot(snapshot: &DashboardSnapshot) -> Self {
        let trend = ChartSeries {
            labels: snapshot
                .trend_series
                .iter()
                .map(|p| p.date.format("%Y-%m-%d").to_string())
                .collect(),
            values: snapshot.trend_series.iter().map(|p| p.count as f64).collect(),
            colors: vec![TREND_COLOR; snapshot.trend_series.len()],
        };

        let categories = ChartSeries {
            labels: snapshot
                .category_distribution
                .iter()
                .map(|c| c.category.clone())
                .collect(),
            values: snapshot
                .category_distribution
                .iter()
                .map(|c| c.count as f64)
                .collect(),
            colors: CATEGORY_PALETTE
                .iter()
                .copied()
                .cycle()
                .take(snapshot.category_distribution.len())
                .collect(),
        };

        let s = &snapshot.summary;
        let levels = ["low", "medium", "high"];
        let risk_levels = ChartSeries {
            labels: vec!["Low".into(), "Medium".into(), "High".into()],
            values: vec![s.low_risks as f64, s.medium_risks as f64, s.high_risks as f64],
            colors: series_colors(Taxonomy::Risk, levels),
        };

        Self {
            trend,
            categories,
            risk_levels,
        }
    }
}
