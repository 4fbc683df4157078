//! Dashboard domain: classification taxonomies, heat-map aggregation, wire payloads, snapshots.

pub mod charts;
pub mod classify;
pub mod heatmap;
pub mod payload;
pub mod render;
pub mod snapshot;

pub use charts::{ChartSeries, DashboardCharts};
pub use classify::{
    CategoryDescriptor, LegendEntry, RawValue, Taxonomy, badge_markup, classify, legend,
    series_colors,
};
pub use heatmap::{HeatmapBucket, HeatmapGrid, RiskRecord, aggregate};
pub use payload::{
    CategoryCount, DashboardPayload, DashboardQuery, ExportDataType, ExportFormat, ExportRequest,
    ExportResponse, PayloadError, SummaryMetrics, TimeRange, TrendPoint, parse_dashboard,
};
pub use snapshot::{DashboardSnapshot, SnapshotSource};
