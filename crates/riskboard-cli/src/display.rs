//! Terminal rendering of dashboard snapshots.
//!
//! Prints a snapshot as grouped sections with aligned columns. The heat map
//! is drawn with impact rows 5→1 and probability columns 1→5.

use riskboard_core::{
    CategoryDescriptor, DashboardCharts, DashboardSnapshot, HeatmapBucket, LegendEntry,
    SnapshotSource, Taxonomy,
};
use riskboard_live::{Notification, Phase};

const MAX_TREND_POINTS: usize = 10;
const CELL_WIDTH: usize = 6;

// ── Public API ──

/// Print every section of a snapshot, followed by the current notifications.
pub fn print_snapshot(snapshot: &DashboardSnapshot, notifications: &[Notification]) {
    let source = match snapshot.source {
        SnapshotSource::Empty => "empty",
        SnapshotSource::Live => "live",
        SnapshotSource::Synthetic => "synthetic fallback",
    };
    println!("=== Risk Dashboard ({source}) ===");
    println!("{}", snapshot.taken_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();

    let charts = DashboardCharts::from_snapshot(snapshot);

    println!("Summary");
    for (key, value) in snapshot.summary.display_values() {
        println!("  {:<26} {}", key, value);
    }
    println!();

    println!("Risk Levels");
    for ((label, value), color) in charts
        .risk_levels
        .labels
        .iter()
        .zip(&charts.risk_levels.values)
        .zip(&charts.risk_levels.colors)
    {
        println!("  {:<26} {:<6} {}", label, value, color);
    }
    println!();

    print_trend(snapshot);
    print_categories(&charts);
    print_heatmap(snapshot);
    print_notifications(notifications);
}

/// Print one classification result: descriptor, badge markup and legend line.
pub fn print_classification(taxonomy: Taxonomy, value: &str, d: &CategoryDescriptor, badge: &str) {
    println!("{taxonomy} {value:?}");
    println!("  {:<26} {}", "label", d.label);
    println!("  {:<26} {}", "style_class", d.style_class);
    println!("  {:<26} {}", "color", d.color);
    println!("  {:<26} {}", "badge", badge);
}

pub fn print_legend(taxonomy: Taxonomy, entries: &[LegendEntry]) {
    println!("Legend ({taxonomy})");
    for entry in entries {
        println!("  {:<26} {}", entry.label, entry.swatch);
    }
}

// ── Sections ──

fn print_trend(snapshot: &DashboardSnapshot) {
    let points = &snapshot.trend_series;
    if points.is_empty() {
        return;
    }
    println!("Trend ({} days)", points.len());
    let skipped = points.len().saturating_sub(MAX_TREND_POINTS);
    if skipped > 0 {
        println!("  ... {skipped} earlier days");
    }
    for point in &points[skipped..] {
        println!("  {:<26} {}", point.date, point.count);
    }
    println!();
}

fn print_categories(charts: &DashboardCharts) {
    if charts.categories.is_empty() {
        return;
    }
    println!("Categories");
    for (label, value) in charts.categories.labels.iter().zip(&charts.categories.values) {
        println!("  {:<26} {}", label, value);
    }
    println!();
}

fn print_heatmap(snapshot: &DashboardSnapshot) {
    let grid = &snapshot.heatmap;
    println!("Heat Map ({} risks)", grid.total());
    let header: String = (1..=5).map(|p| format!("{:>CELL_WIDTH$}", p)).collect();
    println!("  {:<14}{}", "impact \\ prob", header);
    for row in grid.rows() {
        let impact = row.first().map(|b| b.impact).unwrap_or_default();
        println!("  {:<14}{}", impact, heatmap_row(row));
    }
    if grid.excluded() > 0 {
        println!("  {:<26} {}", "excluded (out of range)", grid.excluded());
    }
    println!();
}

fn print_notifications(notifications: &[Notification]) {
    if notifications.is_empty() {
        return;
    }
    println!("Notifications");
    for n in notifications {
        let fading = if n.phase == Phase::Fading { " (fading)" } else { "" };
        println!("  {:<26} {}{}", format!("[{}]", n.severity.as_str()), n.message, fading);
    }
    println!();
}

// ── Helpers ──

/// Counts for one heat-map row; empty cells show as `.`.
fn heatmap_row(row: &[HeatmapBucket]) -> String {
    row.iter()
        .map(|b| match b.count() {
            0 => format!("{:>CELL_WIDTH$}", "."),
            n => format!("{:>CELL_WIDTH$}", n),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskboard_core::{RiskRecord, aggregate};

    fn record(probability: i32, impact: i32) -> RiskRecord {
        RiskRecord {
            id: String::new(),
            title: "r".into(),
            category: "Operational".into(),
            department: "Operations".into(),
            probability,
            impact,
        }
    }

    #[test]
    fn heatmap_rows_render_counts() {
        let grid = aggregate(&[record(5, 5), record(5, 5), record(1, 1)]);
        let rows: Vec<String> = grid.rows().map(heatmap_row).collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], "     .     .     .     .     2");
        assert_eq!(rows[4], "     1     .     .     .     .");
    }
}
