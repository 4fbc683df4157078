//! Render surfaces the refresh controller writes into.
//!
//! Each widget is optional in [`DashboardView`]; a dashboard page may carry
//! any subset of them and an absent widget is simply skipped.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use riskboard_core::render::{self, Element};
use riskboard_core::{DashboardCharts, HeatmapGrid, RiskRecord, Taxonomy};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keys of the summary counters, in display order.
pub const METRIC_KEYS: &[&str] = &[
    "total_risks",
    "high_risks",
    "medium_risks",
    "low_risks",
    "total_assessments",
    "completed_assessments",
    "pending_assessments",
    "total_controls",
    "effective_controls",
    "compliance_score",
];

// ── Metrics ──

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricCell {
    pub text: String,
    /// Transient mark set when an animation completes.
    pub updated: bool,
    generation: u64,
}

/// Counter cells keyed by metric name.
#[derive(Debug, Default)]
pub struct MetricPanel {
    cells: Mutex<BTreeMap<String, MetricCell>>,
}

impl MetricPanel {
    /// A panel with one cell per key, each showing `0`.
    pub fn with_metrics<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let cells = keys
            .into_iter()
            .map(|k| {
                (
                    k.to_string(),
                    MetricCell {
                        text: "0".into(),
                        ..MetricCell::default()
                    },
                )
            })
            .collect();
        Self {
            cells: Mutex::new(cells),
        }
    }

    pub fn cell(&self, key: &str) -> Option<MetricCell> {
        lock(&self.cells).get(key).cloned()
    }

    pub fn text(&self, key: &str) -> Option<String> {
        lock(&self.cells).get(key).map(|c| c.text.clone())
    }

    /// Claim a cell for a new animation, superseding any running one.
    ///
    /// Returns the claim's generation and the currently displayed text.
    pub(crate) fn begin(&self, key: &str) -> Option<(u64, String)> {
        let mut cells = lock(&self.cells);
        let cell = cells.get_mut(key)?;
        cell.generation += 1;
        Some((cell.generation, cell.text.clone()))
    }

    /// Write a frame if `generation` still owns the cell.
    pub(crate) fn write(&self, key: &str, generation: u64, text: &str) -> bool {
        match lock(&self.cells).get_mut(key) {
            Some(cell) if cell.generation == generation => {
                cell.text = text.to_string();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark(&self, key: &str, generation: u64, updated: bool) -> bool {
        match lock(&self.cells).get_mut(key) {
            Some(cell) if cell.generation == generation => {
                cell.updated = updated;
                true
            }
            _ => false,
        }
    }
}

// ── Charts ──

#[derive(Debug, Default)]
pub struct ChartPanel {
    charts: Mutex<DashboardCharts>,
    updates: AtomicU64,
}

impl ChartPanel {
    pub fn update(&self, charts: DashboardCharts) {
        *lock(&self.charts) = charts;
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn current(&self) -> DashboardCharts {
        lock(&self.charts).clone()
    }

    /// How many times the charts have been redrawn.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

// ── Heat map ──

/// The 5×5 matrix: styled cells plus the grid behind them for drill-down.
#[derive(Debug, Default)]
pub struct HeatmapPanel {
    state: Mutex<(Vec<Element>, HeatmapGrid)>,
}

impl HeatmapPanel {
    pub fn render(&self, grid: &HeatmapGrid) {
        let cells = grid.buckets().iter().map(render::heatmap_cell).collect();
        *lock(&self.state) = (cells, grid.clone());
    }

    /// Styled cells in rendering order (impact 5→1, probability 1→5).
    pub fn cells(&self) -> Vec<Element> {
        lock(&self.state).0.clone()
    }

    /// Every record in one cell, unpaged.
    pub fn drill_down(&self, probability: u8, impact: u8) -> Vec<RiskRecord> {
        lock(&self.state)
            .1
            .get(probability, impact)
            .map(|b| b.records.clone())
            .unwrap_or_default()
    }
}

// ── Badges ──

/// Static page elements carrying `data-color-*` hooks.
#[derive(Debug, Default)]
pub struct BadgePanel {
    elements: Mutex<Vec<Element>>,
}

impl BadgePanel {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements: Mutex::new(elements),
        }
    }

    /// Style every hooked element. Returns how many were styled.
    pub fn auto_classify(&self) -> usize {
        render::auto_classify(&mut lock(&self.elements))
    }

    /// Re-style elements with the `selector` class from extracted values.
    pub fn update_dynamic_colors<F>(&self, selector: &str, taxonomy: Taxonomy, extractor: F) -> usize
    where
        F: Fn(&Element) -> Option<String>,
    {
        render::update_dynamic_colors(&mut lock(&self.elements), selector, taxonomy, extractor)
    }

    pub fn elements(&self) -> Vec<Element> {
        lock(&self.elements).clone()
    }
}

/// The widgets present on a dashboard page.
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub metrics: Option<Arc<MetricPanel>>,
    pub charts: Option<Arc<ChartPanel>>,
    pub heatmap: Option<Arc<HeatmapPanel>>,
    pub badges: Option<Arc<BadgePanel>>,
}

impl DashboardView {
    /// Every widget present, with the standard metric cells.
    pub fn full() -> Self {
        Self {
            metrics: Some(Arc::new(MetricPanel::with_metrics(METRIC_KEYS.iter().copied()))),
            charts: Some(Arc::new(ChartPanel::default())),
            heatmap: Some(Arc::new(HeatmapPanel::default())),
            badges: Some(Arc::new(BadgePanel::default())),
        }
    }

    /// No widgets at all; only the snapshot channel is updated.
    pub fn headless() -> Self {
        Self::default()
    }
}
