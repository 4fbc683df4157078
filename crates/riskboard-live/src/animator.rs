//! Eased count-up of metric cells.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::config::AnimationConfig;
use crate::view::MetricPanel;

/// `1 - (1 - t)^4`, with `t` clamped to `[0, 1]`.
pub fn ease_out_quart(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(4)
}

/// How intermediate frames are rendered, inferred from the target text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// One decimal and a `%` suffix.
    Percent,
    /// One decimal.
    Decimal,
    /// Rounded to the nearest integer.
    Integer,
}

impl ValueFormat {
    pub fn detect(target: &str) -> Self {
        if target.contains('%') {
            Self::Percent
        } else if target.contains('.') {
            Self::Decimal
        } else {
            Self::Integer
        }
    }

    pub fn render(&self, value: f64) -> String {
        match self {
            Self::Percent => format!("{value:.1}%"),
            Self::Decimal => format!("{value:.1}"),
            Self::Integer => format!("{}", value.round() as i64),
        }
    }
}

/// Numeric part of a displayed value, ignoring thousands separators and `%`.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, ',' | '%') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// One interpolation from a displayed value to a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    start: f64,
    end: f64,
    format: ValueFormat,
    target: String,
    duration: Duration,
}

impl Animation {
    /// `None` when the target is not numeric; such values snap.
    ///
    /// A non-numeric current value counts from zero.
    pub fn new(current: &str, target: &str, duration: Duration) -> Option<Self> {
        let end = parse_numeric(target)?;
        Some(Self {
            start: parse_numeric(current).unwrap_or(0.0),
            end,
            format: ValueFormat::detect(target),
            target: target.to_string(),
            duration,
        })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn value_at(&self, elapsed: Duration) -> f64 {
        let t = if self.duration.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f64() / self.duration.as_secs_f64()
        };
        self.start + (self.end - self.start) * ease_out_quart(t)
    }

    /// Text to display at `elapsed`; exactly the target text once done.
    pub fn frame_at(&self, elapsed: Duration) -> String {
        if elapsed >= self.duration {
            self.target.clone()
        } else {
            self.format.render(self.value_at(elapsed))
        }
    }

    /// Every frame sampled at `interval`, ending on the target text.
    pub fn frames(&self, interval: Duration) -> Vec<String> {
        if interval.is_zero() {
            return vec![self.target.clone()];
        }
        let mut frames = Vec::new();
        let mut elapsed = interval;
        while elapsed < self.duration {
            frames.push(self.frame_at(elapsed));
            elapsed += interval;
        }
        frames.push(self.target.clone());
        frames
    }
}

/// Drives [`Animation`]s into a [`MetricPanel`].
#[derive(Debug, Clone, Default)]
pub struct MetricAnimator {
    config: AnimationConfig,
}

impl MetricAnimator {
    pub fn new(config: AnimationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Animate one cell to `target`.
    ///
    /// Returns `false` when the cell is missing or a later animation took it
    /// over; the superseded run stops writing at its next frame.
    pub async fn animate(&self, panel: &MetricPanel, key: &str, target: &str) -> bool {
        let Some((generation, current)) = panel.begin(key) else {
            debug!(key, "no metric cell, skipping animation");
            return false;
        };

        let animation = match Animation::new(&current, target, self.config.duration) {
            Some(a) if !self.config.frame_interval.is_zero() => a,
            _ => return panel.write(key, generation, target),
        };

        let started = Instant::now();
        loop {
            sleep(self.config.frame_interval).await;
            let elapsed = started.elapsed();
            if !panel.write(key, generation, &animation.frame_at(elapsed)) {
                trace!(key, "animation superseded");
                return false;
            }
            if elapsed >= animation.duration() {
                break;
            }
        }

        panel.mark(key, generation, true);
        sleep(self.config.highlight).await;
        panel.mark(key, generation, false);
        true
    }

    /// Run [`animate`](Self::animate) as a detached task.
    pub fn spawn(&self, panel: Arc<MetricPanel>, key: String, target: String) -> JoinHandle<bool> {
        let animator = self.clone();
        tokio::spawn(async move { animator.animate(&panel, &key, &target).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> Arc<MetricPanel> {
        Arc::new(MetricPanel::with_metrics(["total_risks", "compliance_score"]))
    }

    #[test]
    fn easing_endpoints() {
        assert_eq!(ease_out_quart(0.0), 0.0);
        assert_eq!(ease_out_quart(1.0), 1.0);
        assert_eq!(ease_out_quart(0.5), 0.9375);
        assert_eq!(ease_out_quart(2.0), 1.0);
    }

    #[test]
    fn format_detection() {
        assert_eq!(ValueFormat::detect("87.5%"), ValueFormat::Percent);
        assert_eq!(ValueFormat::detect("3.2"), ValueFormat::Decimal);
        assert_eq!(ValueFormat::detect("1,234"), ValueFormat::Integer);
        assert_eq!(ValueFormat::Percent.render(42.24), "42.2%");
        assert_eq!(ValueFormat::Integer.render(41.6), "42");
    }

    #[test]
    fn numeric_parsing() {
        assert_eq!(parse_numeric("1,234"), Some(1234.0));
        assert_eq!(parse_numeric("87.5%"), Some(87.5));
        assert_eq!(parse_numeric(" 7 "), Some(7.0));
        assert_eq!(parse_numeric("n/a"), None);
        assert_eq!(parse_numeric(""), None);
    }

    #[test]
    fn frames_follow_easing_and_end_exact() {
        let a = Animation::new("0", "100", Duration::from_millis(1000)).unwrap();
        assert_eq!(a.frame_at(Duration::from_millis(500)), "94");
        assert_eq!(a.frame_at(Duration::from_millis(1000)), "100");

        let pct = Animation::new("0%", "87.5%", Duration::from_millis(1000)).unwrap();
        let frames = pct.frames(Duration::from_millis(16));
        assert_eq!(frames.len(), 63);
        assert_eq!(frames.last().map(String::as_str), Some("87.5%"));
        assert!(frames.iter().all(|f| f.ends_with('%')));
    }

    #[test]
    fn non_numeric_target_has_no_animation() {
        assert!(Animation::new("0", "n/a", Duration::from_secs(1)).is_none());
        let from_dash = Animation::new("-", "10", Duration::from_secs(1)).unwrap();
        assert_eq!(from_dash.value_at(Duration::ZERO), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn animates_to_target_then_clears_highlight() {
        let panel = panel();
        let animator = MetricAnimator::default();
        let handle = animator.spawn(panel.clone(), "total_risks".into(), "42".into());

        sleep(Duration::from_millis(300)).await;
        let mid = panel.text("total_risks").unwrap();
        assert_ne!(mid, "0");
        assert_ne!(mid, "42");

        sleep(Duration::from_millis(800)).await;
        let cell = panel.cell("total_risks").unwrap();
        assert_eq!(cell.text, "42");
        assert!(cell.updated);

        sleep(Duration::from_millis(500)).await;
        assert!(!panel.cell("total_risks").unwrap().updated);
        assert!(handle.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn later_animation_supersedes_earlier() {
        let panel = panel();
        let animator = MetricAnimator::default();
        let first = animator.spawn(panel.clone(), "total_risks".into(), "100".into());
        sleep(Duration::from_millis(200)).await;
        let second = animator.spawn(panel.clone(), "total_risks".into(), "10".into());

        assert!(!first.await.unwrap());
        assert!(second.await.unwrap());
        assert_eq!(panel.text("total_risks").as_deref(), Some("10"));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_frame_interval_snaps() {
        let panel = panel();
        let animator = MetricAnimator::new(AnimationConfig {
            frame_interval: Duration::ZERO,
            ..AnimationConfig::default()
        });
        assert!(animator.animate(&panel, "compliance_score", "87.5%").await);
        let cell = panel.cell("compliance_score").unwrap();
        assert_eq!(cell.text, "87.5%");
        assert!(!cell.updated);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_cell_is_skipped() {
        let animator = MetricAnimator::default();
        assert!(!animator.animate(&panel(), "effective_controls", "3").await);
    }
}
