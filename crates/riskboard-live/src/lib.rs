//! Live dashboard runtime: refresh cycles, metric animation, notifications.
//!
//! A [`RefreshController`] owns one dashboard session. It pulls payloads from
//! a [`DashboardSource`], swaps in an immutable snapshot, and fans it out to
//! whichever widgets of the [`DashboardView`] are present.

pub mod animator;
pub mod config;
pub mod controller;
pub mod notify;
pub mod source;
pub mod view;

pub use animator::{Animation, MetricAnimator, ValueFormat, ease_out_quart};
pub use config::{AnimationConfig, NotificationConfig, RefreshConfig};
pub use controller::{RefreshController, RefreshOutcome, RefreshPhase, Trigger};
pub use notify::{Notification, NotificationQueue, Phase, Severity};
pub use source::DashboardSource;
pub use view::{BadgePanel, ChartPanel, DashboardView, HeatmapPanel, MetricCell, MetricPanel};
