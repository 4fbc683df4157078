//! Refresh controller: single-flight fetch cycles, the auto-refresh timer,
//! and fan-out of each new snapshot to the dashboard widgets.
//!
//! All session state lives in the controller. A cycle moves
//! `Idle → Fetching → Applying | Failed → Idle`; triggers that arrive while a
//! cycle is in flight are dropped. Every cycle ends by swapping in a complete
//! snapshot, live on success and synthetic on failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use riskboard_core::{
    DashboardCharts, DashboardQuery, DashboardSnapshot, ExportRequest, ExportResponse,
};
use riskboard_sync::FetchError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::animator::MetricAnimator;
use crate::config::RefreshConfig;
use crate::notify::{NotificationQueue, Severity};
use crate::source::DashboardSource;
use crate::view::DashboardView;

/// What started a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Initial,
    Manual,
    Timer,
    /// Time range or department filter changed.
    ParamsChanged,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Manual => "manual",
            Self::Timer => "timer",
            Self::ParamsChanged => "params_changed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Fetching,
    Applying,
    Failed,
}

/// How a cycle ended. Both outcomes leave a complete snapshot in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// The fetch failed and synthetic data was applied instead.
    FellBack,
}

struct Session {
    phase: RefreshPhase,
    query: DashboardQuery,
    auto_refresh: bool,
    timer: Option<JoinHandle<()>>,
    last_error: Option<String>,
}

struct Inner<S: DashboardSource> {
    source: S,
    config: RefreshConfig,
    view: DashboardView,
    animator: MetricAnimator,
    notifications: NotificationQueue,
    snapshot: watch::Sender<Arc<DashboardSnapshot>>,
    in_flight: AtomicBool,
    session: Mutex<Session>,
}

/// Clears the single-flight flag when a cycle ends, however it ends.
struct InFlightGuard<S: DashboardSource>(Arc<Inner<S>>);

impl<S: DashboardSource> Drop for InFlightGuard<S> {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

/// Owns one dashboard session. Dropping it stops the auto-refresh timer.
///
/// Methods that spawn work must be called from within a tokio runtime.
pub struct RefreshController<S: DashboardSource> {
    inner: Arc<Inner<S>>,
}

impl<S: DashboardSource> RefreshController<S> {
    pub fn new(source: S, view: DashboardView, config: RefreshConfig) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(DashboardSnapshot::empty(Utc::now())));
        let inner = Inner {
            source,
            animator: MetricAnimator::new(config.animation.clone()),
            notifications: NotificationQueue::new(config.notifications.clone()),
            view,
            snapshot,
            in_flight: AtomicBool::new(false),
            session: Mutex::new(Session {
                phase: RefreshPhase::Idle,
                query: DashboardQuery::default(),
                auto_refresh: false,
                timer: None,
                last_error: None,
            }),
            config,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Set the query used from the first cycle on, without fetching.
    pub fn with_query(self, query: DashboardQuery) -> Self {
        self.inner.lock().query = query;
        self
    }

    /// Classify badge hooks, arm the timer if configured, and run the first cycle.
    pub fn initialize(&self) -> Option<JoinHandle<RefreshOutcome>> {
        match &self.inner.view.badges {
            Some(badges) => {
                let styled = badges.auto_classify();
                debug!(styled, "classified badge hooks");
            }
            None => debug!("no badge panel"),
        }
        if self.inner.config.auto_refresh {
            self.set_auto_refresh(true);
        }
        self.start(Trigger::Initial)
    }

    /// Dispatch a cycle unless one is already in flight.
    ///
    /// Returns `None` when the trigger was dropped.
    pub fn start(&self, trigger: Trigger) -> Option<JoinHandle<RefreshOutcome>> {
        Inner::start(&self.inner, trigger)
    }

    /// Arm or disarm the auto-refresh timer.
    ///
    /// Arming schedules the first tick one period from now. Disarming stops
    /// the timer only; a cycle already in flight still completes and applies.
    pub fn set_auto_refresh(&self, enabled: bool) {
        let mut session = self.inner.lock();
        if enabled && session.timer.is_some() {
            return;
        }
        session.auto_refresh = enabled;
        if let Some(timer) = session.timer.take() {
            timer.abort();
        }
        if enabled {
            session.timer = Some(spawn_timer(
                Arc::downgrade(&self.inner),
                self.inner.config.period,
            ));
        }
        info!(enabled, period_secs = self.inner.config.period.as_secs(), "auto-refresh toggled");
    }

    pub fn auto_refresh(&self) -> bool {
        self.inner.lock().auto_refresh
    }

    /// Replace the query and refresh now. The timer cadence is untouched.
    pub fn set_query(&self, query: DashboardQuery) -> Option<JoinHandle<RefreshOutcome>> {
        self.inner.lock().query = query;
        self.start(Trigger::ParamsChanged)
    }

    pub fn query(&self) -> DashboardQuery {
        self.inner.lock().query.clone()
    }

    pub fn phase(&self) -> RefreshPhase {
        self.inner.lock().phase
    }

    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Message of the most recent failed cycle, cleared by a successful one.
    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSnapshot>> {
        self.inner.snapshot.subscribe()
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.inner.notifications
    }

    pub fn view(&self) -> &DashboardView {
        &self.inner.view
    }

    /// Request an export and report the result as a notification.
    pub async fn export(&self, request: &ExportRequest) -> Result<ExportResponse, FetchError> {
        match self.inner.source.export(request).await {
            Ok(response) => {
                self.inner.notifications.enqueue(
                    format!("Export ready: {}", response.filename),
                    Severity::Success,
                );
                Ok(response)
            }
            Err(err) => {
                warn!(error = %err, "export failed");
                self.inner
                    .notifications
                    .enqueue(format!("Export failed: {err}"), Severity::Error);
                Err(err)
            }
        }
    }

    /// Stop the timer. In-flight cycles and animations run to completion.
    pub fn shutdown(&self) {
        let mut session = self.inner.lock();
        session.auto_refresh = false;
        if let Some(timer) = session.timer.take() {
            timer.abort();
        }
    }
}

impl<S: DashboardSource> Drop for RefreshController<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_timer<S: DashboardSource>(
    inner: Weak<Inner<S>>,
    period: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            Inner::start(&inner, Trigger::Timer);
        }
    })
}

impl<S: DashboardSource> Inner<S> {
    fn start(this: &Arc<Self>, trigger: Trigger) -> Option<JoinHandle<RefreshOutcome>> {
        if this
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(trigger = trigger.as_str(), "refresh already in flight, trigger dropped");
            return None;
        }
        this.lock().phase = RefreshPhase::Fetching;
        let guard = InFlightGuard(Arc::clone(this));
        Some(tokio::spawn(async move {
            let outcome = guard.0.run_cycle(trigger).await;
            drop(guard);
            outcome
        }))
    }

    async fn run_cycle(&self, trigger: Trigger) -> RefreshOutcome {
        let query = self.lock().query.clone();
        info!(
            trigger = trigger.as_str(),
            time_range = %query.time_range,
            department = query.department_id.as_deref().unwrap_or("all"),
            "refreshing dashboard"
        );

        match self.source.fetch(&query).await {
            Ok(payload) => {
                {
                    let mut session = self.lock();
                    session.phase = RefreshPhase::Applying;
                    session.last_error = None;
                }
                info!(trigger = trigger.as_str(), "dashboard updated");
                // Enqueued before the swap so subscribers see it with the snapshot.
                self.notifications
                    .enqueue("Dashboard updated", Severity::Success);
                self.apply(DashboardSnapshot::from_payload(payload, Utc::now()));
                self.lock().phase = RefreshPhase::Idle;
                RefreshOutcome::Applied
            }
            Err(err) => {
                warn!(
                    trigger = trigger.as_str(),
                    error = %err,
                    "dashboard refresh failed, applying synthetic data"
                );
                {
                    let mut session = self.lock();
                    session.phase = RefreshPhase::Failed;
                    session.last_error = Some(err.to_string());
                }
                self.notifications.enqueue(
                    format!("Failed to load dashboard data: {err}"),
                    Severity::Error,
                );
                self.apply(DashboardSnapshot::synthetic(Utc::now()));
                self.lock().phase = RefreshPhase::Idle;
                RefreshOutcome::FellBack
            }
        }
    }

    /// Swap the snapshot in, then let each present widget update from it.
    fn apply(&self, snapshot: DashboardSnapshot) {
        let snapshot = Arc::new(snapshot);
        self.snapshot.send_replace(Arc::clone(&snapshot));

        match &self.view.metrics {
            Some(panel) => {
                for (key, text) in snapshot.summary.display_values() {
                    self.animator
                        .spawn(Arc::clone(panel), key.to_string(), text);
                }
            }
            None => debug!("no metric panel"),
        }

        match &self.view.charts {
            Some(charts) => charts.update(DashboardCharts::from_snapshot(&snapshot)),
            None => debug!("no chart panel"),
        }

        match &self.view.heatmap {
            Some(heatmap) => heatmap.render(&snapshot.heatmap),
            None => debug!("no heat map"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use riskboard_core::{DashboardPayload, SnapshotSource, TimeRange, parse_dashboard};
    use tokio::sync::Notify;
    use tokio::time::sleep;

    const PAYLOAD: &str = r#"{
        "summary": {
            "total_risks": 42, "high_risks": 7, "medium_risks": 15, "low_risks": 20,
            "total_assessments": 12, "completed_assessments": 9, "pending_assessments": 3,
            "total_controls": 30, "effective_controls": 24, "compliance_score": 87.5
        },
        "risk_trends": [{"date": "2026-10-16", "count": 3}],
        "category_distribution": [{"category": "Operational", "count": 18}],
        "heatmap_data": [
            {"risk_id": 7, "title": "Fraudulent claims", "category": "Operational",
             "department": "Claims", "probability": 4, "impact": 5}
        ]
    }"#;

    #[derive(Default)]
    struct FakeSource {
        calls: AtomicUsize,
        fail: AtomicBool,
        gated: AtomicBool,
        gate: Notify,
        queries: Mutex<Vec<DashboardQuery>>,
    }

    impl FakeSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl DashboardSource for FakeSource {
        async fn fetch(&self, query: &DashboardQuery) -> Result<DashboardPayload, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());
            if self.gated.load(Ordering::SeqCst) {
                self.gate.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::Server {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(parse_dashboard(PAYLOAD)?)
        }

        async fn export(&self, request: &ExportRequest) -> Result<ExportResponse, FetchError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::Server {
                    status: 400,
                    body: "Invalid export format".into(),
                });
            }
            Ok(ExportResponse {
                filename: format!("{:?}_export.xlsx", request.data_type).to_lowercase(),
                message: None,
                size: Some(1024),
                download_url: None,
            })
        }
    }

    fn manual_config() -> RefreshConfig {
        RefreshConfig {
            auto_refresh: false,
            ..RefreshConfig::default()
        }
    }

    fn controller(
        source: &Arc<FakeSource>,
        view: DashboardView,
        config: RefreshConfig,
    ) -> RefreshController<Arc<FakeSource>> {
        RefreshController::new(Arc::clone(source), view, config)
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_triggers_fetch_once() {
        let source = Arc::new(FakeSource::default());
        source.gated.store(true, Ordering::SeqCst);
        let ctl = controller(&source, DashboardView::full(), manual_config());

        let first = ctl.start(Trigger::Manual).expect("first trigger dispatches");
        assert_eq!(ctl.phase(), RefreshPhase::Fetching);
        tokio::task::yield_now().await;
        assert_eq!(ctl.phase(), RefreshPhase::Fetching);
        assert!(ctl.start(Trigger::Manual).is_none());
        assert!(ctl.start(Trigger::Timer).is_none());

        source.gate.notify_one();
        assert_eq!(first.await.unwrap(), RefreshOutcome::Applied);
        assert_eq!(source.calls(), 1);
        assert!(!ctl.is_in_flight());
        assert_eq!(ctl.phase(), RefreshPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_falls_back_to_synthetic_snapshot() {
        let source = Arc::new(FakeSource::default());
        source.fail.store(true, Ordering::SeqCst);
        let ctl = controller(&source, DashboardView::full(), manual_config());

        let outcome = ctl.start(Trigger::Manual).unwrap().await.unwrap();
        assert_eq!(outcome, RefreshOutcome::FellBack);

        let snapshot = ctl.snapshot();
        assert_eq!(snapshot.source, SnapshotSource::Synthetic);
        assert!(snapshot.is_fully_populated());
        assert_eq!(ctl.notifications().count(Severity::Error), 1);
        assert_eq!(ctl.notifications().count(Severity::Success), 0);
        assert!(ctl.last_error().unwrap().contains("500"));
        assert_eq!(ctl.phase(), RefreshPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn success_updates_every_widget() {
        let source = Arc::new(FakeSource::default());
        let view = DashboardView::full();
        let ctl = controller(&source, view.clone(), manual_config());

        let outcome = ctl.start(Trigger::Manual).unwrap().await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Applied);

        let snapshot = ctl.snapshot();
        assert_eq!(snapshot.source, SnapshotSource::Live);
        assert_eq!(snapshot.summary.total_risks, 42);
        assert_eq!(snapshot.heatmap.get(4, 5).unwrap().count(), 1);

        let charts = view.charts.as_ref().unwrap();
        assert_eq!(charts.update_count(), 1);
        assert_eq!(charts.current().categories.labels, vec!["Operational"]);
        assert_eq!(view.heatmap.as_ref().unwrap().drill_down(4, 5).len(), 1);
        assert_eq!(ctl.notifications().count(Severity::Success), 1);
        assert!(ctl.last_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn success_clears_previous_error() {
        let source = Arc::new(FakeSource::default());
        source.fail.store(true, Ordering::SeqCst);
        let ctl = controller(&source, DashboardView::headless(), manual_config());
        ctl.start(Trigger::Manual).unwrap().await.unwrap();
        assert!(ctl.last_error().is_some());

        source.fail.store(false, Ordering::SeqCst);
        ctl.start(Trigger::Manual).unwrap().await.unwrap();
        assert!(ctl.last_error().is_none());
        assert_eq!(ctl.snapshot().source, SnapshotSource::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_auto_refresh_keeps_in_flight_fetch() {
        let source = Arc::new(FakeSource::default());
        source.gated.store(true, Ordering::SeqCst);
        let ctl = controller(&source, DashboardView::full(), RefreshConfig::default());

        let initial = ctl.initialize().unwrap();
        assert!(ctl.auto_refresh());
        tokio::task::yield_now().await;

        ctl.set_auto_refresh(false);
        assert!(!ctl.auto_refresh());
        source.gate.notify_one();

        assert_eq!(initial.await.unwrap(), RefreshOutcome::Applied);
        assert_eq!(ctl.snapshot().source, SnapshotSource::Live);

        sleep(Duration::from_secs(120)).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_each_period_without_immediate_fetch() {
        let source = Arc::new(FakeSource::default());
        let ctl = controller(&source, DashboardView::headless(), manual_config());

        ctl.set_auto_refresh(true);
        sleep(Duration::from_secs(29)).await;
        assert_eq!(source.calls(), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(source.calls(), 1);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 2);

        ctl.set_auto_refresh(false);
        sleep(Duration::from_secs(90)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_while_armed_keeps_cadence() {
        let source = Arc::new(FakeSource::default());
        let ctl = controller(&source, DashboardView::headless(), manual_config());

        ctl.set_auto_refresh(true);
        sleep(Duration::from_secs(20)).await;
        ctl.set_auto_refresh(true);
        assert!(ctl.auto_refresh());

        // Still due at 30s; a reset timer would wait until 50s.
        sleep(Duration::from_secs(11)).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn success_notification_is_queued_before_snapshot_swap() {
        let source = Arc::new(FakeSource::default());
        let ctl = controller(&source, DashboardView::headless(), manual_config());
        let mut updates = ctl.subscribe();
        let queue = ctl.notifications().clone();
        let watcher = tokio::spawn(async move {
            updates.changed().await.unwrap();
            queue.count(Severity::Success)
        });

        ctl.start(Trigger::Manual).unwrap().await.unwrap();
        assert_eq!(watcher.await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn query_change_fetches_now_and_keeps_cadence() {
        let source = Arc::new(FakeSource::default());
        let ctl = controller(&source, DashboardView::headless(), manual_config());
        ctl.set_auto_refresh(true);

        sleep(Duration::from_secs(10)).await;
        let handle = ctl
            .set_query(DashboardQuery {
                time_range: TimeRange::Week,
                department_id: Some("3".into()),
            })
            .unwrap();
        handle.await.unwrap();
        assert_eq!(source.calls(), 1);
        assert_eq!(ctl.query().time_range, TimeRange::Week);

        // The timer still fires at 30s, not 40s.
        sleep(Duration::from_secs(21)).await;
        assert_eq!(source.calls(), 2);
        let queries = source.queries.lock().unwrap();
        assert!(queries.iter().all(|q| q.time_range == TimeRange::Week));
    }

    #[tokio::test(start_paused = true)]
    async fn metrics_count_up_to_summary() {
        let source = Arc::new(FakeSource::default());
        let view = DashboardView::full();
        let ctl = controller(&source, view.clone(), manual_config());
        ctl.start(Trigger::Manual).unwrap().await.unwrap();

        let metrics = view.metrics.as_ref().unwrap();
        sleep(Duration::from_millis(1_100)).await;
        let total = metrics.cell("total_risks").unwrap();
        assert_eq!(total.text, "42");
        assert!(total.updated);
        assert_eq!(metrics.text("compliance_score").as_deref(), Some("87.5%"));

        sleep(Duration::from_millis(500)).await;
        assert!(!metrics.cell("total_risks").unwrap().updated);
    }

    #[tokio::test(start_paused = true)]
    async fn headless_view_still_swaps_snapshot() {
        let source = Arc::new(FakeSource::default());
        let ctl = controller(&source, DashboardView::headless(), manual_config());
        let mut rx = ctl.subscribe();
        assert_eq!(rx.borrow().source, SnapshotSource::Empty);

        ctl.start(Trigger::Manual).unwrap().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().source, SnapshotSource::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_view_skips_missing_widgets() {
        let source = Arc::new(FakeSource::default());
        let view = DashboardView {
            heatmap: DashboardView::full().heatmap,
            ..DashboardView::headless()
        };
        let ctl = controller(&source, view.clone(), manual_config());
        ctl.start(Trigger::Manual).unwrap().await.unwrap();
        assert_eq!(view.heatmap.as_ref().unwrap().cells().len(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn export_reports_through_notifications() {
        let source = Arc::new(FakeSource::default());
        let ctl = controller(&source, DashboardView::headless(), manual_config());

        let response = ctl.export(&ExportRequest::default()).await.unwrap();
        assert_eq!(response.filename, "risks_export.xlsx");
        let entries = ctl.notifications().entries();
        assert_eq!(entries[0].message, "Export ready: risks_export.xlsx");

        source.fail.store(true, Ordering::SeqCst);
        assert!(ctl.export(&ExportRequest::default()).await.is_err());
        assert_eq!(ctl.notifications().count(Severity::Error), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_controller_stops_timer() {
        let source = Arc::new(FakeSource::default());
        let ctl = controller(&source, DashboardView::headless(), manual_config());
        ctl.set_auto_refresh(true);
        drop(ctl);

        sleep(Duration::from_secs(90)).await;
        assert_eq!(source.calls(), 0);
    }
}
