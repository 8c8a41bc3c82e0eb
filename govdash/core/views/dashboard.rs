use serde::Serialize;
use serde_json::json;
use shared_logging::LogLevel;

use super::{report_load, shared_state, PollHandle, SharedState, ViewContext, ViewPhase, ViewState};
use crate::{
    aggregator::ChartSummary,
    client::{ApiClient, Fetched},
    error::ApiError,
    model::{Activity, DashboardMetrics},
    telemetry::DashboardTelemetry,
};

/// Everything the dashboard page shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    /// Headline metrics.
    pub metrics: DashboardMetrics,
    /// Compliance status chart.
    pub compliance: ChartSummary,
    /// Whether the compliance chart was derived from the monitor list.
    pub compliance_derived: bool,
    /// Risk distribution chart.
    pub risk: ChartSummary,
    /// Recent activity feed.
    pub activities: Vec<Activity>,
}

/// Dashboard page controller.
#[derive(Debug)]
pub struct DashboardView {
    client: ApiClient,
    telemetry: DashboardTelemetry,
    state: SharedState<DashboardSnapshot>,
    ctx: ViewContext,
    poll: Option<PollHandle>,
}

impl DashboardView {
    /// Creates an idle view.
    #[must_use]
    pub fn new(ctx: &ViewContext) -> Self {
        Self {
            client: ctx.client.clone(),
            telemetry: ctx.view_telemetry("dashboard"),
            state: shared_state(),
            ctx: ctx.clone(),
            poll: None,
        }
    }

    /// Loads once and starts polling when enabled.
    pub async fn mount(&mut self) -> ViewPhase {
        let phase = self.refresh().await;
        if let Some(period) = self.ctx.polling.dashboard() {
            let client = self.client.clone();
            let telemetry = self.telemetry.clone();
            let state = self.state.clone();
            self.poll = Some(PollHandle::spawn(period, move || {
                let client = client.clone();
                let telemetry = telemetry.clone();
                let state = state.clone();
                async move {
                    load(&client, &telemetry, &state).await;
                }
            }));
        }
        phase
    }

    /// Reloads every panel in parallel.
    pub async fn refresh(&self) -> ViewPhase {
        load(&self.client, &self.telemetry, &self.state).await
    }

    /// Cancels polling.
    pub fn unmount(&mut self) {
        self.poll = None;
    }

    /// Whether a poll task is running.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(PollHandle::is_running)
    }

    /// Snapshot of the view state.
    #[must_use]
    pub fn state(&self) -> ViewState<DashboardSnapshot> {
        self.state.lock().clone()
    }
}

async fn load(
    client: &ApiClient,
    telemetry: &DashboardTelemetry,
    state: &SharedState<DashboardSnapshot>,
) -> ViewPhase {
    let previous = {
        let mut guard = state.lock();
        guard.begin_load();
        guard.data().cloned().unwrap_or_default()
    };
    let fetched = fetch_snapshot(client, telemetry, previous).await;
    let banner = fetched.banner();
    let phase = {
        let mut guard = state.lock();
        match fetched.error {
            None => guard.succeed(fetched.value),
            Some(err) => {
                guard.set_data(fetched.value);
                guard.fail(err.message());
            }
        }
        guard.phase()
    };
    report_load(telemetry, banner).await;
    phase
}

/// Fetches all panels; a failed panel keeps its previous content.
async fn fetch_snapshot(
    client: &ApiClient,
    telemetry: &DashboardTelemetry,
    previous: DashboardSnapshot,
) -> Fetched<DashboardSnapshot> {
    let (metrics, compliance, risk, activities) = tokio::join!(
        client.dashboard_metrics(),
        client.compliance_status_chart(),
        client.risk_distribution_chart(),
        client.recent_activities(),
    );
    let mut errors: Vec<ApiError> = Vec::new();
    let mut keep = |fetched_error: Option<ApiError>| {
        let failed = fetched_error.is_some();
        errors.extend(fetched_error);
        failed
    };

    let mut snapshot = previous;
    let metrics_failed = keep(metrics.error);
    if !metrics_failed {
        snapshot.metrics = metrics.value;
    }
    let risk_failed = keep(risk.error);
    if !risk_failed {
        snapshot.risk = ChartSummary::from_chart(&risk.value);
    }
    let activities_failed = keep(activities.error);
    if !activities_failed {
        snapshot.activities = activities.value;
    }
    let compliance_failed = keep(compliance.error);
    let backend_chart = ChartSummary::from_chart(&compliance.value);
    if compliance_failed || backend_chart.is_empty() {
        let monitors = client.list_compliance_monitors().await;
        if monitors.is_degraded() {
            if !compliance_failed {
                snapshot.compliance = backend_chart;
                snapshot.compliance_derived = false;
            }
        } else {
            snapshot.compliance = ChartSummary::compliance(&monitors.value);
            snapshot.compliance_derived = true;
            telemetry
                .record(
                    LogLevel::Debug,
                    "dashboard.compliance_chart.derived",
                    json!({ "monitors": monitors.value.len() }),
                )
                .await;
        }
    } else {
        snapshot.compliance = backend_chart;
        snapshot.compliance_derived = false;
    }

    Fetched {
        value: snapshot,
        error: errors.into_iter().next(),
    }
}
