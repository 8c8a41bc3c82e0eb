use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;
use shared_logging::LogLevel;

use super::{
    refresh_state, report_submit, shared_state, FormModal, PollHandle, SharedState, ViewContext,
    ViewPhase, ViewState,
};
use crate::{
    aggregator::{compute_compliance_stats, distinct_models, group_by_model, ChartSummary, ComplianceStats},
    client::{ApiClient, Fetched},
    error::ApiError,
    model::{ComplianceMonitor, Created, MonitorForm, MonitorUpdate, RecordId},
    telemetry::DashboardTelemetry,
};

/// Monitors plus the model names offered by the filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplianceData {
    /// All monitors.
    pub monitors: Vec<ComplianceMonitor>,
    /// Distinct model/system names from monitors and assessments.
    pub models: Vec<String>,
}

/// Compliance monitoring page.
#[derive(Debug)]
pub struct ComplianceView {
    client: ApiClient,
    telemetry: DashboardTelemetry,
    ctx: ViewContext,
    state: SharedState<ComplianceData>,
    filter: Option<String>,
    create: FormModal<MonitorForm>,
    edit: FormModal<MonitorUpdate>,
    editing: Option<RecordId>,
    poll: Option<PollHandle>,
}

impl ComplianceView {
    /// Creates an idle view.
    #[must_use]
    pub fn new(ctx: &ViewContext) -> Self {
        Self {
            client: ctx.client.clone(),
            telemetry: ctx.view_telemetry("compliance"),
            ctx: ctx.clone(),
            state: shared_state(),
            filter: None,
            create: FormModal::new(),
            edit: FormModal::new(),
            editing: None,
            poll: None,
        }
    }

    /// Loads once and starts polling when enabled.
    pub async fn mount(&mut self) -> ViewPhase {
        let phase = self.refresh().await;
        if let Some(period) = self.ctx.polling.compliance() {
            let client = self.client.clone();
            let telemetry = self.telemetry.clone();
            let state = self.state.clone();
            self.poll = Some(PollHandle::spawn(period, move || {
                let client = client.clone();
                let telemetry = telemetry.clone();
                let state = state.clone();
                async move {
                    refresh_state(&state, &telemetry, fetch_data(&client, &telemetry)).await;
                }
            }));
        }
        phase
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

    /// Reloads monitors and the model list in parallel.
    pub async fn refresh(&self) -> ViewPhase {
        refresh_state(
            &self.state,
            &self.telemetry,
            fetch_data(&self.client, &self.telemetry),
        )
        .await
    }

    /// Snapshot of the view state.
    #[must_use]
    pub fn state(&self) -> ViewState<ComplianceData> {
        self.state.lock().clone()
    }

    /// Restricts the table to one model; `None` shows all.
    pub fn set_model_filter(&mut self, model: Option<String>) {
        self.filter = model.filter(|m| !m.trim().is_empty());
    }

    /// Active model filter.
    #[must_use]
    pub fn model_filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Monitors passing the model filter.
    #[must_use]
    pub fn visible_monitors(&self) -> Vec<ComplianceMonitor> {
        let state = self.state.lock();
        state
            .data()
            .map(|data| {
                data.monitors
                    .iter()
                    .filter(|m| {
                        self.filter
                            .as_deref()
                            .map_or(true, |model| m.model_or_system == model)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stats over the visible monitors.
    #[must_use]
    pub fn stats(&self) -> ComplianceStats {
        compute_compliance_stats(&self.visible_monitors())
    }

    /// Category chart over the visible monitors.
    #[must_use]
    pub fn chart(&self) -> ChartSummary {
        ChartSummary::compliance(&self.visible_monitors())
    }

    /// Visible monitors grouped by model, in first-seen order.
    #[must_use]
    pub fn by_model(&self) -> IndexMap<String, Vec<ComplianceMonitor>> {
        let visible = self.visible_monitors();
        group_by_model(&visible)
            .into_iter()
            .map(|(model, group)| (model, group.into_iter().cloned().collect()))
            .collect()
    }

    /// Loads one monitor for the detail modal.
    pub async fn show(&self, id: RecordId) -> Result<ComplianceMonitor, ApiError> {
        self.client.get_compliance_monitor(id).await
    }

    /// Create form, defaulting to a 0.8 threshold.
    pub fn create_form(&mut self) -> &mut FormModal<MonitorForm> {
        &mut self.create
    }

    /// Submits the create form; success closes it and reloads.
    pub async fn submit_create(&mut self) -> Result<Created, ApiError> {
        let client = self.client.clone();
        let outcome = self
            .create
            .submit(|form| async move { client.create_compliance_monitor(&form).await })
            .await;
        report_submit(&self.telemetry, "monitor.created", &outcome, |created| {
            json!({ "id": created.id })
        })
        .await;
        if outcome.is_ok() {
            self.refresh().await;
        }
        outcome
    }

    /// Opens the edit form prefilled from a monitor.
    pub fn begin_edit(&mut self, monitor: &ComplianceMonitor) {
        self.editing = Some(monitor.id);
        self.edit.open_with(MonitorUpdate::from_monitor(monitor));
    }

    /// Edit form.
    pub fn edit_form(&mut self) -> &mut FormModal<MonitorUpdate> {
        &mut self.edit
    }

    /// Submits the edit form.
    pub async fn submit_edit(&mut self) -> Result<(), ApiError> {
        let id = self
            .editing
            .ok_or_else(|| ApiError::Validation("no monitor selected for editing".into()))?;
        let client = self.client.clone();
        let outcome = self
            .edit
            .submit(|update| async move { client.update_compliance_monitor(id, &update).await })
            .await;
        report_submit(&self.telemetry, "monitor.updated", &outcome, |_| json!({ "id": id })).await;
        if outcome.is_ok() {
            self.editing = None;
            self.refresh().await;
        }
        outcome
    }

    /// Records a new measured value for a monitor and reloads.
    pub async fn recheck(&self, id: RecordId, current_value: f64) -> Result<(), ApiError> {
        let monitor = self.client.get_compliance_monitor(id).await?;
        let mut update = MonitorUpdate::from_monitor(&monitor);
        update.current_value = current_value;
        let outcome = self.client.update_compliance_monitor(id, &update).await;
        report_submit(&self.telemetry, "monitor.rechecked", &outcome, |_| {
            json!({ "id": id, "current_value": current_value })
        })
        .await;
        if outcome.is_ok() {
            self.refresh().await;
        }
        outcome
    }
}

async fn fetch_data(client: &ApiClient, telemetry: &DashboardTelemetry) -> Fetched<ComplianceData> {
    let (monitors, assessments) =
        tokio::join!(client.list_compliance_monitors(), client.list_risk_assessments());
    if let Some(err) = &assessments.error {
        telemetry
            .record(
                LogLevel::Warn,
                "compliance.models.degraded",
                json!({ "error": err.message() }),
            )
            .await;
    }
    let models = distinct_models(&monitors.value, &assessments.value);
    Fetched {
        value: ComplianceData {
            monitors: monitors.value,
            models,
        },
        error: monitors.error,
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::{json, Value};

    use super::*;
    use crate::{
        aggregator::OverallStatus,
        config::PollingSettings,
        transport::{HttpMethod, ScriptedTransport},
        views::ModalPhase,
    };

    const MONITORS: &str = "/api/compliance-monitors";

    fn context(transport: &ScriptedTransport) -> ViewContext {
        ViewContext::new(
            ApiClient::new(Arc::new(transport.clone())),
            DashboardTelemetry::disabled("test"),
        )
    }

    fn monitor(id: i64, model: &str, level: &str) -> Value {
        json!({
            "id": id, "name": format!("monitor-{id}"), "model_or_system": model,
            "threshold_value": 0.8, "current_value": 0.75,
            "alert_level": level, "status": "Active"
        })
    }

    #[tokio::test]
    async fn stats_and_filter_follow_visible_monitors() {
        let transport = ScriptedTransport::new();
        transport.respond(
            HttpMethod::Get,
            MONITORS,
            200,
            &json!([
                monitor(1, "scorer", "Critical"),
                monitor(2, "scorer", "Warning"),
                monitor(3, "ranker", "Normal"),
                monitor(4, "ranker", "Normal"),
            ]),
        );
        let mut view = ComplianceView::new(&context(&transport));
        assert_eq!(view.mount().await, ViewPhase::Loaded);

        let stats = view.stats();
        assert_eq!(stats.overall_status, OverallStatus::Critical);
        assert_eq!(stats.compliance_rate, 50);
        assert_eq!(view.chart().percentages, vec![25, 25, 50, 0]);
        assert_eq!(view.state().data().unwrap().models, vec!["ranker", "scorer"]);

        view.set_model_filter(Some("ranker".into()));
        assert_eq!(view.visible_monitors().len(), 2);
        assert_eq!(view.stats().overall_status, OverallStatus::Normal);
        assert_eq!(view.stats().compliance_rate, 100);

        view.set_model_filter(Some("  ".into()));
        assert_eq!(view.model_filter(), None);
        assert_eq!(view.by_model().len(), 2);
    }

    #[tokio::test]
    async fn server_error_shows_empty_table_and_banner() {
        let transport = ScriptedTransport::new();
        transport.respond(HttpMethod::Get, MONITORS, 500, &json!({ "detail": "database offline" }));
        let view = ComplianceView::new(&context(&transport));
        assert_eq!(view.refresh().await, ViewPhase::Errored);
        let state = view.state();
        assert!(state.data().unwrap().monitors.is_empty());
        assert!(state.error().unwrap().contains("database offline"));
        assert_eq!(view.stats().overall_status, OverallStatus::Unknown);
    }

    #[tokio::test]
    async fn out_of_range_threshold_never_reaches_the_network() {
        let transport = ScriptedTransport::new();
        let mut view = ComplianceView::new(&context(&transport));
        view.create_form().open();
        let form = view.create_form().form_mut();
        form.name = "Accuracy".into();
        form.description = "Share of correct predictions".into();
        form.model_or_system = "scorer".into();
        form.threshold_value = 1.5;

        let err = view.submit_create().await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(view.create_form().phase(), ModalPhase::Open);
        assert_eq!(transport.request_count(HttpMethod::Post, MONITORS), 0);
    }

    #[tokio::test]
    async fn successful_create_closes_form_and_reloads() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Get, MONITORS, 200, &json!([]))
            .respond(HttpMethod::Get, MONITORS, 200, &json!([monitor(9, "scorer", "Normal")]))
            .respond(
                HttpMethod::Post,
                MONITORS,
                201,
                &json!({ "success": true, "monitor_id": 9 }),
            );
        let mut view = ComplianceView::new(&context(&transport).with_polling(PollingSettings {
            dashboard_secs: 0,
            compliance_secs: 0,
        }));
        view.mount().await;
        assert!(!view.is_polling());

        view.create_form().open();
        let form = view.create_form().form_mut();
        form.name = "Accuracy".into();
        form.description = "Share of correct predictions".into();
        form.model_or_system = "scorer".into();
        let created = view.submit_create().await.unwrap();

        assert_eq!(created.id, 9);
        assert_eq!(view.create_form().phase(), ModalPhase::Closed);
        assert_eq!(view.visible_monitors().len(), 1);
        assert_eq!(transport.request_count(HttpMethod::Get, MONITORS), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_stops_on_unmount() {
        let transport = ScriptedTransport::new();
        transport.respond(HttpMethod::Get, MONITORS, 200, &json!([]));
        let mut view = ComplianceView::new(&context(&transport).with_polling(PollingSettings {
            dashboard_secs: 0,
            compliance_secs: 30,
        }));
        view.mount().await;
        assert!(view.is_polling());
        assert_eq!(transport.request_count(HttpMethod::Get, MONITORS), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(transport.request_count(HttpMethod::Get, MONITORS), 3);

        view.unmount();
        assert!(!view.is_polling());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.request_count(HttpMethod::Get, MONITORS), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slower_response_arriving_last_wins() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Get, MONITORS, 200, &json!([monitor(1, "slow", "Normal")]))
            .respond(HttpMethod::Get, MONITORS, 200, &json!([monitor(2, "fast", "Normal")]))
            .delay(HttpMethod::Get, MONITORS, Duration::from_millis(200))
            .delay(HttpMethod::Get, MONITORS, Duration::from_millis(10));
        let view = ComplianceView::new(&context(&transport));

        let (first, second) = tokio::join!(view.refresh(), view.refresh());
        assert_eq!((first, second), (ViewPhase::Loaded, ViewPhase::Loaded));
        let visible = view.visible_monitors();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].model_or_system, "slow");
        assert_eq!(view.state().loads(), 2);
    }
}
