use indexmap::IndexMap;
use serde_json::json;

use super::{
    refresh_state, report_submit, shared_state, FormModal, SharedState, ViewContext, ViewPhase,
    ViewState,
};
use crate::{
    aggregator::{count_by_report_type, ChartSummary},
    client::ApiClient,
    error::ApiError,
    model::{Created, RecordId, Report, ReportForm, ReportType},
    telemetry::DashboardTelemetry,
};

/// Reports page.
#[derive(Debug)]
pub struct ReportsView {
    client: ApiClient,
    telemetry: DashboardTelemetry,
    state: SharedState<Vec<Report>>,
    create: FormModal<ReportForm>,
}

impl ReportsView {
    /// Creates an idle view.
    #[must_use]
    pub fn new(ctx: &ViewContext) -> Self {
        Self {
            client: ctx.client.clone(),
            telemetry: ctx.view_telemetry("reports"),
            state: shared_state(),
            create: FormModal::new(),
        }
    }

    /// Loads the report list.
    pub async fn mount(&mut self) -> ViewPhase {
        self.refresh().await
    }

    /// Reloads the report list.
    pub async fn refresh(&self) -> ViewPhase {
        refresh_state(&self.state, &self.telemetry, self.client.list_reports()).await
    }

    /// Snapshot of the view state.
    #[must_use]
    pub fn state(&self) -> ViewState<Vec<Report>> {
        self.state.lock().clone()
    }

    /// Report count per type for the summary cards.
    #[must_use]
    pub fn counts(&self) -> IndexMap<ReportType, usize> {
        let state = self.state.lock();
        count_by_report_type(state.data().map_or(&[][..], Vec::as_slice))
    }

    /// Report counts as a chart keyed by type title.
    #[must_use]
    pub fn chart(&self) -> ChartSummary {
        ChartSummary::from_counts(
            self.counts()
                .into_iter()
                .map(|(report_type, count)| (report_type.title(), count)),
        )
    }

    /// Loads one report for the detail modal.
    pub async fn show(&self, id: RecordId) -> Result<Report, ApiError> {
        self.client.get_report(id).await
    }

    /// Generation form.
    pub fn create_form(&mut self) -> &mut FormModal<ReportForm> {
        &mut self.create
    }

    /// Submits the generation form; success closes it and reloads the list.
    pub async fn submit_create(&mut self) -> Result<Created, ApiError> {
        let report_type = self.create.form().report_type.label().to_string();
        let client = self.client.clone();
        let outcome = self
            .create
            .submit(|form| async move { client.create_report(&form).await })
            .await;
        report_submit(&self.telemetry, "report.created", &outcome, |created| {
            json!({ "id": created.id, "report_type": report_type })
        })
        .await;
        if outcome.is_ok() {
            self.refresh().await;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::transport::{HttpMethod, ScriptedTransport};

    fn context(transport: &ScriptedTransport) -> ViewContext {
        ViewContext::new(
            ApiClient::new(Arc::new(transport.clone())),
            DashboardTelemetry::disabled("test"),
        )
    }

    #[tokio::test]
    async fn counts_normalize_legacy_types() {
        let transport = ScriptedTransport::new();
        transport.respond(
            HttpMethod::Get,
            "/api/reports",
            200,
            &json!([
                { "id": 1, "title": "Q1", "report_type": "governance_summary", "status": "completed" },
                { "id": 2, "title": "Q2", "report_type": "Comprehensive Governance Report", "status": "completed" },
                { "id": 3, "title": "Q3", "report_type": "model_card", "status": "pending" },
            ]),
        );
        let mut view = ReportsView::new(&context(&transport));
        view.mount().await;

        let counts = view.counts();
        assert_eq!(counts[&ReportType::GovernanceSummary], 1);
        assert_eq!(counts[&ReportType::ComprehensiveReport], 1);
        assert_eq!(counts[&ReportType::Unknown("model_card".into())], 1);

        let chart = view.chart();
        assert_eq!(chart.labels[0], "Governance Summary");
        assert_eq!(chart.labels.last().map(String::as_str), Some("Model card"));
        assert_eq!(chart.total(), 3);
    }

    #[tokio::test]
    async fn generation_closes_form_and_reloads() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Get, "/api/reports", 200, &json!([]))
            .respond(
                HttpMethod::Get,
                "/api/reports",
                200,
                &json!([{ "id": 4, "title": "Risk overview", "report_type": "risk_assessment_overview", "status": "completed" }]),
            )
            .respond(HttpMethod::Post, "/api/reports", 200, &json!({ "report_id": 4 }));
        let mut view = ReportsView::new(&context(&transport));
        view.mount().await;

        view.create_form().open();
        view.create_form().form_mut().report_type = ReportType::RiskAssessmentOverview;
        assert_eq!(view.submit_create().await.unwrap().id, 4);
        assert_eq!(view.create_form().phase(), crate::views::ModalPhase::Closed);
        assert_eq!(view.create_form().form().report_type, ReportType::GovernanceSummary);
        assert_eq!(view.counts()[&ReportType::RiskAssessmentOverview], 1);

        let sent = transport.requests();
        let post = sent.iter().find(|r| r.method == HttpMethod::Post).unwrap();
        assert_eq!(post.body.as_ref().unwrap()["report_type"], "risk_assessment_overview");
    }
}
