use serde_json::json;

use super::{
    refresh_state, report_submit, shared_state, FormModal, SharedState, ViewContext, ViewPhase,
    ViewState,
};
use crate::{
    aggregator::{average_risk_score, ChartSummary},
    classifier::{classify_risk, RiskBand, RiskScheme},
    client::ApiClient,
    error::ApiError,
    model::{Created, RecordId, RiskAssessment, RiskAssessmentForm},
    telemetry::DashboardTelemetry,
};

/// Risk assessments page.
#[derive(Debug)]
pub struct RiskView {
    client: ApiClient,
    telemetry: DashboardTelemetry,
    scheme: RiskScheme,
    state: SharedState<Vec<RiskAssessment>>,
    create: FormModal<RiskAssessmentForm>,
}

impl RiskView {
    /// Creates an idle view.
    #[must_use]
    pub fn new(ctx: &ViewContext) -> Self {
        Self {
            client: ctx.client.clone(),
            telemetry: ctx.view_telemetry("risk"),
            scheme: ctx.risk_scheme.clone(),
            state: shared_state(),
            create: FormModal::new(),
        }
    }

    /// Loads the assessment list.
    pub async fn mount(&mut self) -> ViewPhase {
        self.refresh().await
    }

    /// Reloads the assessment list.
    pub async fn refresh(&self) -> ViewPhase {
        refresh_state(
            &self.state,
            &self.telemetry,
            self.client.list_risk_assessments(),
        )
        .await
    }

    /// Snapshot of the view state.
    #[must_use]
    pub fn state(&self) -> ViewState<Vec<RiskAssessment>> {
        self.state.lock().clone()
    }

    /// Rows with their High/Medium/Low band.
    #[must_use]
    pub fn rows(&self) -> Vec<(RiskAssessment, RiskBand)> {
        self.state
            .lock()
            .data()
            .map(|assessments| {
                assessments
                    .iter()
                    .map(|a| (a.clone(), classify_risk(a.risk_score)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distribution under the configured banding preset.
    #[must_use]
    pub fn distribution(&self) -> ChartSummary {
        let state = self.state.lock();
        ChartSummary::risk(state.data().map_or(&[][..], Vec::as_slice), &self.scheme)
    }

    /// Mean score of the loaded assessments.
    #[must_use]
    pub fn average_score(&self) -> f64 {
        let state = self.state.lock();
        average_risk_score(state.data().map_or(&[][..], Vec::as_slice))
    }

    /// Loads one assessment for the detail modal.
    pub async fn show(&self, id: RecordId) -> Result<RiskAssessment, ApiError> {
        self.client.get_risk_assessment(id).await
    }

    /// Request form.
    pub fn create_form(&mut self) -> &mut FormModal<RiskAssessmentForm> {
        &mut self.create
    }

    /// Submits the request form; success closes it and reloads the list.
    pub async fn submit_create(&mut self) -> Result<Created, ApiError> {
        let client = self.client.clone();
        let outcome = self
            .create
            .submit(|form| async move { client.create_risk_assessment(&form).await })
            .await;
        report_submit(&self.telemetry, "risk_assessment.created", &outcome, |created| {
            json!({ "id": created.id })
        })
        .await;
        if outcome.is_ok() {
            self.refresh().await;
        }
        outcome
    }
}
