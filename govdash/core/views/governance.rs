use indexmap::IndexMap;
use serde_json::json;

use super::{
    refresh_state, report_submit, shared_state, FormModal, SharedState, ViewContext, ViewPhase,
    ViewState,
};
use crate::{
    aggregator::group_by,
    client::ApiClient,
    error::ApiError,
    model::{Created, Policy, PolicyForm, RecordId},
    telemetry::DashboardTelemetry,
};

/// Governance policies page.
#[derive(Debug)]
pub struct GovernanceView {
    client: ApiClient,
    telemetry: DashboardTelemetry,
    state: SharedState<Vec<Policy>>,
    create: FormModal<PolicyForm>,
    edit: FormModal<PolicyForm>,
    editing: Option<RecordId>,
}

impl GovernanceView {
    /// Creates an idle view.
    #[must_use]
    pub fn new(ctx: &ViewContext) -> Self {
        Self {
            client: ctx.client.clone(),
            telemetry: ctx.view_telemetry("governance"),
            state: shared_state(),
            create: FormModal::new(),
            edit: FormModal::new(),
            editing: None,
        }
    }

    /// Loads the policy list.
    pub async fn mount(&mut self) -> ViewPhase {
        self.refresh().await
    }

    /// Reloads the policy list, keeping the current rows until it answers.
    pub async fn refresh(&self) -> ViewPhase {
        refresh_state(&self.state, &self.telemetry, self.client.list_policies()).await
    }

    /// Snapshot of the view state.
    #[must_use]
    pub fn state(&self) -> ViewState<Vec<Policy>> {
        self.state.lock().clone()
    }

    /// Policies grouped by category label, in first-seen order.
    #[must_use]
    pub fn by_category(&self) -> IndexMap<String, Vec<Policy>> {
        let state = self.state.lock();
        let policies = state.data().map_or(&[][..], Vec::as_slice);
        group_by(policies, |policy| policy.category.label().to_string())
            .into_iter()
            .map(|(label, group)| (label, group.into_iter().cloned().collect()))
            .collect()
    }

    /// Loads one policy for the detail modal.
    pub async fn show(&self, id: RecordId) -> Result<Policy, ApiError> {
        self.client.get_policy(id).await
    }

    /// Create form.
    pub fn create_form(&mut self) -> &mut FormModal<PolicyForm> {
        &mut self.create
    }

    /// Submits the create form; success closes it and reloads the list.
    pub async fn submit_create(&mut self) -> Result<Created, ApiError> {
        let client = self.client.clone();
        let outcome = self
            .create
            .submit(|form| async move { client.create_policy(&form).await })
            .await;
        report_submit(&self.telemetry, "policy.created", &outcome, |created| {
            json!({ "id": created.id })
        })
        .await;
        if outcome.is_ok() {
            self.refresh().await;
        }
        outcome
    }

    /// Opens the edit form prefilled from an existing policy.
    pub fn begin_edit(&mut self, policy: &Policy) {
        self.editing = Some(policy.id);
        self.edit.open_with(PolicyForm::from_policy(policy));
    }

    /// Edit form.
    pub fn edit_form(&mut self) -> &mut FormModal<PolicyForm> {
        &mut self.edit
    }

    /// Submits the edit form.
    pub async fn submit_edit(&mut self) -> Result<(), ApiError> {
        let id = self
            .editing
            .ok_or_else(|| ApiError::Validation("no policy selected for editing".into()))?;
        let client = self.client.clone();
        let outcome = self
            .edit
            .submit(|form| async move { client.update_policy(id, &form).await })
            .await;
        report_submit(&self.telemetry, "policy.updated", &outcome, |_| json!({ "id": id })).await;
        if outcome.is_ok() {
            self.editing = None;
            self.refresh().await;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use super::*;
    use crate::{
        model::{PolicyCategory, PolicyStatus},
        transport::{HttpMethod, ScriptedTransport},
        views::ModalPhase,
    };

    fn context(transport: &ScriptedTransport) -> ViewContext {
        ViewContext::new(
            ApiClient::new(Arc::new(transport.clone())),
            DashboardTelemetry::disabled("test"),
        )
    }

    fn policy(id: i64, title: &str, category: &str) -> Value {
        json!({
            "id": id, "title": title, "category": category,
            "description": "d", "content": "c", "status": "Active"
        })
    }

    #[tokio::test]
    async fn rejected_create_keeps_fields_for_retry() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Post, "/api/policies", 400, &json!({ "error": "title already exists" }))
            .respond(HttpMethod::Post, "/api/policies", 201, &json!({ "success": true, "policy_id": 12 }))
            .respond(HttpMethod::Get, "/api/policies", 200, &json!([policy(12, "Consent", "Data Privacy")]));
        let mut view = GovernanceView::new(&context(&transport));

        view.create_form().open();
        let form = view.create_form().form_mut();
        form.title = "Consent".into();
        form.description = "Collect consent before training".into();
        form.category = Some(PolicyCategory::DataPrivacy);

        let err = view.submit_create().await.unwrap_err();
        assert_eq!(err.server_error(), Some("title already exists"));
        assert_eq!(view.create_form().phase(), ModalPhase::Open);
        assert_eq!(view.create_form().error(), Some("HTTP 400: title already exists"));
        assert_eq!(view.create_form().form().title, "Consent");

        assert_eq!(view.submit_create().await.unwrap().id, 12);
        assert_eq!(view.create_form().phase(), ModalPhase::Closed);
        assert_eq!(view.create_form().form().status, PolicyStatus::Draft);
        assert_eq!(view.state().data().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn edit_puts_full_form_and_regroups() {
        let transport = ScriptedTransport::new();
        transport
            .respond(
                HttpMethod::Get,
                "/api/policies",
                200,
                &json!([policy(1, "Consent", "Data Privacy"), policy(2, "Audit", "Security")]),
            )
            .respond(
                HttpMethod::Get,
                "/api/policies",
                200,
                &json!([policy(1, "Consent", "Data Privacy"), policy(2, "Audit", "Data Privacy")]),
            )
            .respond(HttpMethod::Put, "/api/policies/2", 200, &json!({ "success": true }));
        let mut view = GovernanceView::new(&context(&transport));
        view.mount().await;
        assert_eq!(view.by_category().len(), 2);

        let audit = view.state().data().unwrap()[1].clone();
        view.begin_edit(&audit);
        view.edit_form().form_mut().category = Some(PolicyCategory::DataPrivacy);
        view.submit_edit().await.unwrap();

        let put = transport
            .requests()
            .into_iter()
            .find(|r| r.method == HttpMethod::Put)
            .unwrap();
        assert_eq!(put.body.unwrap()["category"], "Data Privacy");
        assert_eq!(view.edit_form().phase(), ModalPhase::Closed);
        let groups = view.by_category();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["Data Privacy"].len(), 2);
    }
}
