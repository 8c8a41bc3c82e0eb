use std::sync::Arc;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use shared_logging::LogLevel;

use crate::{
    config::{DashboardConfig, NotificationRoute, NotificationSettings},
    envelope::{server_error_of, ApiResponse},
    error::ApiError,
    model::{
        format_phone_number, Activity, ChartData, ComplianceMonitor, Created, DashboardMetrics,
        MonitorForm, MonitorUpdate, NotificationProvider, NotificationRequest, Policy, PolicyForm,
        RecordId, Report, ReportForm, RiskAssessment, RiskAssessmentForm,
    },
    telemetry::DashboardTelemetry,
    transport::{HttpRequest, HttpTransport, ReqwestTransport},
};

/// Result of a fetch that degrades instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    /// Payload, or the fallback when the fetch failed.
    pub value: T,
    /// Failure that produced the fallback.
    pub error: Option<ApiError>,
}

impl<T> Fetched<T> {
    /// Whether the value is a fallback.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// Banner text for a degraded fetch.
    #[must_use]
    pub fn banner(&self) -> Option<String> {
        self.error.as_ref().map(ApiError::message)
    }

    /// Splits into a `Result`, discarding the fallback on failure.
    pub fn into_result(self) -> Result<T, ApiError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }
}

/// Typed client with one function per backend operation.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    telemetry: DashboardTelemetry,
    notifications: NotificationSettings,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("telemetry", &self.telemetry)
            .field("notifications", &self.notifications)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client over any transport, with telemetry disabled.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            telemetry: DashboardTelemetry::disabled("api"),
            notifications: NotificationSettings::default(),
        }
    }

    /// HTTP client built from configuration.
    pub fn from_config(config: &DashboardConfig, telemetry: DashboardTelemetry) -> Result<Self> {
        let transport = ReqwestTransport::new(
            config.api.base_url.clone(),
            config.api.timeout(),
            &config.api.user_agent,
            config.api.bearer.clone(),
        )?;
        Ok(Self::new(Arc::new(transport))
            .with_telemetry(telemetry)
            .with_notifications(config.notifications.clone()))
    }

    /// Routes client logs through `telemetry`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: DashboardTelemetry) -> Self {
        self.telemetry = telemetry.scoped(format!("{}.api", telemetry.module()));
        self
    }

    /// Selects the notification endpoint and phone defaults.
    #[must_use]
    pub fn with_notifications(mut self, settings: NotificationSettings) -> Self {
        self.notifications = settings;
        self
    }

    /// Notification defaults in effect.
    #[must_use]
    pub const fn notification_settings(&self) -> &NotificationSettings {
        &self.notifications
    }

    async fn call(&self, request: HttpRequest) -> Result<Value, ApiError> {
        let method = request.method.label();
        let path = request.path.clone();
        let outcome = self.exchange(request).await;
        if let Err(err) = &outcome {
            self.log(
                LogLevel::Warn,
                "api.request.failed",
                json!({
                    "method": method,
                    "path": path,
                    "kind": err.kind(),
                    "status": err.status(),
                    "error": err.message(),
                }),
            );
        }
        outcome
    }

    async fn exchange(&self, request: HttpRequest) -> Result<Value, ApiError> {
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(ApiError::Http {
                status: response.status,
                server_error: server_error_of(&response.body),
                body: response.body,
            });
        }
        ApiResponse::parse(&response.body)?.into_result()
    }

    async fn fetch<T: DeserializeOwned>(&self, path: String) -> Result<T, ApiError> {
        let value = self.call(HttpRequest::get(path)).await?;
        serde_json::from_value(value).map_err(|err| ApiError::Parse(err.to_string()))
    }

    async fn fetch_or<T: DeserializeOwned>(&self, path: &str, fallback: T) -> Fetched<T> {
        match self.fetch(path.to_string()).await {
            Ok(value) => Fetched { value, error: None },
            Err(err) => Fetched {
                value: fallback,
                error: Some(err),
            },
        }
    }

    async fn list<T: DeserializeOwned>(&self, path: &str) -> Fetched<Vec<T>> {
        self.fetch_or(path, Vec::new()).await
    }

    async fn create<B: Serialize>(
        &self,
        path: &str,
        id_key: &str,
        body: &B,
    ) -> Result<Created, ApiError> {
        let body = encode(body)?;
        let value = self.call(HttpRequest::post(path, body)).await?;
        let created = Created::from_response(&value, id_key)?;
        self.log(
            LogLevel::Info,
            "api.record.created",
            json!({ "path": path, "id": created.id }),
        );
        Ok(created)
    }

    async fn update<B: Serialize>(&self, path: String, body: &B) -> Result<(), ApiError> {
        let body = encode(body)?;
        self.call(HttpRequest::put(path.clone(), body)).await?;
        self.log(LogLevel::Info, "api.record.updated", json!({ "path": path }));
        Ok(())
    }

    fn log(&self, level: LogLevel, message: &str, metadata: Value) {
        if let Err(err) = self.telemetry.log(level, message, metadata) {
            tracing::warn!(error = %err, "api telemetry write failed");
        }
    }

    /// Headline metrics; zeroed on failure.
    pub async fn dashboard_metrics(&self) -> Fetched<DashboardMetrics> {
        self.fetch_or("/api/dashboard/metrics", DashboardMetrics::default())
            .await
    }

    /// Compliance status chart; empty on failure.
    pub async fn compliance_status_chart(&self) -> Fetched<ChartData> {
        self.fetch_or("/api/dashboard/compliance-status-chart", ChartData::default())
            .await
    }

    /// Risk distribution chart; empty on failure.
    pub async fn risk_distribution_chart(&self) -> Fetched<ChartData> {
        self.fetch_or("/api/dashboard/risk-distribution-chart", ChartData::default())
            .await
    }

    /// Recent activity feed; empty on failure.
    pub async fn recent_activities(&self) -> Fetched<Vec<Activity>> {
        self.list("/api/dashboard/activities").await
    }

    /// All policies; empty on failure.
    pub async fn list_policies(&self) -> Fetched<Vec<Policy>> {
        self.list("/api/policies").await
    }

    /// One policy.
    pub async fn get_policy(&self, id: RecordId) -> Result<Policy, ApiError> {
        self.fetch(format!("/api/policies/{id}")).await
    }

    /// Creates a policy after validating the form.
    pub async fn create_policy(&self, form: &PolicyForm) -> Result<Created, ApiError> {
        form.validate()?;
        self.create("/api/policies", "policy_id", form).await
    }

    /// Replaces a policy after validating the form.
    pub async fn update_policy(&self, id: RecordId, form: &PolicyForm) -> Result<(), ApiError> {
        form.validate()?;
        self.update(format!("/api/policies/{id}"), form).await
    }

    /// All risk assessments; empty on failure.
    pub async fn list_risk_assessments(&self) -> Fetched<Vec<RiskAssessment>> {
        self.list("/api/risk-assessments").await
    }

    /// One risk assessment.
    pub async fn get_risk_assessment(&self, id: RecordId) -> Result<RiskAssessment, ApiError> {
        self.fetch(format!("/api/risk-assessments/{id}")).await
    }

    /// Requests a risk assessment after validating the form.
    pub async fn create_risk_assessment(
        &self,
        form: &RiskAssessmentForm,
    ) -> Result<Created, ApiError> {
        form.validate()?;
        self.create("/api/risk-assessments", "assessment_id", form)
            .await
    }

    /// All compliance monitors; empty on failure.
    pub async fn list_compliance_monitors(&self) -> Fetched<Vec<ComplianceMonitor>> {
        self.list("/api/compliance-monitors").await
    }

    /// One compliance monitor.
    pub async fn get_compliance_monitor(
        &self,
        id: RecordId,
    ) -> Result<ComplianceMonitor, ApiError> {
        self.fetch(format!("/api/compliance-monitors/{id}")).await
    }

    /// Creates a monitor. Thresholds outside `[0, 1]` never reach the network.
    pub async fn create_compliance_monitor(&self, form: &MonitorForm) -> Result<Created, ApiError> {
        form.validate()?;
        self.create("/api/compliance-monitors", "monitor_id", form)
            .await
    }

    /// Replaces a monitor after validating both fractions.
    pub async fn update_compliance_monitor(
        &self,
        id: RecordId,
        update: &MonitorUpdate,
    ) -> Result<(), ApiError> {
        update.validate()?;
        self.update(format!("/api/compliance-monitors/{id}"), update)
            .await
    }

    /// All reports; empty on failure.
    pub async fn list_reports(&self) -> Fetched<Vec<Report>> {
        self.list("/api/reports").await
    }

    /// One report.
    pub async fn get_report(&self, id: RecordId) -> Result<Report, ApiError> {
        self.fetch(format!("/api/reports/{id}")).await
    }

    /// Generates a report of a known type.
    pub async fn create_report(&self, form: &ReportForm) -> Result<Created, ApiError> {
        form.validate()?;
        self.create("/api/reports", "report_id", form).await
    }

    /// Dispatches a notification through the configured route.
    pub async fn send_notification(&self, request: &NotificationRequest) -> Result<Value, ApiError> {
        request.validate()?;
        let recipient = match request.provider {
            NotificationProvider::Sms => {
                format_phone_number(&request.recipient, &self.notifications.country_code)
            }
            NotificationProvider::Console => request.recipient.trim().to_string(),
        };
        let http = match self.notifications.route {
            NotificationRoute::Send => HttpRequest::post(
                "/api/notifications/send",
                json!({
                    "provider": request.provider.label(),
                    "recipient": recipient,
                    "message": request.message,
                    "metadata": notification_metadata(request),
                }),
            ),
            NotificationRoute::Sms => HttpRequest::post(
                "/api/send-sms-notification",
                json!({
                    "phone_number": recipient,
                    "message": request.message,
                    "entity_type": request.entity.as_ref().map(|e| e.entity_type.clone()),
                    "entity_id": request.entity.as_ref().map(|e| e.entity_id),
                    "notification_type": request.kind.label(),
                }),
            ),
        };
        let receipt = self.call(http).await?;
        self.log(
            LogLevel::Info,
            "api.notification.sent",
            json!({ "provider": request.provider.label(), "kind": request.kind.label() }),
        );
        Ok(receipt)
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|err| ApiError::Parse(format!("encoding request: {err}")))
}

fn notification_metadata(request: &NotificationRequest) -> Value {
    let mut metadata: Map<String, Value> = request.metadata.clone();
    metadata.insert("notification_type".into(), request.kind.label().into());
    if let Some(entity) = &request.entity {
        metadata.insert("entity_type".into(), entity.entity_type.clone().into());
        metadata.insert("entity_id".into(), entity.entity_id.into());
    }
    if let Some(urgency) = request.urgency {
        metadata.insert("urgency".into(), json!(urgency));
    }
    Value::Object(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{EntityRef, PolicyCategory, Urgency},
        transport::{HttpMethod, ScriptedTransport},
    };

    fn client(transport: &ScriptedTransport) -> ApiClient {
        ApiClient::new(Arc::new(transport.clone()))
    }

    fn policy_json(id: i64) -> Value {
        json!({
            "id": id,
            "title": "Model Card Requirement",
            "category": "Model Transparency",
            "description": "Every model ships a model card",
            "content": "...",
            "status": "Active",
            "created_at": "2024-02-01T09:00:00",
            "updated_at": "2024-02-02T09:00:00"
        })
    }

    #[tokio::test]
    async fn lists_accept_both_envelopes() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Get, "/api/policies", 200, &json!([policy_json(1)]))
            .respond(
                HttpMethod::Get,
                "/api/policies",
                200,
                &json!({ "success": true, "data": [policy_json(1), policy_json(2)] }),
            );
        let api = client(&transport);
        assert_eq!(api.list_policies().await.value.len(), 1);
        assert_eq!(api.list_policies().await.value.len(), 2);
    }

    #[tokio::test]
    async fn list_failure_degrades_to_empty() {
        let transport = ScriptedTransport::new();
        transport.respond(
            HttpMethod::Get,
            "/api/reports",
            500,
            &json!({ "error": "database unavailable" }),
        );
        let fetched = client(&transport).list_reports().await;
        assert!(fetched.value.is_empty());
        assert!(fetched.is_degraded());
        assert_eq!(fetched.banner().unwrap(), "HTTP 500: database unavailable");
    }

    #[tokio::test]
    async fn metrics_zeroed_on_network_failure() {
        let transport = ScriptedTransport::new();
        transport.fail(HttpMethod::Get, "/api/dashboard/metrics", "connection refused");
        let fetched = client(&transport).dashboard_metrics().await;
        assert_eq!(fetched.value, DashboardMetrics::default());
        assert_eq!(fetched.error.unwrap().kind(), "network");
    }

    #[tokio::test]
    async fn get_propagates_errors() {
        let transport = ScriptedTransport::new();
        transport.respond(
            HttpMethod::Get,
            "/api/risk-assessments/9",
            404,
            &json!({ "detail": "Risk assessment not found" }),
        );
        let err = client(&transport).get_risk_assessment(9).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.server_error(), Some("Risk assessment not found"));
    }

    #[tokio::test]
    async fn create_returns_new_id_with_one_call() {
        let transport = ScriptedTransport::new();
        transport.respond(
            HttpMethod::Post,
            "/api/policies",
            200,
            &json!({ "success": true, "policy_id": 17 }),
        );
        let form = PolicyForm {
            title: "Retention".into(),
            description: "Data retention limits".into(),
            category: Some(PolicyCategory::DataPrivacy),
            ..PolicyForm::default()
        };
        let created = client(&transport).create_policy(&form).await.unwrap();
        assert_eq!(created.id, 17);
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body.as_ref().unwrap()["status"], "Draft");
    }

    #[tokio::test]
    async fn invalid_monitor_never_reaches_network() {
        let transport = ScriptedTransport::new();
        let form = MonitorForm {
            name: "Fairness".into(),
            description: "Parity".into(),
            model_or_system: "scorer".into(),
            threshold_value: 1.5,
        };
        let err = client(&transport)
            .create_compliance_monitor(&form)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn update_rejected_by_envelope() {
        let transport = ScriptedTransport::new();
        transport.respond(
            HttpMethod::Put,
            "/api/compliance-monitors/3",
            200,
            &json!({ "success": false, "error": "Monitor is locked" }),
        );
        let update = MonitorUpdate {
            name: "Fairness".into(),
            description: String::new(),
            model_or_system: "scorer".into(),
            threshold_value: 0.8,
            current_value: 0.9,
            status: crate::model::MonitorStatus::Active,
            alert_level: crate::model::AlertLevel::Normal,
        };
        let err = client(&transport)
            .update_compliance_monitor(3, &update)
            .await
            .unwrap_err();
        assert_eq!(err.server_error(), Some("Monitor is locked"));
    }

    #[tokio::test]
    async fn notifications_follow_configured_route() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Post, "/api/notifications/send", 200, &json!({ "success": true, "data": { "id": "n-1" } }))
            .respond(HttpMethod::Post, "/api/send-sms-notification", 200, &json!({ "success": true }));
        let mut request =
            NotificationRequest::new(NotificationProvider::Sms, "555-123-4567", "Monitor breached");
        request.entity = Some(EntityRef {
            entity_type: "compliance_monitor".into(),
            entity_id: 3,
        });
        request.urgency = Some(Urgency::High);

        let api = client(&transport);
        let receipt = api.send_notification(&request).await.unwrap();
        assert_eq!(receipt["id"], "n-1");
        let sent = transport.requests()[0].body.clone().unwrap();
        assert_eq!(sent["recipient"], "+15551234567");
        assert_eq!(sent["metadata"]["entity_id"], 3);
        assert_eq!(sent["metadata"]["urgency"], "high");

        let sms = api.with_notifications(NotificationSettings {
            route: NotificationRoute::Sms,
            ..NotificationSettings::default()
        });
        sms.send_notification(&request).await.unwrap();
        let sent = transport.requests()[1].body.clone().unwrap();
        assert_eq!(sent["phone_number"], "+15551234567");
        assert_eq!(sent["notification_type"], "custom");
    }
}
