use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use super::{report_submit, FormModal, ViewContext};
use crate::{
    client::ApiClient,
    error::ApiError,
    model::{
        ComplianceMonitor, NotificationKind, NotificationProvider, NotificationRequest, Policy,
        RiskAssessment,
    },
    telemetry::DashboardTelemetry,
};

/// Notification dispatched during this session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentNotification {
    /// Channel used.
    pub provider: NotificationProvider,
    /// Recipient as entered.
    pub recipient: String,
    /// Template family.
    pub kind: NotificationKind,
    /// Dispatch time.
    pub sent_at: DateTime<Utc>,
    /// Server receipt.
    pub receipt: Value,
}

/// Notification composer.
#[derive(Debug)]
pub struct NotificationsView {
    client: ApiClient,
    telemetry: DashboardTelemetry,
    compose: FormModal<NotificationRequest>,
    sent: Vec<SentNotification>,
}

impl NotificationsView {
    /// Creates a view with the configured default provider preselected.
    #[must_use]
    pub fn new(ctx: &ViewContext) -> Self {
        let mut compose: FormModal<NotificationRequest> = FormModal::new();
        compose.form_mut().provider = ctx.client.notification_settings().default_provider;
        Self {
            client: ctx.client.clone(),
            telemetry: ctx.view_telemetry("notifications"),
            compose,
            sent: Vec::new(),
        }
    }

    /// Composer form.
    pub fn compose(&mut self) -> &mut FormModal<NotificationRequest> {
        &mut self.compose
    }

    /// Opens the composer with a compliance alert for `monitor`.
    pub fn alert_for_monitor(&mut self, recipient: &str, monitor: &ComplianceMonitor) {
        let provider = self.compose.form().provider;
        self.compose
            .open_with(NotificationRequest::monitor_alert(provider, recipient, monitor));
    }

    /// Opens the composer with a risk assessment notice.
    pub fn alert_for_assessment(&mut self, recipient: &str, assessment: &RiskAssessment) {
        let provider = self.compose.form().provider;
        self.compose.open_with(NotificationRequest::assessment_alert(
            provider, recipient, assessment,
        ));
    }

    /// Opens the composer with a policy update announcement.
    pub fn announce_policy(&mut self, recipient: &str, policy: &Policy) {
        let provider = self.compose.form().provider;
        self.compose
            .open_with(NotificationRequest::policy_update(provider, recipient, policy));
    }

    /// Sends the composed notification. The recipient and provider survive a successful send.
    pub async fn send(&mut self) -> Result<Value, ApiError> {
        let provider = self.compose.form().provider;
        let recipient = self.compose.form().recipient.clone();
        let kind = self.compose.form().kind;
        let client = self.client.clone();
        let outcome = self
            .compose
            .submit(|request| async move { client.send_notification(&request).await })
            .await;
        report_submit(&self.telemetry, "notification.sent", &outcome, |_| {
            json!({ "provider": provider.label(), "kind": kind.label() })
        })
        .await;
        if let Ok(receipt) = &outcome {
            self.sent.push(SentNotification {
                provider,
                recipient: recipient.clone(),
                kind,
                sent_at: Utc::now(),
                receipt: receipt.clone(),
            });
            let form = self.compose.form_mut();
            form.provider = provider;
            form.recipient = recipient;
        }
        outcome
    }

    /// Notifications sent since the view was created, oldest first.
    #[must_use]
    pub fn sent(&self) -> &[SentNotification] {
        &self.sent
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        transport::{HttpMethod, ScriptedTransport},
        views::ModalPhase,
    };

    #[tokio::test]
    async fn successful_send_keeps_recipient() {
        let transport = ScriptedTransport::new();
        transport.respond(
            HttpMethod::Post,
            "/api/notifications/send",
            200,
            &json!({ "success": true, "data": { "sid": "SM1" } }),
        );
        let ctx = ViewContext::new(
            ApiClient::new(Arc::new(transport.clone())),
            DashboardTelemetry::disabled("test"),
        );
        let mut view = NotificationsView::new(&ctx);
        view.compose().open();
        view.compose().form_mut().recipient = "5551234567".into();
        view.compose().form_mut().message = "Quarterly review tomorrow".into();
        let receipt = view.send().await.unwrap();
        assert_eq!(receipt["sid"], "SM1");
        assert_eq!(view.compose().phase(), ModalPhase::Closed);
        assert_eq!(view.compose().form().recipient, "5551234567");
        assert!(view.compose().form().message.is_empty());
        assert_eq!(view.sent().len(), 1);
    }

    #[tokio::test]
    async fn empty_message_is_blocked() {
        let transport = ScriptedTransport::new();
        let ctx = ViewContext::new(
            ApiClient::new(Arc::new(transport.clone())),
            DashboardTelemetry::disabled("test"),
        );
        let mut view = NotificationsView::new(&ctx);
        view.compose().open();
        view.compose().form_mut().recipient = "+15551234567".into();
        assert!(view.send().await.unwrap_err().is_validation());
        assert_eq!(view.compose().phase(), ModalPhase::Open);
        assert!(transport.requests().is_empty());
    }
}
