//! Per-page view controllers and the state primitives they share.

/// Cancellable polling task.
pub mod poller;
/// Load state machine.
pub mod state;
/// Create/edit form state machine.
pub mod modal;
/// Headline metrics, charts, and activities.
pub mod dashboard;
/// Policies.
pub mod governance;
/// Risk assessments.
pub mod risk;
/// Compliance monitors.
pub mod compliance;
/// Generated reports.
pub mod reports;
/// Notification dispatch.
pub mod notifications;

use std::{future::Future, sync::Arc};

use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_logging::LogLevel;

use crate::{
    classifier::RiskScheme,
    client::{ApiClient, Fetched},
    config::{DashboardConfig, PollingSettings},
    error::ApiError,
    telemetry::DashboardTelemetry,
};

pub use compliance::{ComplianceData, ComplianceView};
pub use dashboard::{DashboardSnapshot, DashboardView};
pub use governance::GovernanceView;
pub use modal::{FormModal, ModalPhase};
pub use notifications::{NotificationsView, SentNotification};
pub use poller::PollHandle;
pub use reports::ReportsView;
pub use risk::RiskView;
pub use state::{ViewPhase, ViewState};

/// Dependencies handed to every view.
#[derive(Debug, Clone)]
pub struct ViewContext {
    /// API client.
    pub client: ApiClient,
    /// Parent telemetry; each view scopes it under its own name.
    pub telemetry: DashboardTelemetry,
    /// Banding preset for risk distribution charts.
    pub risk_scheme: RiskScheme,
    /// Poll intervals.
    pub polling: PollingSettings,
}

impl ViewContext {
    /// Context with default polling and the five-band distribution preset.
    #[must_use]
    pub fn new(client: ApiClient, telemetry: DashboardTelemetry) -> Self {
        Self {
            client,
            telemetry,
            risk_scheme: RiskScheme::FiveBand,
            polling: PollingSettings::default(),
        }
    }

    /// Context using the scheme and intervals from configuration.
    #[must_use]
    pub fn from_config(config: &DashboardConfig, client: ApiClient, telemetry: DashboardTelemetry) -> Self {
        Self {
            client,
            telemetry,
            risk_scheme: config.risk_scheme.clone(),
            polling: config.polling,
        }
    }

    /// Overrides poll intervals.
    #[must_use]
    pub const fn with_polling(mut self, polling: PollingSettings) -> Self {
        self.polling = polling;
        self
    }

    /// Overrides the risk banding preset.
    #[must_use]
    pub fn with_risk_scheme(mut self, scheme: RiskScheme) -> Self {
        self.risk_scheme = scheme;
        self
    }

    pub(crate) fn view_telemetry(&self, view: &str) -> DashboardTelemetry {
        self.telemetry
            .scoped(format!("{}.{view}", self.telemetry.module()))
    }
}

pub(crate) type SharedState<T> = Arc<Mutex<ViewState<T>>>;

pub(crate) fn shared_state<T>() -> SharedState<T> {
    Arc::new(Mutex::new(ViewState::new()))
}

/// Runs one degrading fetch through the state machine and reports the outcome.
pub(crate) async fn refresh_state<T, Fut>(
    state: &SharedState<T>,
    telemetry: &DashboardTelemetry,
    fetch: Fut,
) -> ViewPhase
where
    Fut: Future<Output = Fetched<T>>,
{
    state.lock().begin_load();
    let fetched = fetch.await;
    let banner = fetched.banner();
    let phase = {
        let mut guard = state.lock();
        guard.apply(fetched);
        guard.phase()
    };
    report_load(telemetry, banner).await;
    phase
}

pub(crate) async fn report_load(telemetry: &DashboardTelemetry, banner: Option<String>) {
    match banner {
        None => {
            telemetry
                .record(LogLevel::Debug, "view.loaded", json!({}))
                .await;
        }
        Some(error) => {
            telemetry
                .record(LogLevel::Warn, "view.errored", json!({ "error": error }))
                .await;
        }
    }
}

/// Logs a form submission; successes become events on `topic`.
pub(crate) async fn report_submit<T>(
    telemetry: &DashboardTelemetry,
    topic: &str,
    outcome: &Result<T, ApiError>,
    payload: impl FnOnce(&T) -> Value,
) {
    match outcome {
        Ok(value) => telemetry.record(LogLevel::Info, topic, payload(value)).await,
        Err(err) => {
            telemetry
                .record(
                    LogLevel::Warn,
                    "form.submit.failed",
                    json!({ "topic": topic, "kind": err.kind(), "error": err.message() }),
                )
                .await;
        }
    }
}
