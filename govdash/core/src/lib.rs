#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Governance dashboard client: typed access to the governance REST API,
//! status classification, chart aggregation, and per-page view controllers.

/// Error taxonomy for API calls and form checks.
#[path = "../error.rs"]
pub mod error;

/// Response envelope normalization.
#[path = "../envelope.rs"]
pub mod envelope;

/// Entities, enums, and forms exchanged with the backend.
#[path = "../model.rs"]
pub mod model;

/// Alert and risk classification.
#[path = "../classifier.rs"]
pub mod classifier;

/// Chart-ready reductions over entity collections.
#[path = "../aggregator.rs"]
pub mod aggregator;

/// HTTP transport abstraction.
#[path = "../transport.rs"]
pub mod transport;

/// Typed API client.
#[path = "../client.rs"]
pub mod client;

/// TOML configuration with environment overrides.
#[path = "../config.rs"]
pub mod config;

/// Telemetry builder for the dashboard.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Text renderers for cards, tables, badges, and charts.
#[path = "../render.rs"]
pub mod render;

/// View controllers.
#[path = "../views/main.rs"]
pub mod views;

pub use aggregator::{
    compute_compliance_stats, count_by_category, group_by, percentage_of, ChartSummary,
    ComplianceStats, OverallStatus,
};
pub use classifier::{classify_alert, classify_risk, DisplayCategory, RiskBand, RiskScheme};
pub use client::{ApiClient, Fetched};
pub use config::DashboardConfig;
pub use envelope::ApiResponse;
pub use error::ApiError;
pub use telemetry::{DashboardTelemetry, DashboardTelemetryBuilder};
pub use transport::{HttpTransport, ReqwestTransport, ScriptedTransport};
pub use views::{
    ComplianceView, DashboardView, GovernanceView, NotificationsView, ReportsView, RiskView,
    ViewContext,
};
