use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use shared_logging::LogLevel;

use crate::{
    classifier::{RiskBand, RiskScheme, RiskThresholds},
    model::NotificationProvider,
};

/// Dashboard client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Backend connection.
    pub api: ApiSettings,
    /// Refresh intervals.
    pub polling: PollingSettings,
    /// Risk banding preset used by distribution charts.
    pub risk_scheme: RiskScheme,
    /// Notification routing.
    pub notifications: NotificationSettings,
    /// Log and event sinks.
    pub telemetry: TelemetrySettings,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            polling: PollingSettings::default(),
            risk_scheme: RiskScheme::FiveBand,
            notifications: NotificationSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl DashboardConfig {
    /// Loads configuration from a TOML file and applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config {}", path.display()))?;
        let mut config =
            Self::from_toml(&raw).with_context(|| format!("parsing {}", path.display()))?;
        if let (Some(parent), Some(log_path)) = (path.parent(), &mut config.telemetry.log_path) {
            if log_path.is_relative() {
                *log_path = parent.join(&*log_path);
            }
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document without touching the environment.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let document: ConfigDocument = toml::from_str(raw)?;
        let risk_scheme = document.risk.into_scheme()?;
        let config = Self {
            api: document.api,
            polling: document.polling,
            risk_scheme,
            notifications: document.notifications,
            telemetry: document.telemetry,
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `GOVDASH_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("GOVDASH_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(raw) = lookup("GOVDASH_TIMEOUT_MS") {
            self.api.timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("GOVDASH_TIMEOUT_MS must be an integer (got '{raw}')"))?;
        }
        if let Some(token) = lookup("GOVDASH_BEARER_TOKEN") {
            self.api.bearer = Some(token).filter(|t| !t.trim().is_empty());
        }
        if let Some(raw) = lookup("GOVDASH_LOG_LEVEL") {
            self.telemetry.min_level = raw.parse()?;
        }
        if let Some(raw) = lookup("GOVDASH_LOG_PATH") {
            self.telemetry.log_path = Some(PathBuf::from(raw));
        }
        Ok(())
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("api.base_url must start with http:// or https:// (got '{url}')");
        }
        if self.api.timeout_ms == 0 {
            bail!("api.timeout_ms must be greater than zero");
        }
        if self.telemetry.event_capacity == 0 {
            bail!("telemetry.event_capacity must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    api: ApiSettings,
    #[serde(default)]
    polling: PollingSettings,
    #[serde(default)]
    risk: RiskSettings,
    #[serde(default)]
    notifications: NotificationSettings,
    #[serde(default)]
    telemetry: TelemetrySettings,
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiSettings {
    /// Base URL, without the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// User agent header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Optional bearer token.
    #[serde(default)]
    pub bearer: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            bearer: None,
        }
    }
}

impl ApiSettings {
    /// Timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Poll intervals in seconds; zero disables polling for that view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PollingSettings {
    /// Dashboard metrics and activities.
    #[serde(default = "default_poll_secs")]
    pub dashboard_secs: u64,
    /// Compliance monitors.
    #[serde(default = "default_poll_secs")]
    pub compliance_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            dashboard_secs: default_poll_secs(),
            compliance_secs: default_poll_secs(),
        }
    }
}

impl PollingSettings {
    /// Dashboard interval, `None` when disabled.
    #[must_use]
    pub const fn dashboard(&self) -> Option<Duration> {
        interval(self.dashboard_secs)
    }

    /// Compliance interval, `None` when disabled.
    #[must_use]
    pub const fn compliance(&self) -> Option<Duration> {
        interval(self.compliance_secs)
    }
}

const fn interval(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RiskSettings {
    #[serde(default = "default_scheme")]
    scheme: String,
    #[serde(default)]
    thresholds: Vec<ThresholdEntry>,
    #[serde(default = "default_floor")]
    floor: String,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            thresholds: Vec::new(),
            floor: default_floor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ThresholdEntry {
    band: String,
    min: f64,
}

impl RiskSettings {
    fn into_scheme(self) -> Result<RiskScheme> {
        match self.scheme.trim().to_ascii_lowercase().as_str() {
            "three_band" | "three-band" => Ok(RiskScheme::ThreeBand),
            "five_band" | "five-band" => Ok(RiskScheme::FiveBand),
            "custom" => {
                if self.thresholds.is_empty() {
                    bail!("risk.scheme = \"custom\" requires [[risk.thresholds]] entries");
                }
                let bounds = self
                    .thresholds
                    .iter()
                    .map(|entry| Ok((entry.min, RiskBand::parse(&entry.band)?)))
                    .collect::<Result<Vec<_>>>()?;
                let table = RiskThresholds::new(bounds, RiskBand::parse(&self.floor)?)?;
                Ok(RiskScheme::Custom(table))
            }
            other => bail!("unknown risk scheme '{other}'"),
        }
    }
}

/// Which notification endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationRoute {
    /// `POST /api/notifications/send`.
    Send,
    /// `POST /api/send-sms-notification`.
    Sms,
}

/// Notification defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationSettings {
    /// Endpoint variant.
    #[serde(default = "default_route")]
    pub route: NotificationRoute,
    /// Provider preselected in the form.
    #[serde(default = "default_provider")]
    pub default_provider: NotificationProvider,
    /// Country code prepended to ten-digit numbers.
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            route: default_route(),
            default_provider: default_provider(),
            country_code: default_country_code(),
        }
    }
}

/// Log and event sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelemetrySettings {
    /// JSON-lines log file; logging is disabled when absent.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    /// Least severe level written.
    #[serde(default = "default_min_level")]
    pub min_level: LogLevel,
    /// Retained events on the in-memory bus.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_path: None,
            min_level: default_min_level(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".into()
}

const fn default_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    concat!("govdash/", env!("CARGO_PKG_VERSION")).into()
}

const fn default_poll_secs() -> u64 {
    30
}

fn default_scheme() -> String {
    "five_band".into()
}

fn default_floor() -> String {
    "Low".into()
}

const fn default_route() -> NotificationRoute {
    NotificationRoute::Send
}

const fn default_provider() -> NotificationProvider {
    NotificationProvider::Sms
}

fn default_country_code() -> String {
    "+1".into()
}

const fn default_min_level() -> LogLevel {
    LogLevel::Info
}

const fn default_event_capacity() -> usize {
    256
}
