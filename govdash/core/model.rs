use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{classifier::classify_risk, error::ApiError};

/// Backend record identifier.
pub type RecordId = i64;

fn normalized(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_")
}

/// Governance policy category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PolicyCategory {
    /// Data privacy.
    DataPrivacy,
    /// Model transparency.
    ModelTransparency,
    /// Ethical AI.
    EthicalAi,
    /// Bias mitigation.
    BiasMitigation,
    /// Security.
    Security,
    /// Regulatory compliance.
    Compliance,
    /// Accountability.
    Accountability,
    /// Human oversight.
    HumanOversight,
    /// Category this client does not know about.
    Unknown(String),
}

impl PolicyCategory {
    /// Every known category in form order.
    pub const ALL: [Self; 8] = [
        Self::DataPrivacy,
        Self::ModelTransparency,
        Self::EthicalAi,
        Self::BiasMitigation,
        Self::Security,
        Self::Compliance,
        Self::Accountability,
        Self::HumanOversight,
    ];

    /// Display and wire label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::DataPrivacy => "Data Privacy",
            Self::ModelTransparency => "Model Transparency",
            Self::EthicalAi => "Ethical AI",
            Self::BiasMitigation => "Bias Mitigation",
            Self::Security => "Security",
            Self::Compliance => "Compliance",
            Self::Accountability => "Accountability",
            Self::HumanOversight => "Human Oversight",
            Self::Unknown(raw) => raw,
        }
    }

    /// Parses a label, tolerating case, hyphens, and underscores.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match normalized(raw).as_str() {
            "data_privacy" => Self::DataPrivacy,
            "model_transparency" => Self::ModelTransparency,
            "ethical_ai" => Self::EthicalAi,
            "bias_mitigation" => Self::BiasMitigation,
            "security" => Self::Security,
            "compliance" => Self::Compliance,
            "accountability" => Self::Accountability,
            "human_oversight" => Self::HumanOversight,
            _ => Self::Unknown(raw.trim().to_string()),
        }
    }
}

/// Lifecycle status of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PolicyStatus {
    /// Not yet in force. Default for new policies.
    Draft,
    /// In force.
    Active,
    /// Awaiting review.
    UnderReview,
    /// Retired.
    Archived,
    /// Status this client does not know about.
    Unknown(String),
}

impl Default for PolicyStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl PolicyStatus {
    /// Display and wire label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Draft => "Draft",
            Self::Active => "Active",
            Self::UnderReview => "Under Review",
            Self::Archived => "Archived",
            Self::Unknown(raw) => raw,
        }
    }

    /// Parses a label.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match normalized(raw).as_str() {
            "draft" => Self::Draft,
            "active" => Self::Active,
            "under_review" | "review" => Self::UnderReview,
            "archived" => Self::Archived,
            _ => Self::Unknown(raw.trim().to_string()),
        }
    }
}

/// Processing status of a risk assessment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssessmentStatus {
    /// Queued for analysis.
    Pending,
    /// Analysis running.
    InProgress,
    /// Findings available.
    Completed,
    /// Free-form status (the backend also emits labels such as `High Risk`).
    Unknown(String),
}

impl AssessmentStatus {
    /// Display and wire label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Unknown(raw) => raw,
        }
    }

    /// Parses a label.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match normalized(raw).as_str() {
            "pending" => Self::Pending,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::Unknown(raw.trim().to_string()),
        }
    }
}

/// Server-assigned severity of a compliance monitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertLevel {
    /// Threshold severely breached.
    Critical,
    /// Approaching the threshold.
    Warning,
    /// Within threshold.
    Normal,
    /// Comfortably exceeding requirements.
    Good,
    /// Level this client does not know about.
    Unknown(String),
}

impl AlertLevel {
    /// The four levels the backend assigns.
    pub const KNOWN: [Self; 4] = [Self::Critical, Self::Warning, Self::Normal, Self::Good];

    /// Wire label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Critical => "Critical",
            Self::Warning => "Warning",
            Self::Normal => "Normal",
            Self::Good => "Good",
            Self::Unknown(raw) => raw,
        }
    }

    /// Parses a backend label. Only the exact labels are recognized; anything
    /// else, including a differently-cased label, is kept in [`AlertLevel::Unknown`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Critical" => Self::Critical,
            "Warning" => Self::Warning,
            "Normal" => Self::Normal,
            "Good" => Self::Good,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    /// Case-insensitive parse for operator input.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match normalized(raw).as_str() {
            "critical" => Self::Critical,
            "warning" => Self::Warning,
            "normal" => Self::Normal,
            "good" => Self::Good,
            _ => Self::Unknown(raw.trim().to_string()),
        }
    }

    /// Operator guidance shown next to the level.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Critical => "Immediate action required. Compliance threshold severely breached.",
            Self::Warning => "Attention needed. Compliance metrics approaching threshold limits.",
            Self::Normal => "All compliance metrics within acceptable thresholds.",
            Self::Good => "Compliance metrics exceeding minimum requirements.",
            Self::Unknown(_) => "Alert level not yet determined.",
        }
    }

    /// Normal and Good count as compliant.
    #[must_use]
    pub const fn is_compliant(&self) -> bool {
        matches!(self, Self::Normal | Self::Good)
    }
}

/// Whether a monitor is being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MonitorStatus {
    /// Evaluated on each cycle.
    Active,
    /// Paused.
    Inactive,
    /// Status this client does not know about.
    Unknown(String),
}

impl MonitorStatus {
    /// Wire label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Unknown(raw) => raw,
        }
    }

    /// Parses a label.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match normalized(raw).as_str() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            _ => Self::Unknown(raw.trim().to_string()),
        }
    }
}

/// Kind of generated report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReportType {
    /// Summary of policies and their status.
    GovernanceSummary,
    /// Overview of risk assessments and key findings.
    RiskAssessmentOverview,
    /// Compliance monitoring status across systems.
    ComplianceStatus,
    /// Everything above in one document.
    ComprehensiveReport,
    /// Type this client does not know about.
    Unknown(String),
}

impl ReportType {
    /// Every known type in form order.
    pub const ALL: [Self; 4] = [
        Self::GovernanceSummary,
        Self::RiskAssessmentOverview,
        Self::ComplianceStatus,
        Self::ComprehensiveReport,
    ];

    /// Canonical wire value.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::GovernanceSummary => "governance_summary",
            Self::RiskAssessmentOverview => "risk_assessment_overview",
            Self::ComplianceStatus => "compliance_status",
            Self::ComprehensiveReport => "comprehensive_report",
            Self::Unknown(raw) => raw,
        }
    }

    /// Parses canonical values and the legacy title-cased variants.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match normalized(raw).as_str() {
            "governance_summary" => Self::GovernanceSummary,
            "risk_assessment_overview" => Self::RiskAssessmentOverview,
            "compliance_status" => Self::ComplianceStatus,
            "comprehensive_report" | "comprehensive_governance_report" => {
                Self::ComprehensiveReport
            }
            _ => Self::Unknown(raw.trim().to_string()),
        }
    }

    /// Human title. Unknown types are converted from snake/camel case.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::GovernanceSummary => "Governance Summary".into(),
            Self::RiskAssessmentOverview => "Risk Assessment Overview".into(),
            Self::ComplianceStatus => "Compliance Status".into(),
            Self::ComprehensiveReport => "Comprehensive Governance Report".into(),
            Self::Unknown(raw) => title_case(raw),
        }
    }

    /// One-line description shown in the report form.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::GovernanceSummary => "Summary of AI governance policies and their status",
            Self::RiskAssessmentOverview => "Overview of AI risk assessments and key findings",
            Self::ComplianceStatus => "Current status of compliance monitoring across AI systems",
            Self::ComprehensiveReport => "A comprehensive report covering all governance aspects",
            Self::Unknown(_) => "",
        }
    }
}

/// `risk_assessment_overview` / `riskAssessment` → `Risk assessment overview` / `Risk Assessment`.
fn title_case(raw: &str) -> String {
    let mut spaced = String::with_capacity(raw.len() + 4);
    for ch in raw.chars() {
        if ch == '_' {
            spaced.push(' ');
        } else {
            if ch.is_ascii_uppercase() {
                spaced.push(' ');
            }
            spaced.push(ch);
        }
    }
    let trimmed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = trimmed.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Publication status of a report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReportStatus {
    /// Being generated or edited.
    Draft,
    /// Finalized.
    Final,
    /// Shared with stakeholders.
    Published,
    /// Status this client does not know about.
    Unknown(String),
}

impl ReportStatus {
    /// Wire label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Draft => "Draft",
            Self::Final => "Final",
            Self::Published => "Published",
            Self::Unknown(raw) => raw,
        }
    }

    /// Parses a label.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match normalized(raw).as_str() {
            "draft" => Self::Draft,
            "final" => Self::Final,
            "published" => Self::Published,
            _ => Self::Unknown(raw.trim().to_string()),
        }
    }
}

macro_rules! string_conversions {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl From<String> for $ty {
                fn from(raw: String) -> Self {
                    Self::parse(&raw)
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.label().to_string()
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }
        )+
    };
}

string_conversions!(
    PolicyCategory,
    PolicyStatus,
    AssessmentStatus,
    AlertLevel,
    MonitorStatus,
    ReportType,
    ReportStatus,
);

/// Accepts RFC 3339 as well as the naive ISO timestamps the backend emits.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_timestamp(text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{text}'"))),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Governance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Identifier.
    pub id: RecordId,
    /// Title.
    pub title: String,
    /// Category.
    pub category: PolicyCategory,
    /// Short description.
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// Full policy text.
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    /// Lifecycle status.
    #[serde(default)]
    pub status: PolicyStatus,
    /// Creation time.
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Risk assessment of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Identifier.
    pub id: RecordId,
    /// Title.
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    /// Assessed model.
    #[serde(default, deserialize_with = "lenient_string")]
    pub model_name: String,
    /// Documentation submitted for the assessment.
    #[serde(default, deserialize_with = "lenient_string")]
    pub documentation: String,
    /// Findings computed server-side.
    #[serde(default, deserialize_with = "lenient_string")]
    pub findings: String,
    /// Recommendations computed server-side.
    #[serde(default, deserialize_with = "lenient_string")]
    pub recommendations: String,
    /// Score in 0..=100.
    #[serde(default)]
    pub risk_score: f64,
    /// Processing status.
    pub status: AssessmentStatus,
    /// Creation time.
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Compliance monitor tracking one metric of a model or system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceMonitor {
    /// Identifier.
    pub id: RecordId,
    /// Metric name.
    pub name: String,
    /// Description.
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// Monitored model or system (loose join with [`RiskAssessment::model_name`]).
    #[serde(default, deserialize_with = "lenient_string")]
    pub model_or_system: String,
    /// Threshold as a fraction in 0..=1.
    pub threshold_value: f64,
    /// Latest value as a fraction in 0..=1.
    #[serde(default)]
    pub current_value: f64,
    /// Server-derived severity.
    pub alert_level: AlertLevel,
    /// Evaluation status.
    pub status: MonitorStatus,
    /// Last evaluation time.
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub last_checked: Option<DateTime<Utc>>,
    /// Creation time.
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Generated governance report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Identifier.
    pub id: RecordId,
    /// Title.
    pub title: String,
    /// Description.
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// Report kind.
    pub report_type: ReportType,
    /// Publication status.
    pub status: ReportStatus,
    /// Body.
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    /// Generated insights.
    #[serde(default, deserialize_with = "lenient_string")]
    pub insights: String,
    /// Creation time.
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Signed change of each headline metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricDeltas {
    /// Change in policy count.
    #[serde(default)]
    pub policy_count: f64,
    /// Change in average risk score.
    #[serde(default)]
    pub avg_risk_score: f64,
    /// Change in compliance rate.
    #[serde(default)]
    pub compliance_rate: f64,
    /// Change in active monitors.
    #[serde(default)]
    pub active_monitors: f64,
}

/// Headline dashboard snapshot. Zeroed when the backend is unreachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    /// Number of policies.
    #[serde(default)]
    pub policy_count: u64,
    /// Mean risk score across assessments.
    #[serde(default)]
    pub avg_risk_score: f64,
    /// Compliance rate as a fraction in 0..=1.
    #[serde(default)]
    pub compliance_rate: f64,
    /// Monitors with status Active.
    #[serde(default)]
    pub active_monitors: u64,
    /// Deltas.
    #[serde(default)]
    pub deltas: MetricDeltas,
}

/// Entry of the recent activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Identifier.
    pub id: RecordId,
    /// Kind such as `create` or `update`.
    pub activity_type: String,
    /// Human description.
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// Who performed it.
    #[serde(default, deserialize_with = "lenient_string")]
    pub actor: String,
    /// Related record id.
    #[serde(default)]
    pub related_entity_id: Option<RecordId>,
    /// Related record type (`policy`, `compliance_monitor`, ...).
    #[serde(default)]
    pub related_entity_type: Option<String>,
    /// Time of the activity.
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One series of a backend chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    /// Series label.
    #[serde(default)]
    pub label: Option<String>,
    /// Values.
    #[serde(default)]
    pub data: Vec<f64>,
    /// Color(s) chosen by the backend; a string or an array of strings.
    #[serde(default, rename = "backgroundColor")]
    pub background_color: Value,
}

/// Chart payload returned by the dashboard chart endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    /// Category labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Series.
    #[serde(default)]
    pub datasets: Vec<ChartDataset>,
}

impl ChartData {
    /// Whether there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() || self.datasets.iter().all(|set| set.data.is_empty())
    }
}

/// Identifier returned by create endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    /// New record id.
    pub id: RecordId,
}

impl Created {
    /// Extracts `id`, `<entity>_id`, or `data.id` from a create response.
    pub(crate) fn from_response(value: &Value, id_key: &str) -> Result<Self, ApiError> {
        [value.get(id_key), value.get("id"), value.pointer("/data/id")]
            .into_iter()
            .flatten()
            .find_map(Value::as_i64)
            .map(|id| Self { id })
            .ok_or_else(|| ApiError::Parse(format!("create response is missing '{id_key}'")))
    }
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

fn require_fraction(field: &str, value: f64) -> Result<(), ApiError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "{field} must be between 0 and 1 (got {value})"
        )))
    }
}

/// Payload for creating or updating a policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyForm {
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Category; `None` until the user picks one.
    pub category: Option<PolicyCategory>,
    /// Status; Draft for new policies.
    pub status: PolicyStatus,
    /// Full text.
    pub content: String,
}

impl PolicyForm {
    /// Prefills the form from an existing policy for editing.
    #[must_use]
    pub fn from_policy(policy: &Policy) -> Self {
        Self {
            title: policy.title.clone(),
            description: policy.description.clone(),
            category: Some(policy.category.clone()),
            status: policy.status.clone(),
            content: policy.content.clone(),
        }
    }

    /// Title, category, and description are required.
    pub fn validate(&self) -> Result<(), ApiError> {
        require("title", &self.title)?;
        match &self.category {
            None => return Err(ApiError::Validation("category is required".into())),
            Some(PolicyCategory::Unknown(raw)) => {
                return Err(ApiError::Validation(format!("unknown category '{raw}'")))
            }
            Some(_) => {}
        }
        require("description", &self.description)
    }
}

/// Payload for requesting a risk assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskAssessmentForm {
    /// Model to assess.
    pub model_name: String,
    /// Model documentation analysed server-side.
    pub documentation: String,
}

impl RiskAssessmentForm {
    /// Both fields are required.
    pub fn validate(&self) -> Result<(), ApiError> {
        require("model_name", &self.model_name)?;
        require("documentation", &self.documentation)
    }
}

/// Preset compliance metric offered by the monitor form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorPreset {
    /// Metric name.
    pub name: &'static str,
    /// Description.
    pub description: &'static str,
    /// Typical threshold.
    pub threshold: f64,
}

/// Standard compliance metrics.
pub const MONITOR_PRESETS: [MonitorPreset; 8] = [
    MonitorPreset {
        name: "Data Privacy Compliance",
        description: "Monitors compliance with data privacy policies and regulations",
        threshold: 0.9,
    },
    MonitorPreset {
        name: "Fairness Metric",
        description: "Monitors fairness across different demographic groups",
        threshold: 0.85,
    },
    MonitorPreset {
        name: "Explainability Index",
        description: "Tracks the explainability level of model decisions",
        threshold: 0.7,
    },
    MonitorPreset {
        name: "Security Control Compliance",
        description: "Monitors adherence to security controls and policies",
        threshold: 0.95,
    },
    MonitorPreset {
        name: "Documentation Completeness",
        description: "Tracks the completeness of model documentation",
        threshold: 0.8,
    },
    MonitorPreset {
        name: "Model Performance Stability",
        description: "Monitors stability of model performance over time",
        threshold: 0.9,
    },
    MonitorPreset {
        name: "Data Drift Detection",
        description: "Monitors for drift in input data distribution",
        threshold: 0.05,
    },
    MonitorPreset {
        name: "Human Oversight Confirmation",
        description: "Tracks the percentage of decisions reviewed by humans",
        threshold: 0.25,
    },
];

/// Default threshold of a blank monitor form.
pub const DEFAULT_MONITOR_THRESHOLD: f64 = 0.8;

/// Payload for creating a compliance monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorForm {
    /// Metric name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Monitored model or system.
    pub model_or_system: String,
    /// Threshold fraction in 0..=1.
    pub threshold_value: f64,
}

impl Default for MonitorForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            model_or_system: String::new(),
            threshold_value: DEFAULT_MONITOR_THRESHOLD,
        }
    }
}

impl MonitorForm {
    /// Fills name, description, and threshold from a preset, keeping the model.
    pub fn apply_preset(&mut self, preset: &MonitorPreset) {
        self.name = preset.name.to_string();
        self.description = preset.description.to_string();
        self.threshold_value = preset.threshold;
    }

    /// Required fields and the `[0, 1]` threshold bound.
    pub fn validate(&self) -> Result<(), ApiError> {
        require("name", &self.name)?;
        require("description", &self.description)?;
        require("model_or_system", &self.model_or_system)?;
        require_fraction("threshold_value", self.threshold_value)
    }
}

/// Full replacement payload for `PUT /api/compliance-monitors/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorUpdate {
    /// Metric name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Monitored model or system.
    pub model_or_system: String,
    /// Threshold fraction in 0..=1.
    pub threshold_value: f64,
    /// Current value fraction in 0..=1.
    pub current_value: f64,
    /// Evaluation status.
    pub status: MonitorStatus,
    /// Alert level as last known; the backend re-derives it.
    pub alert_level: AlertLevel,
}

impl Default for MonitorUpdate {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            model_or_system: String::new(),
            threshold_value: DEFAULT_MONITOR_THRESHOLD,
            current_value: 0.0,
            status: MonitorStatus::Active,
            alert_level: AlertLevel::Normal,
        }
    }
}

impl MonitorUpdate {
    /// Prefills from an existing monitor.
    #[must_use]
    pub fn from_monitor(monitor: &ComplianceMonitor) -> Self {
        Self {
            name: monitor.name.clone(),
            description: monitor.description.clone(),
            model_or_system: monitor.model_or_system.clone(),
            threshold_value: monitor.threshold_value,
            current_value: monitor.current_value,
            status: monitor.status.clone(),
            alert_level: monitor.alert_level.clone(),
        }
    }

    /// Required fields and both fractions within `[0, 1]`.
    pub fn validate(&self) -> Result<(), ApiError> {
        require("name", &self.name)?;
        require("model_or_system", &self.model_or_system)?;
        require_fraction("threshold_value", self.threshold_value)?;
        require_fraction("current_value", self.current_value)
    }
}

/// Payload for generating a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportForm {
    /// Requested report kind.
    pub report_type: ReportType,
}

impl Default for ReportForm {
    fn default() -> Self {
        Self {
            report_type: ReportType::GovernanceSummary,
        }
    }
}

impl ReportForm {
    /// Only known report types can be generated.
    pub fn validate(&self) -> Result<(), ApiError> {
        match &self.report_type {
            ReportType::Unknown(raw) if raw.trim().is_empty() => {
                Err(ApiError::Validation("report_type is required".into()))
            }
            ReportType::Unknown(raw) => Err(ApiError::Validation(format!(
                "unsupported report type '{raw}'"
            ))),
            _ => Ok(()),
        }
    }
}

/// Delivery channel of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationProvider {
    /// Text message.
    Sms,
    /// Server console (testing).
    Console,
}

impl NotificationProvider {
    /// Parses a wire label.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match normalized(raw).as_str() {
            "sms" => Some(Self::Sms),
            "console" => Some(Self::Console),
            _ => None,
        }
    }

    /// Wire label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Console => "console",
        }
    }
}

/// Urgency attached to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Informational.
    Low,
    /// Default.
    Normal,
    /// Needs attention soon.
    High,
    /// Needs attention now.
    Critical,
}

impl Urgency {
    /// Parses a wire label.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match normalized(raw).as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Template family of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Free text.
    Custom,
    /// Compliance monitor alert.
    ComplianceAlert,
    /// Risk assessment result.
    RiskAssessment,
    /// Policy change.
    PolicyUpdate,
}

impl NotificationKind {
    /// Parses a wire label; `general` is accepted for [`NotificationKind::Custom`].
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match normalized(raw).as_str() {
            "custom" | "general" => Some(Self::Custom),
            "compliance_alert" | "compliance" => Some(Self::ComplianceAlert),
            "risk_assessment" | "risk" => Some(Self::RiskAssessment),
            "policy_update" | "policy" => Some(Self::PolicyUpdate),
            _ => None,
        }
    }

    /// Wire label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::ComplianceAlert => "compliance_alert",
            Self::RiskAssessment => "risk_assessment",
            Self::PolicyUpdate => "policy_update",
        }
    }
}

/// Record a notification refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity type (`compliance_monitor`, `risk_assessment`, `policy`, `report`).
    pub entity_type: String,
    /// Entity id.
    pub entity_id: RecordId,
}

/// Outbound notification request. Never persisted client-side.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    /// Delivery channel.
    pub provider: NotificationProvider,
    /// Phone number or console recipient.
    pub recipient: String,
    /// Message body.
    pub message: String,
    /// Optional linked record.
    pub entity: Option<EntityRef>,
    /// Optional urgency.
    pub urgency: Option<Urgency>,
    /// Template family.
    pub kind: NotificationKind,
    /// Extra metadata forwarded verbatim.
    pub metadata: Map<String, Value>,
}

impl Default for NotificationRequest {
    fn default() -> Self {
        Self::new(NotificationProvider::Sms, "", "")
    }
}

impl NotificationRequest {
    /// Custom message with no linked record.
    #[must_use]
    pub fn new(
        provider: NotificationProvider,
        recipient: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            recipient: recipient.into(),
            message: message.into(),
            entity: None,
            urgency: None,
            kind: NotificationKind::Custom,
            metadata: Map::new(),
        }
    }

    /// Alert about a compliance monitor, prefilled with its name and level.
    #[must_use]
    pub fn monitor_alert(
        provider: NotificationProvider,
        recipient: impl Into<String>,
        monitor: &ComplianceMonitor,
    ) -> Self {
        let mut request = Self::new(
            provider,
            recipient,
            format!(
                "ALERT: Compliance monitor \"{}\" on {} is at {} level. Current value: {:.1}%, Threshold: {:.1}%. Please review.",
                monitor.name,
                monitor.model_or_system,
                monitor.alert_level.label().to_uppercase(),
                monitor.current_value * 100.0,
                monitor.threshold_value * 100.0
            ),
        );
        request.kind = NotificationKind::ComplianceAlert;
        request.urgency = Some(match monitor.alert_level {
            AlertLevel::Critical => Urgency::Critical,
            AlertLevel::Warning => Urgency::High,
            _ => Urgency::Normal,
        });
        request.entity = Some(EntityRef {
            entity_type: "compliance_monitor".into(),
            entity_id: monitor.id,
        });
        request
            .metadata
            .insert("current_value".into(), monitor.current_value.into());
        request
            .metadata
            .insert("threshold_value".into(), monitor.threshold_value.into());
        request
    }

    /// Alert about a risk assessment, prefilled with model and score.
    #[must_use]
    pub fn assessment_alert(
        provider: NotificationProvider,
        recipient: impl Into<String>,
        assessment: &RiskAssessment,
    ) -> Self {
        let mut request = Self::new(
            provider,
            recipient,
            format!(
                "NOTIFICATION: Risk assessment for \"{}\" is {}. Risk Score: {:.0}/100 ({}).",
                assessment.model_name,
                assessment.status.label().to_lowercase(),
                assessment.risk_score,
                classify_risk(assessment.risk_score)
            ),
        );
        request.kind = NotificationKind::RiskAssessment;
        request.entity = Some(EntityRef {
            entity_type: "risk_assessment".into(),
            entity_id: assessment.id,
        });
        request
            .metadata
            .insert("risk_score".into(), assessment.risk_score.into());
        request
    }

    /// Announcement of a policy change.
    #[must_use]
    pub fn policy_update(
        provider: NotificationProvider,
        recipient: impl Into<String>,
        policy: &Policy,
    ) -> Self {
        let mut request = Self::new(
            provider,
            recipient,
            format!(
                "UPDATE: Governance policy \"{}\" is now {}. Please review the changes and acknowledge compliance.",
                policy.title, policy.status
            ),
        );
        request.kind = NotificationKind::PolicyUpdate;
        request.entity = Some(EntityRef {
            entity_type: "policy".into(),
            entity_id: policy.id,
        });
        request
    }

    /// Recipient and message are required; SMS recipients need at least one digit.
    pub fn validate(&self) -> Result<(), ApiError> {
        require("recipient", &self.recipient)?;
        require("message", &self.message)?;
        if self.provider == NotificationProvider::Sms
            && !self.recipient.chars().any(|c| c.is_ascii_digit())
        {
            return Err(ApiError::Validation(
                "Please enter a valid phone number.".into(),
            ));
        }
        Ok(())
    }
}

/// Normalizes a phone number to E.164. Ten bare digits, or a national number with a
/// trunk `0`, get `country_code`; the trunk zeros are dropped.
#[must_use]
pub fn format_phone_number(raw: &str, country_code: &str) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if trimmed.starts_with('+') {
        return format!("+{digits}");
    }
    let national = digits.trim_start_matches('0');
    if digits.len() == 10 || national.len() < digits.len() {
        format!("+{}{national}", country_code.trim_start_matches('+'))
    } else {
        format!("+{digits}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn monitor_json() -> Value {
        json!({
            "id": 3,
            "name": "Fairness Metric",
            "description": "Demographic parity",
            "model_or_system": "credit-scorer",
            "threshold_value": 0.85,
            "current_value": 0.72,
            "status": "Active",
            "last_checked": "2024-03-01T10:15:00.123456",
            "alert_level": "Warning",
            "created_at": null
        })
    }

    #[test]
    fn deserializes_monitor_with_naive_timestamp() {
        let monitor: ComplianceMonitor = serde_json::from_value(monitor_json()).unwrap();
        assert_eq!(monitor.alert_level, AlertLevel::Warning);
        assert_eq!(monitor.status, MonitorStatus::Active);
        assert!(monitor.last_checked.is_some());
        assert!(monitor.created_at.is_none());
    }

    #[test]
    fn unknown_enum_values_are_preserved() {
        let mut raw = monitor_json();
        raw["alert_level"] = json!("Elevated");
        let monitor: ComplianceMonitor = serde_json::from_value(raw).unwrap();
        assert_eq!(monitor.alert_level, AlertLevel::Unknown("Elevated".into()));
        let back = serde_json::to_value(&monitor).unwrap();
        assert_eq!(back["alert_level"], "Elevated");
    }

    #[test]
    fn report_type_normalizes_legacy_values() {
        for raw in [
            "Comprehensive Governance Report",
            "comprehensive_governance_report",
            "comprehensive_report",
        ] {
            assert_eq!(ReportType::parse(raw), ReportType::ComprehensiveReport);
        }
        assert_eq!(
            ReportType::parse("Governance Summary"),
            ReportType::GovernanceSummary
        );
        assert_eq!(
            ReportType::parse("vendorAudit_findings").title(),
            "Vendor Audit findings"
        );
    }

    #[test]
    fn policy_form_requires_category() {
        let form = PolicyForm {
            title: "Retention".into(),
            description: "How long we keep data".into(),
            ..PolicyForm::default()
        };
        let err = form.validate().unwrap_err();
        assert!(err.message().contains("category"));
        let body = serde_json::to_value(PolicyForm {
            category: Some(PolicyCategory::DataPrivacy),
            ..form
        })
        .unwrap();
        assert_eq!(body["category"], "Data Privacy");
        assert_eq!(body["status"], "Draft");
    }

    #[test]
    fn monitor_form_rejects_out_of_range_threshold() {
        let form = MonitorForm {
            name: "Fairness".into(),
            description: "Parity".into(),
            model_or_system: "scorer".into(),
            threshold_value: 1.5,
        };
        let err = form.validate().unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(err.message().contains("between 0 and 1"));
        let nan = MonitorForm {
            threshold_value: f64::NAN,
            ..form
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn preset_fills_form_but_keeps_model() {
        let mut form = MonitorForm {
            model_or_system: "chatbot".into(),
            ..MonitorForm::default()
        };
        form.apply_preset(&MONITOR_PRESETS[6]);
        assert_eq!(form.name, "Data Drift Detection");
        assert!((form.threshold_value - 0.05).abs() < f64::EPSILON);
        assert_eq!(form.model_or_system, "chatbot");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn created_id_is_found_under_entity_key() {
        let body = json!({ "success": true, "monitor_id": 12 });
        assert_eq!(Created::from_response(&body, "monitor_id").unwrap().id, 12);
        assert!(Created::from_response(&json!({ "success": true }), "policy_id").is_err());
    }

    #[test]
    fn phone_numbers_normalize_to_e164() {
        assert_eq!(format_phone_number("(555) 123-4567", "+1"), "+15551234567");
        assert_eq!(format_phone_number("+44 20 7946 0958", "+1"), "+442079460958");
        assert_eq!(format_phone_number("4420794609", "44"), "+444420794609");
        assert_eq!(format_phone_number("020794609581", "+44"), "+4420794609581");
        assert_eq!(format_phone_number("0 20 7946 0958", "44"), "+442079460958");
    }

    #[test]
    fn monitor_alert_links_entity_and_urgency() {
        let monitor: ComplianceMonitor = serde_json::from_value(monitor_json()).unwrap();
        let request =
            NotificationRequest::monitor_alert(NotificationProvider::Sms, "+15550000000", &monitor);
        assert_eq!(request.urgency, Some(Urgency::High));
        assert_eq!(request.entity.as_ref().unwrap().entity_id, 3);
        assert!(request.message.contains("Fairness Metric"));
        assert!(request.validate().is_ok());
        let bad = NotificationRequest::new(NotificationProvider::Sms, "alice", "hi");
        assert!(bad.validate().is_err());
    }
}
