use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::model::{AlertLevel, AssessmentStatus, MonitorStatus, PolicyStatus, ReportStatus};

/// Display category of a compliance monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DisplayCategory {
    /// Critical alert.
    #[serde(rename = "Non-Compliant")]
    NonCompliant,
    /// Warning alert.
    #[serde(rename = "Partially Compliant")]
    PartiallyCompliant,
    /// Normal alert.
    Compliant,
    /// Anything else.
    #[serde(rename = "Under Review")]
    UnderReview,
}

impl DisplayCategory {
    /// Canonical order used by charts and tables.
    pub const ALL: [Self; 4] = [
        Self::NonCompliant,
        Self::PartiallyCompliant,
        Self::Compliant,
        Self::UnderReview,
    ];

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NonCompliant => "Non-Compliant",
            Self::PartiallyCompliant => "Partially Compliant",
            Self::Compliant => "Compliant",
            Self::UnderReview => "Under Review",
        }
    }
}

impl fmt::Display for DisplayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps an alert level to its display category. Total over every input.
#[must_use]
pub const fn classify_alert(level: &AlertLevel) -> DisplayCategory {
    match level {
        AlertLevel::Critical => DisplayCategory::NonCompliant,
        AlertLevel::Warning => DisplayCategory::PartiallyCompliant,
        AlertLevel::Normal => DisplayCategory::Compliant,
        AlertLevel::Good | AlertLevel::Unknown(_) => DisplayCategory::UnderReview,
    }
}

/// Same as [`classify_alert`] for a raw wire string.
#[must_use]
pub fn classify_alert_str(raw: &str) -> DisplayCategory {
    classify_alert(&AlertLevel::parse(raw))
}

/// Risk band of a 0..=100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskBand {
    /// Highest risk.
    High,
    /// Between medium and high (five-band only).
    #[serde(rename = "Medium-High")]
    MediumHigh,
    /// Medium risk.
    Medium,
    /// Between low and medium (five-band only).
    #[serde(rename = "Medium-Low")]
    MediumLow,
    /// Lowest risk.
    Low,
}

impl RiskBand {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::MediumHigh => "Medium-High",
            Self::Medium => "Medium",
            Self::MediumLow => "Medium-Low",
            Self::Low => "Low",
        }
    }

    /// Parses a band label.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(match raw.trim().to_ascii_lowercase().replace([' ', '_'], "-").as_str() {
            "high" => Self::High,
            "medium-high" => Self::MediumHigh,
            "medium" => Self::Medium,
            "medium-low" => Self::MediumLow,
            "low" => Self::Low,
            other => bail!("unknown risk band '{other}'"),
        })
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Threshold table: a score at or above a bound falls in its band; below every bound it
/// falls in the floor band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    bounds: Vec<(f64, RiskBand)>,
    floor: RiskBand,
}

impl RiskThresholds {
    /// Builds a table from `(lower bound, band)` pairs in strictly descending order.
    pub fn new(bounds: Vec<(f64, RiskBand)>, floor: RiskBand) -> Result<Self> {
        for (bound, band) in &bounds {
            if !bound.is_finite() || !(0.0..=100.0).contains(bound) {
                bail!("risk threshold for {band} must be within 0..=100 (got {bound})");
            }
        }
        if bounds.windows(2).any(|pair| pair[0].0 <= pair[1].0) {
            bail!("risk thresholds must be strictly descending");
        }
        Ok(Self { bounds, floor })
    }

    /// Classifies a score. Non-finite scores fall in the floor band.
    #[must_use]
    pub fn classify(&self, score: f64) -> RiskBand {
        self.bounds
            .iter()
            .find(|(bound, _)| score >= *bound)
            .map_or(self.floor, |(_, band)| *band)
    }

    /// Bands from highest to the floor.
    #[must_use]
    pub fn bands(&self) -> Vec<RiskBand> {
        self.bounds
            .iter()
            .map(|(_, band)| *band)
            .chain(std::iter::once(self.floor))
            .collect()
    }
}

/// Named threshold preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskScheme {
    /// High ≥ 75, Medium ≥ 50, else Low.
    ThreeBand,
    /// Twenty-point bands: 80/60/40/20.
    FiveBand,
    /// Operator-supplied table.
    Custom(RiskThresholds),
}

impl Default for RiskScheme {
    fn default() -> Self {
        Self::ThreeBand
    }
}

impl RiskScheme {
    /// Resolves the preset into its table.
    #[must_use]
    pub fn thresholds(&self) -> RiskThresholds {
        match self {
            Self::ThreeBand => RiskThresholds {
                bounds: vec![(75.0, RiskBand::High), (50.0, RiskBand::Medium)],
                floor: RiskBand::Low,
            },
            Self::FiveBand => RiskThresholds {
                bounds: vec![
                    (80.0, RiskBand::High),
                    (60.0, RiskBand::MediumHigh),
                    (40.0, RiskBand::Medium),
                    (20.0, RiskBand::MediumLow),
                ],
                floor: RiskBand::Low,
            },
            Self::Custom(table) => table.clone(),
        }
    }

    /// Classifies a score under this scheme.
    #[must_use]
    pub fn classify(&self, score: f64) -> RiskBand {
        self.thresholds().classify(score)
    }

    /// Configuration label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ThreeBand => "three_band",
            Self::FiveBand => "five_band",
            Self::Custom(_) => "custom",
        }
    }
}

/// Canonical High/Medium/Low classification (75 / 50).
#[must_use]
pub fn classify_risk(score: f64) -> RiskBand {
    RiskScheme::ThreeBand.classify(score)
}

/// Visual tone of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTone {
    /// Green.
    Success,
    /// Amber.
    Warning,
    /// Red.
    Danger,
    /// Blue.
    Info,
    /// Grey.
    Neutral,
}

impl BadgeTone {
    /// Short marker used by the text renderer.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Success => "+",
            Self::Warning => "!",
            Self::Danger => "x",
            Self::Info => "i",
            Self::Neutral => "-",
        }
    }
}

/// Tone for any status-like label.
pub trait BadgeToned {
    /// Badge tone.
    fn tone(&self) -> BadgeTone;
}

impl BadgeToned for AlertLevel {
    fn tone(&self) -> BadgeTone {
        match self {
            Self::Critical => BadgeTone::Danger,
            Self::Warning => BadgeTone::Warning,
            Self::Normal | Self::Good => BadgeTone::Success,
            Self::Unknown(raw) => badge_tone(raw),
        }
    }
}

impl BadgeToned for DisplayCategory {
    fn tone(&self) -> BadgeTone {
        match self {
            Self::NonCompliant => BadgeTone::Danger,
            Self::PartiallyCompliant => BadgeTone::Warning,
            Self::Compliant => BadgeTone::Success,
            Self::UnderReview => BadgeTone::Info,
        }
    }
}

impl BadgeToned for RiskBand {
    fn tone(&self) -> BadgeTone {
        match self {
            Self::High | Self::MediumHigh => BadgeTone::Danger,
            Self::Medium => BadgeTone::Warning,
            Self::MediumLow | Self::Low => BadgeTone::Success,
        }
    }
}

impl BadgeToned for PolicyStatus {
    fn tone(&self) -> BadgeTone {
        match self {
            Self::Active => BadgeTone::Success,
            Self::UnderReview => BadgeTone::Warning,
            Self::Draft => BadgeTone::Info,
            Self::Archived => BadgeTone::Neutral,
            Self::Unknown(raw) => badge_tone(raw),
        }
    }
}

impl BadgeToned for AssessmentStatus {
    fn tone(&self) -> BadgeTone {
        match self {
            Self::Completed => BadgeTone::Success,
            Self::InProgress => BadgeTone::Warning,
            Self::Pending => BadgeTone::Info,
            Self::Unknown(raw) if raw.to_ascii_lowercase().contains("high") => BadgeTone::Danger,
            Self::Unknown(raw) => badge_tone(raw),
        }
    }
}

impl BadgeToned for MonitorStatus {
    fn tone(&self) -> BadgeTone {
        match self {
            Self::Active => BadgeTone::Success,
            Self::Inactive => BadgeTone::Neutral,
            Self::Unknown(raw) => badge_tone(raw),
        }
    }
}

impl BadgeToned for ReportStatus {
    fn tone(&self) -> BadgeTone {
        match self {
            Self::Published => BadgeTone::Success,
            Self::Final => BadgeTone::Info,
            Self::Draft => BadgeTone::Warning,
            Self::Unknown(raw) => badge_tone(raw),
        }
    }
}

/// Tone for a raw status word from any entity, case-insensitive.
#[must_use]
pub fn badge_tone(raw: &str) -> BadgeTone {
    let word = raw.trim().to_ascii_lowercase().replace(['_', '-'], " ");
    match word.as_str() {
        "active" | "completed" | "compliant" | "normal" | "good" | "published" | "low"
        | "medium low" => BadgeTone::Success,
        "warning" | "pending" | "in progress" | "under review" | "partially compliant"
        | "medium" | "draft" => BadgeTone::Warning,
        "critical" | "high" | "medium high" | "non compliant" | "failed" | "error" => {
            BadgeTone::Danger
        }
        "info" | "final" | "new" => BadgeTone::Info,
        _ => BadgeTone::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_alert_is_total() {
        for raw in ["Critical", "warning", "NORMAL", "Good", "", "Elevated", "💥"] {
            assert!(DisplayCategory::ALL.contains(&classify_alert_str(raw)));
        }
        assert_eq!(classify_alert_str("Critical"), DisplayCategory::NonCompliant);
        assert_eq!(classify_alert_str("Warning"), DisplayCategory::PartiallyCompliant);
        assert_eq!(classify_alert_str("Normal"), DisplayCategory::Compliant);
        assert_eq!(classify_alert_str("Good"), DisplayCategory::UnderReview);
        assert_eq!(classify_alert_str("bogus"), DisplayCategory::UnderReview);
    }

    #[test]
    fn alert_labels_are_case_sensitive() {
        assert_eq!(classify_alert_str("warning"), DisplayCategory::UnderReview);
        assert_eq!(classify_alert_str("CRITICAL"), DisplayCategory::UnderReview);
        assert_eq!(classify_alert_str(" Normal"), DisplayCategory::UnderReview);
        assert_eq!(AlertLevel::parse("warning"), AlertLevel::Unknown("warning".into()));
        assert_eq!(AlertLevel::parse_lenient("warning"), AlertLevel::Warning);
        assert_eq!(AlertLevel::parse_lenient(" CRITICAL "), AlertLevel::Critical);
    }

    #[test]
    fn classify_risk_boundaries() {
        assert_eq!(classify_risk(75.0), RiskBand::High);
        assert_eq!(classify_risk(74.999), RiskBand::Medium);
        assert_eq!(classify_risk(50.0), RiskBand::Medium);
        assert_eq!(classify_risk(49.999), RiskBand::Low);
        assert_eq!(classify_risk(f64::NAN), RiskBand::Low);
    }

    #[test]
    fn classify_risk_is_monotonic() {
        let mut previous = classify_risk(0.0);
        for step in 0..=1000 {
            let band = classify_risk(f64::from(step) / 10.0);
            assert!(band <= previous, "band went down at {step}");
            previous = band;
        }
    }

    #[test]
    fn five_band_uses_twenty_point_steps() {
        let scheme = RiskScheme::FiveBand;
        assert_eq!(scheme.classify(80.0), RiskBand::High);
        assert_eq!(scheme.classify(79.9), RiskBand::MediumHigh);
        assert_eq!(scheme.classify(40.0), RiskBand::Medium);
        assert_eq!(scheme.classify(20.0), RiskBand::MediumLow);
        assert_eq!(scheme.classify(19.9), RiskBand::Low);
        assert_eq!(scheme.thresholds().bands().len(), 5);
    }

    #[test]
    fn custom_tables_are_validated() {
        assert!(RiskThresholds::new(
            vec![(50.0, RiskBand::High), (60.0, RiskBand::Medium)],
            RiskBand::Low
        )
        .is_err());
        assert!(RiskThresholds::new(vec![(120.0, RiskBand::High)], RiskBand::Low).is_err());
        let table = RiskThresholds::new(vec![(90.0, RiskBand::High)], RiskBand::Medium).unwrap();
        assert_eq!(RiskScheme::Custom(table).classify(10.0), RiskBand::Medium);
    }

    #[test]
    fn badge_tones() {
        assert_eq!(AlertLevel::Critical.tone(), BadgeTone::Danger);
        assert_eq!(
            AssessmentStatus::Unknown("High Risk".into()).tone(),
            BadgeTone::Danger
        );
        assert_eq!(RiskBand::Medium.tone().marker(), "!");
    }

    #[test]
    fn raw_status_words_map_to_tones() {
        assert_eq!(badge_tone("In_Progress"), BadgeTone::Warning);
        assert_eq!(badge_tone(" NON-COMPLIANT "), BadgeTone::Danger);
        assert_eq!(badge_tone("Published"), BadgeTone::Success);
        assert_eq!(badge_tone("final"), BadgeTone::Info);
        assert_eq!(badge_tone("mystery"), BadgeTone::Neutral);
    }
}
