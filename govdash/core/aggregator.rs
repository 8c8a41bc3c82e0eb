//! Reductions from entity collections to chart-ready summaries.

use std::hash::Hash;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    classifier::{classify_alert, DisplayCategory, RiskBand, RiskScheme},
    model::{AlertLevel, ChartData, ComplianceMonitor, Report, ReportType, RiskAssessment},
};

/// Counts monitors per display category. All four categories are always present.
#[must_use]
pub fn count_by_category(monitors: &[ComplianceMonitor]) -> IndexMap<DisplayCategory, usize> {
    let mut counts: IndexMap<DisplayCategory, usize> =
        DisplayCategory::ALL.iter().map(|c| (*c, 0)).collect();
    for monitor in monitors {
        *counts.entry(classify_alert(&monitor.alert_level)).or_insert(0) += 1;
    }
    counts
}

/// `round(count / total × 100)`, or 0 when `total` is 0.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentage_of(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u32
}

/// Partitions records by key, keeping first-seen key order and input order within groups.
pub fn group_by<T, K, F>(records: &[T], key_fn: F) -> IndexMap<K, Vec<&T>>
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut groups: IndexMap<K, Vec<&T>> = IndexMap::new();
    for record in records {
        groups.entry(key_fn(record)).or_default().push(record);
    }
    groups
}

/// Monitors grouped by `model_or_system`.
#[must_use]
pub fn group_by_model(monitors: &[ComplianceMonitor]) -> IndexMap<String, Vec<&ComplianceMonitor>> {
    group_by(monitors, |monitor| monitor.model_or_system.clone())
}

/// Worst condition across a set of monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    /// At least one Critical monitor.
    Critical,
    /// No Critical, at least one Warning.
    Warning,
    /// More Good than Normal.
    Good,
    /// Otherwise.
    Normal,
    /// No monitors.
    Unknown,
}

impl OverallStatus {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::Warning => "Warning",
            Self::Good => "Good",
            Self::Normal => "Normal",
            Self::Unknown => "Unknown",
        }
    }
}

/// Compliance roll-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceStats {
    /// Priority-ordered worst status.
    pub overall_status: OverallStatus,
    /// Percentage of Normal or Good monitors.
    pub compliance_rate: u32,
    /// Critical monitors.
    pub critical_alerts: usize,
    /// Warning monitors.
    pub warning_alerts: usize,
    /// Normal monitors.
    pub normal: usize,
    /// Good monitors.
    pub good: usize,
}

/// Computes overall status and compliance rate. Empty input yields `Unknown` and zeros.
#[must_use]
pub fn compute_compliance_stats(monitors: &[ComplianceMonitor]) -> ComplianceStats {
    let count = |level: AlertLevel| {
        monitors
            .iter()
            .filter(|monitor| monitor.alert_level == level)
            .count()
    };
    let critical_alerts = count(AlertLevel::Critical);
    let warning_alerts = count(AlertLevel::Warning);
    let normal = count(AlertLevel::Normal);
    let good = count(AlertLevel::Good);

    let overall_status = if monitors.is_empty() {
        OverallStatus::Unknown
    } else if critical_alerts > 0 {
        OverallStatus::Critical
    } else if warning_alerts > 0 {
        OverallStatus::Warning
    } else if good > normal {
        OverallStatus::Good
    } else {
        OverallStatus::Normal
    };

    ComplianceStats {
        overall_status,
        compliance_rate: percentage_of(normal + good, monitors.len()),
        critical_alerts,
        warning_alerts,
        normal,
        good,
    }
}

/// Assessments per band of `scheme`, every band present, highest first.
#[must_use]
pub fn risk_distribution(
    assessments: &[RiskAssessment],
    scheme: &RiskScheme,
) -> IndexMap<RiskBand, usize> {
    let table = scheme.thresholds();
    let mut counts: IndexMap<RiskBand, usize> = table.bands().into_iter().map(|b| (b, 0)).collect();
    for assessment in assessments {
        *counts.entry(table.classify(assessment.risk_score)).or_insert(0) += 1;
    }
    counts
}

/// Mean risk score, or 0 for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_risk_score(assessments: &[RiskAssessment]) -> f64 {
    if assessments.is_empty() {
        return 0.0;
    }
    assessments.iter().map(|a| a.risk_score).sum::<f64>() / assessments.len() as f64
}

/// Reports per known type; unknown types are counted under their raw value after the known ones.
#[must_use]
pub fn count_by_report_type(reports: &[Report]) -> IndexMap<ReportType, usize> {
    let mut counts: IndexMap<ReportType, usize> =
        ReportType::ALL.iter().map(|t| (t.clone(), 0)).collect();
    for report in reports {
        *counts.entry(report.report_type.clone()).or_insert(0) += 1;
    }
    counts
}

/// Distinct, sorted, non-empty model names from monitors and assessments.
#[must_use]
pub fn distinct_models(monitors: &[ComplianceMonitor], assessments: &[RiskAssessment]) -> Vec<String> {
    let mut models: Vec<String> = monitors
        .iter()
        .map(|m| m.model_or_system.trim())
        .chain(assessments.iter().map(|a| a.model_name.trim()))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    models.sort_unstable();
    models.dedup();
    models
}

/// Labels with counts and derived percentages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSummary {
    /// Category labels.
    pub labels: Vec<String>,
    /// Count per label.
    pub counts: Vec<usize>,
    /// Share per label, derived from `counts`.
    pub percentages: Vec<u32>,
}

impl ChartSummary {
    /// Builds a summary from ordered `(label, count)` pairs.
    pub fn from_counts<I, L>(counts: I) -> Self
    where
        I: IntoIterator<Item = (L, usize)>,
        L: Into<String>,
    {
        let (labels, counts): (Vec<String>, Vec<usize>) =
            counts.into_iter().map(|(l, c)| (l.into(), c)).unzip();
        let mut summary = Self {
            labels,
            counts,
            percentages: Vec::new(),
        };
        summary.recompute();
        summary
    }

    /// Monitor counts per display category.
    #[must_use]
    pub fn compliance(monitors: &[ComplianceMonitor]) -> Self {
        Self::from_counts(
            count_by_category(monitors)
                .into_iter()
                .map(|(category, count)| (category.label(), count)),
        )
    }

    /// Assessment counts per band.
    #[must_use]
    pub fn risk(assessments: &[RiskAssessment], scheme: &RiskScheme) -> Self {
        Self::from_counts(
            risk_distribution(assessments, scheme)
                .into_iter()
                .map(|(band, count)| (band.label(), count)),
        )
    }

    /// Summary of a backend chart's first dataset. Non-integral values are rounded.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_chart(chart: &ChartData) -> Self {
        let data = chart
            .datasets
            .first()
            .map(|set| set.data.as_slice())
            .unwrap_or_default();
        Self::from_counts(
            chart
                .labels
                .iter()
                .zip(data.iter().chain(std::iter::repeat(&0.0)))
                .map(|(label, value)| (label.clone(), value.max(0.0).round() as usize)),
        )
    }

    /// Re-derives percentages from counts.
    pub fn recompute(&mut self) {
        let total = self.total();
        self.percentages = self
            .counts
            .iter()
            .map(|count| percentage_of(*count, total))
            .collect();
    }

    /// Sum of counts.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Whether every count is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssessmentStatus, MonitorStatus};

    fn monitor(id: i64, model: &str, level: &str) -> ComplianceMonitor {
        ComplianceMonitor {
            id,
            name: format!("monitor-{id}"),
            description: String::new(),
            model_or_system: model.into(),
            threshold_value: 0.8,
            current_value: 0.5,
            alert_level: AlertLevel::parse(level),
            status: MonitorStatus::Active,
            last_checked: None,
            created_at: None,
        }
    }

    fn assessment(id: i64, score: f64) -> RiskAssessment {
        RiskAssessment {
            id,
            title: format!("assessment-{id}"),
            model_name: "scorer".into(),
            documentation: String::new(),
            findings: String::new(),
            recommendations: String::new(),
            risk_score: score,
            status: AssessmentStatus::Completed,
            created_at: None,
        }
    }

    fn scenario() -> Vec<ComplianceMonitor> {
        vec![
            monitor(1, "a", "Normal"),
            monitor(2, "b", "Critical"),
            monitor(3, "a", "Warning"),
            monitor(4, "c", "Good"),
        ]
    }

    #[test]
    fn empty_counts_have_all_categories() {
        let counts = count_by_category(&[]);
        assert_eq!(counts.len(), 4);
        assert_eq!(counts.values().sum::<usize>(), 0);
    }

    #[test]
    fn counts_sum_to_input_length() {
        let mut monitors = scenario();
        monitors.push(monitor(5, "d", "Mystery"));
        let counts = count_by_category(&monitors);
        assert_eq!(counts.values().sum::<usize>(), monitors.len());
        assert_eq!(counts[&DisplayCategory::UnderReview], 2);
    }

    #[test]
    fn percentage_handles_zero_total() {
        assert_eq!(percentage_of(0, 0), 0);
        assert_eq!(percentage_of(1, 3), 33);
        assert_eq!(percentage_of(2, 3), 67);
    }

    #[test]
    fn empty_stats_are_unknown() {
        let stats = compute_compliance_stats(&[]);
        assert_eq!(stats.overall_status, OverallStatus::Unknown);
        assert_eq!(stats.compliance_rate, 0);
        assert_eq!(stats.critical_alerts, 0);
        assert_eq!(stats.warning_alerts, 0);
    }

    #[test]
    fn four_monitor_scenario() {
        let stats = compute_compliance_stats(&scenario());
        assert_eq!(stats.compliance_rate, 50);
        assert_eq!(stats.critical_alerts, 1);
        assert_eq!(stats.warning_alerts, 1);
        assert_eq!(stats.overall_status, OverallStatus::Critical);
    }

    #[test]
    fn critical_dominates_and_good_majority_wins() {
        let mut monitors: Vec<_> = (0..20).map(|i| monitor(i, "m", "Good")).collect();
        assert_eq!(
            compute_compliance_stats(&monitors).overall_status,
            OverallStatus::Good
        );
        monitors.push(monitor(99, "m", "Critical"));
        assert_eq!(
            compute_compliance_stats(&monitors).overall_status,
            OverallStatus::Critical
        );
        let tie = [monitor(1, "m", "Good"), monitor(2, "m", "Normal")];
        assert_eq!(compute_compliance_stats(&tie).overall_status, OverallStatus::Normal);
    }

    #[test]
    fn group_by_preserves_order() {
        let monitors = scenario();
        let groups = group_by_model(&monitors);
        let keys: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        let ids: Vec<_> = groups["a"].iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn summary_percentages_survive_serialization() {
        let summary = ChartSummary::compliance(&scenario());
        let encoded = serde_json::to_string(&summary).unwrap();
        let mut decoded: ChartSummary = serde_json::from_str(&encoded).unwrap();
        let before = decoded.percentages.clone();
        decoded.recompute();
        assert_eq!(decoded.percentages, before);
        assert_eq!(decoded, summary);
    }

    #[test]
    fn three_band_risk_chart_boundaries() {
        let assessments = [
            assessment(1, 75.0),
            assessment(2, 74.999),
            assessment(3, 50.0),
            assessment(4, 49.999),
        ];
        let summary = ChartSummary::risk(&assessments, &RiskScheme::ThreeBand);
        assert_eq!(summary.labels, vec!["High", "Medium", "Low"]);
        assert_eq!(summary.counts, vec![1, 2, 1]);
        assert_eq!(summary.percentages, vec![25, 50, 25]);

        let empty = ChartSummary::risk(&[], &RiskScheme::ThreeBand);
        assert_eq!(empty.counts, vec![0, 0, 0]);
    }

    #[test]
    fn chart_summary_from_backend_chart() {
        let chart: ChartData = serde_json::from_value(serde_json::json!({
            "labels": ["Compliant", "Warning", "Critical"],
            "datasets": [{ "data": [6.0, 3.0], "backgroundColor": ["#0f0", "#ff0", "#f00"] }]
        }))
        .unwrap();
        let summary = ChartSummary::from_chart(&chart);
        assert_eq!(summary.counts, vec![6, 3, 0]);
        assert_eq!(summary.percentages, vec![67, 33, 0]);
    }
}
