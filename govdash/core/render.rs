//! Stateless text renderers. Inputs are already aggregated; nothing here fetches.
//!
//! Fractions from the backend (thresholds, current values, compliance rate)
//! are multiplied by 100 exactly once, here, and shown with one decimal.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::{
    aggregator::{ChartSummary, ComplianceStats},
    classifier::{classify_alert, classify_risk, BadgeToned},
    model::{Activity, ComplianceMonitor, DashboardMetrics, Policy, Report, RiskAssessment},
};

/// `0.8` → `80.0%`.
#[must_use]
pub fn format_fraction(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Signed delta with one decimal, e.g. `+2.5%`.
#[must_use]
pub fn format_delta(delta: f64) -> String {
    if delta > 0.0 {
        format!("+{delta:.1}%")
    } else {
        format!("{delta:.1}%")
    }
}

/// Local-time-free timestamp, or a placeholder.
#[must_use]
pub fn format_timestamp(at: Option<DateTime<Utc>>, missing: &str) -> String {
    at.map_or_else(
        || missing.to_string(),
        |at| at.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

/// `[x Critical]`-style badge for any status with a tone.
#[must_use]
pub fn badge(status: &(impl BadgeToned + std::fmt::Display)) -> String {
    format!("[{} {}]", status.tone().marker(), status)
}

/// Error banner line, empty when there is no error.
#[must_use]
pub fn banner(error: Option<&str>) -> String {
    error.map_or_else(String::new, |message| format!("!! {message}\n"))
}

/// Column-aligned plain-text table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    empty: String,
}

impl Table {
    /// Table with the given column headers.
    #[must_use]
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            empty: "No records found".into(),
        }
    }

    /// Text shown instead of rows when there are none.
    #[must_use]
    pub fn empty_text(mut self, text: impl Into<String>) -> Self {
        self.empty = text.into();
        self
    }

    /// Appends a row; missing cells render blank.
    pub fn push<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the table.
    #[must_use]
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (index, cell) in row.iter().enumerate() {
                let width = cell.chars().count();
                match widths.get_mut(index) {
                    Some(current) => *current = (*current).max(width),
                    None => widths.push(width),
                }
            }
        }
        let line = |cells: &[String]| {
            widths
                .iter()
                .enumerate()
                .map(|(index, width)| {
                    let cell = cells.get(index).map_or("", String::as_str);
                    format!("{cell:<width$}")
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };
        let mut out = String::new();
        let _ = writeln!(out, "{}", line(&self.headers));
        let _ = writeln!(
            out,
            "{}",
            widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("  ")
        );
        if self.rows.is_empty() {
            let _ = writeln!(out, "{}", self.empty);
        }
        for row in &self.rows {
            let _ = writeln!(out, "{}", line(row));
        }
        out
    }
}

/// The four headline cards.
#[must_use]
pub fn metric_cards(metrics: &DashboardMetrics) -> String {
    let cards = [
        (
            "Governance Policies",
            metrics.policy_count.to_string(),
            metrics.deltas.policy_count,
        ),
        (
            "Avg. Risk Score",
            format!("{:.1}", metrics.avg_risk_score),
            metrics.deltas.avg_risk_score,
        ),
        (
            "Compliance Rate",
            format_fraction(metrics.compliance_rate),
            metrics.deltas.compliance_rate * 100.0,
        ),
        (
            "Active Monitors",
            metrics.active_monitors.to_string(),
            metrics.deltas.active_monitors,
        ),
    ];
    let mut out = String::new();
    for (title, value, delta) in cards {
        let _ = writeln!(out, "{title:<20} {value:>10}  ({})", format_delta(delta));
    }
    out
}

/// Horizontal bar chart with counts and percentages.
#[must_use]
pub fn bar_chart(title: &str, summary: &ChartSummary, width: usize) -> String {
    let mut out = format!("{title}\n");
    if summary.is_empty() {
        out.push_str("  (no data)\n");
        return out;
    }
    let label_width = summary
        .labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);
    for ((label, count), percent) in summary
        .labels
        .iter()
        .zip(&summary.counts)
        .zip(&summary.percentages)
    {
        let filled = (width * *percent as usize) / 100;
        let _ = writeln!(
            out,
            "  {label:<label_width$} |{:<width$}| {count:>3} ({percent}%)",
            "#".repeat(filled)
        );
    }
    out
}

/// Overall compliance summary line.
#[must_use]
pub fn compliance_summary(stats: &ComplianceStats) -> String {
    format!(
        "Overall: {}  Compliance rate: {}%  Critical: {}  Warning: {}",
        stats.overall_status.label(),
        stats.compliance_rate,
        stats.critical_alerts,
        stats.warning_alerts
    )
}

/// Policy table.
#[must_use]
pub fn policies_table(policies: &[Policy]) -> Table {
    let mut table = Table::new(["ID", "Title", "Category", "Status", "Updated"])
        .empty_text("No policies found");
    for policy in policies {
        table.push([
            policy.id.to_string(),
            policy.title.clone(),
            policy.category.to_string(),
            badge(&policy.status),
            format_timestamp(policy.updated_at.or(policy.created_at), "-"),
        ]);
    }
    table
}

/// Risk assessment table with the High/Medium/Low band.
#[must_use]
pub fn assessments_table(assessments: &[RiskAssessment]) -> Table {
    let mut table = Table::new(["ID", "Model", "Score", "Risk", "Status", "Created"])
        .empty_text("No risk assessments found");
    for assessment in assessments {
        table.push([
            assessment.id.to_string(),
            assessment.model_name.clone(),
            format!("{:.1}", assessment.risk_score),
            badge(&classify_risk(assessment.risk_score)),
            badge(&assessment.status),
            format_timestamp(assessment.created_at, "-"),
        ]);
    }
    table
}

/// Compliance monitor table.
#[must_use]
pub fn monitors_table(monitors: &[ComplianceMonitor]) -> Table {
    let mut table = Table::new([
        "ID",
        "Monitor Name",
        "Model/System",
        "Current Value",
        "Threshold",
        "Alert Level",
        "Status",
        "Last Checked",
    ])
    .empty_text("No compliance monitors found");
    for monitor in monitors {
        table.push([
            monitor.id.to_string(),
            monitor.name.clone(),
            monitor.model_or_system.clone(),
            format_fraction(monitor.current_value),
            format_fraction(monitor.threshold_value),
            badge(&classify_alert(&monitor.alert_level)),
            badge(&monitor.status),
            format_timestamp(monitor.last_checked, "Not checked yet"),
        ]);
    }
    table
}

/// Report table with display titles for report types.
#[must_use]
pub fn reports_table(reports: &[Report]) -> Table {
    let mut table =
        Table::new(["ID", "Title", "Type", "Status", "Created"]).empty_text("No reports found");
    for report in reports {
        table.push([
            report.id.to_string(),
            report.title.clone(),
            report.report_type.title(),
            badge(&report.status),
            format_timestamp(report.created_at, "-"),
        ]);
    }
    table
}

/// Recent activity list.
#[must_use]
pub fn activities_list(activities: &[Activity]) -> String {
    if activities.is_empty() {
        return "No recent activities\n".into();
    }
    let mut out = String::new();
    for activity in activities {
        let _ = writeln!(
            out,
            "{}  {:<8} {}{}",
            format_timestamp(activity.created_at, "-"),
            activity.activity_type,
            activity.description,
            if activity.actor.is_empty() {
                String::new()
            } else {
                format!(" ({})", activity.actor)
            }
        );
    }
    out
}
