use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use govdash_core::{
    config::DashboardConfig,
    model::{
        AlertLevel, MonitorStatus, NotificationProvider, PolicyCategory, PolicyStatus, RecordId,
        ReportType, Urgency, MONITOR_PRESETS,
    },
    render, ApiClient, ComplianceView, DashboardTelemetry, DashboardView, GovernanceView,
    NotificationsView, ReportsView, RiskView, ViewContext,
};
use serde::Serialize;
use serde_json::json;
use shared_event_bus::{EventPublisher, FileEventPublisher, MemoryEventBus};
use shared_logging::LogLevel;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "govdash", version, about = "AI governance dashboard")]
struct Cli {
    /// TOML configuration file; environment variables apply on top.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the API base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Appends telemetry events to this JSON-lines file.
    #[arg(long, global = true)]
    event_log: Option<PathBuf>,
    /// Prints telemetry events recorded during the command. Events written to
    /// `--event-log` are not retained in memory, so the two flags are exclusive.
    #[arg(long, global = true, conflicts_with = "event_log")]
    show_events: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Headline metrics, charts, and recent activity.
    Dashboard,
    /// Governance policies.
    #[command(subcommand)]
    Policies(PolicyCommand),
    /// Risk assessments.
    #[command(subcommand)]
    Risks(RiskCommand),
    /// Compliance monitors.
    #[command(subcommand)]
    Monitors(MonitorCommand),
    /// Generated reports.
    #[command(subcommand)]
    Reports(ReportCommand),
    /// Sends a notification.
    Notify(NotifyArgs),
}

#[derive(Subcommand, Debug)]
enum PolicyCommand {
    /// Lists policies, optionally grouped by category.
    List {
        #[arg(long)]
        grouped: bool,
    },
    /// Shows one policy.
    Show { id: RecordId },
    /// Creates a policy.
    Create(PolicyArgs),
    /// Replaces fields of an existing policy.
    Update {
        id: RecordId,
        #[command(flatten)]
        fields: PolicyPatch,
    },
}

#[derive(Args, Debug)]
struct PolicyArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    category: String,
    #[arg(long)]
    description: String,
    #[arg(long, default_value = "")]
    content: String,
    #[arg(long, default_value = "draft")]
    status: String,
}

#[derive(Args, Debug)]
struct PolicyPatch {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    status: Option<String>,
}

#[derive(Subcommand, Debug)]
enum RiskCommand {
    /// Lists assessments with their risk band and the distribution chart.
    List,
    /// Shows one assessment.
    Show { id: RecordId },
    /// Requests a new assessment.
    Create {
        #[arg(long)]
        model_name: String,
        #[arg(long)]
        documentation: String,
    },
}

#[derive(Subcommand, Debug)]
enum MonitorCommand {
    /// Lists monitors, optionally for one model.
    List {
        #[arg(long)]
        model: Option<String>,
    },
    /// Shows one monitor.
    Show { id: RecordId },
    /// Lists the monitor presets.
    Presets,
    /// Creates a monitor; thresholds are fractions in 0..=1.
    Create(MonitorArgs),
    /// Updates a monitor's measured value, threshold, or status.
    Update {
        id: RecordId,
        #[arg(long)]
        current_value: Option<f64>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        alert_level: Option<String>,
    },
    /// Re-renders the monitor table on every poll until interrupted.
    Watch {
        #[arg(long)]
        model: Option<String>,
        /// Stops after this many refreshes.
        #[arg(long)]
        iterations: Option<usize>,
    },
}

#[derive(Args, Debug)]
struct MonitorArgs {
    /// Preset name; explicit flags override its fields.
    #[arg(long)]
    preset: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    model: String,
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Lists reports and counts per type.
    List,
    /// Shows one report.
    Show { id: RecordId },
    /// Generates a report.
    Create {
        #[arg(long, default_value = "governance_summary")]
        report_type: String,
    },
}

#[derive(Args, Debug)]
struct NotifyArgs {
    #[arg(long)]
    recipient: String,
    /// `sms` or `console`; defaults to the configured provider.
    #[arg(long)]
    provider: Option<String>,
    #[arg(long, conflicts_with_all = ["monitor", "assessment", "policy"])]
    message: Option<String>,
    /// Compliance alert for this monitor.
    #[arg(long)]
    monitor: Option<RecordId>,
    /// Risk notice for this assessment.
    #[arg(long)]
    assessment: Option<RecordId>,
    /// Update announcement for this policy.
    #[arg(long)]
    policy: Option<RecordId>,
    #[arg(long)]
    urgency: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = Runtime::new()?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::from_env()?,
    };
    if let Some(base_url) = cli.base_url.clone() {
        config.api.base_url = base_url;
        config.validate()?;
    }

    let memory_bus = Arc::new(MemoryEventBus::new(config.telemetry.event_capacity));
    let publisher: Arc<dyn EventPublisher> = match &cli.event_log {
        Some(path) => Arc::new(FileEventPublisher::new(path)?),
        None => memory_bus.clone(),
    };
    let telemetry = DashboardTelemetry::builder("govdash")
        .settings(&config.telemetry)
        .event_publisher(publisher)
        .build()?;
    let client = ApiClient::from_config(&config, telemetry.clone())?;
    let ctx = ViewContext::from_config(&config, client, telemetry.clone());

    telemetry
        .record(
            LogLevel::Debug,
            "cli.started",
            json!({ "base_url": config.api.base_url, "command": format!("{:?}", cli.command) }),
        )
        .await;

    let outcome = match cli.command {
        Commands::Dashboard => dashboard(&ctx).await,
        Commands::Policies(command) => policies(&ctx, command).await,
        Commands::Risks(command) => risks(&ctx, command).await,
        Commands::Monitors(command) => monitors(&ctx, command).await,
        Commands::Reports(command) => reports(&ctx, command).await,
        Commands::Notify(args) => notify(&ctx, args).await,
    };

    if cli.show_events {
        for event in memory_bus.snapshot() {
            println!(
                "{} {} {} {}",
                event.timestamp.to_rfc3339(),
                event.source,
                event.topic,
                event.payload
            );
        }
    }
    outcome
}

async fn dashboard(ctx: &ViewContext) -> Result<()> {
    let view = DashboardView::new(ctx);
    view.refresh().await;
    let state = view.state();
    print!("{}", render::banner(state.error()));
    let Some(snapshot) = state.data() else {
        return Ok(());
    };
    print!("{}", render::metric_cards(&snapshot.metrics));
    println!();
    let title = if snapshot.compliance_derived {
        "Compliance Status (derived from monitors)"
    } else {
        "Compliance Status"
    };
    print!("{}", render::bar_chart(title, &snapshot.compliance, 30));
    print!("{}", render::bar_chart("Risk Distribution", &snapshot.risk, 30));
    println!();
    println!("Recent Activities");
    print!("{}", render::activities_list(&snapshot.activities));
    Ok(())
}

async fn policies(ctx: &ViewContext, command: PolicyCommand) -> Result<()> {
    let mut view = GovernanceView::new(ctx);
    match command {
        PolicyCommand::List { grouped } => {
            view.mount().await;
            let state = view.state();
            print!("{}", render::banner(state.error()));
            if grouped {
                for (category, policies) in view.by_category() {
                    println!("== {category} ({})", policies.len());
                    print!("{}", render::policies_table(&policies).render());
                }
            } else {
                let policies = state.data().cloned().unwrap_or_default();
                print!("{}", render::policies_table(&policies).render());
            }
        }
        PolicyCommand::Show { id } => print_json(&view.show(id).await?)?,
        PolicyCommand::Create(args) => {
            let form = view.create_form();
            form.open();
            let fields = form.form_mut();
            fields.title = args.title;
            fields.category = Some(PolicyCategory::parse(&args.category));
            fields.description = args.description;
            fields.content = args.content;
            fields.status = PolicyStatus::parse(&args.status);
            let created = view.submit_create().await?;
            println!("created policy {}", created.id);
        }
        PolicyCommand::Update { id, fields: patch } => {
            let policy = view.show(id).await?;
            view.begin_edit(&policy);
            let fields = view.edit_form().form_mut();
            if let Some(title) = patch.title {
                fields.title = title;
            }
            if let Some(category) = patch.category {
                fields.category = Some(PolicyCategory::parse(&category));
            }
            if let Some(description) = patch.description {
                fields.description = description;
            }
            if let Some(content) = patch.content {
                fields.content = content;
            }
            if let Some(status) = patch.status {
                fields.status = PolicyStatus::parse(&status);
            }
            view.submit_edit().await?;
            println!("updated policy {id}");
        }
    }
    Ok(())
}

async fn risks(ctx: &ViewContext, command: RiskCommand) -> Result<()> {
    let mut view = RiskView::new(ctx);
    match command {
        RiskCommand::List => {
            view.mount().await;
            let state = view.state();
            print!("{}", render::banner(state.error()));
            let assessments = state.data().cloned().unwrap_or_default();
            print!("{}", render::assessments_table(&assessments).render());
            println!();
            println!("Average risk score: {:.1}", view.average_score());
            print!(
                "{}",
                render::bar_chart(
                    &format!("Risk Distribution ({})", ctx.risk_scheme.label()),
                    &view.distribution(),
                    30
                )
            );
        }
        RiskCommand::Show { id } => print_json(&view.show(id).await?)?,
        RiskCommand::Create {
            model_name,
            documentation,
        } => {
            let form = view.create_form();
            form.open();
            form.form_mut().model_name = model_name;
            form.form_mut().documentation = documentation;
            let created = view.submit_create().await?;
            println!("requested risk assessment {}", created.id);
        }
    }
    Ok(())
}

async fn monitors(ctx: &ViewContext, command: MonitorCommand) -> Result<()> {
    let mut view = ComplianceView::new(ctx);
    match command {
        MonitorCommand::List { model } => {
            view.refresh().await;
            view.set_model_filter(model);
            print_monitors(&view);
        }
        MonitorCommand::Show { id } => print_json(&view.show(id).await?)?,
        MonitorCommand::Presets => {
            for preset in &MONITOR_PRESETS {
                println!(
                    "{:<26} {:>6}  {}",
                    preset.name,
                    render::format_fraction(preset.threshold),
                    preset.description
                );
            }
        }
        MonitorCommand::Create(args) => {
            let form = view.create_form();
            form.open();
            let fields = form.form_mut();
            if let Some(name) = &args.preset {
                let presets = &MONITOR_PRESETS;
                let preset = presets
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(name))
                    .ok_or_else(|| anyhow!("unknown preset '{name}'"))?;
                fields.apply_preset(preset);
            }
            fields.model_or_system = args.model;
            if let Some(name) = args.name {
                fields.name = name;
            }
            if let Some(description) = args.description {
                fields.description = description;
            }
            if let Some(threshold) = args.threshold {
                fields.threshold_value = threshold;
            }
            let created = view.submit_create().await?;
            println!("created monitor {}", created.id);
        }
        MonitorCommand::Update {
            id,
            current_value,
            threshold,
            status,
            alert_level,
        } => {
            let monitor = view.show(id).await?;
            view.begin_edit(&monitor);
            let fields = view.edit_form().form_mut();
            if let Some(value) = current_value {
                fields.current_value = value;
            }
            if let Some(value) = threshold {
                fields.threshold_value = value;
            }
            if let Some(status) = status {
                fields.status = MonitorStatus::parse(&status);
            }
            if let Some(level) = alert_level {
                fields.alert_level = AlertLevel::parse_lenient(&level);
            }
            view.submit_edit().await?;
            println!("updated monitor {id}");
        }
        MonitorCommand::Watch { model, iterations } => {
            let period = ctx
                .polling
                .compliance()
                .context("compliance polling is disabled in the configuration")?;
            view.set_model_filter(model);
            view.mount().await;
            print_monitors(&view);
            let mut rendered = 1;
            let mut seen = view.state().loads();
            while iterations.map_or(true, |limit| rendered < limit) {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    () = tokio::time::sleep(period + Duration::from_millis(250)) => {}
                }
                let loads = view.state().loads();
                if loads != seen {
                    seen = loads;
                    rendered += 1;
                    println!();
                    print_monitors(&view);
                }
            }
            view.unmount();
        }
    }
    Ok(())
}

fn print_monitors(view: &ComplianceView) {
    let state = view.state();
    print!("{}", render::banner(state.error()));
    if let Some(model) = view.model_filter() {
        println!("Model: {model}");
    }
    println!("{}", render::compliance_summary(&view.stats()));
    print!("{}", render::monitors_table(&view.visible_monitors()).render());
    print!("{}", render::bar_chart("Compliance Status", &view.chart(), 30));
    println!(
        "Last updated: {}",
        render::format_timestamp(state.last_updated(), "never")
    );
}

async fn reports(ctx: &ViewContext, command: ReportCommand) -> Result<()> {
    let mut view = ReportsView::new(ctx);
    match command {
        ReportCommand::List => {
            view.mount().await;
            let state = view.state();
            print!("{}", render::banner(state.error()));
            let reports = state.data().cloned().unwrap_or_default();
            print!("{}", render::reports_table(&reports).render());
            print!("{}", render::bar_chart("Reports by Type", &view.chart(), 30));
        }
        ReportCommand::Show { id } => print_json(&view.show(id).await?)?,
        ReportCommand::Create { report_type } => {
            let form = view.create_form();
            form.open();
            form.form_mut().report_type = ReportType::parse(&report_type);
            let created = view.submit_create().await?;
            println!("generated report {}", created.id);
        }
    }
    Ok(())
}

async fn notify(ctx: &ViewContext, args: NotifyArgs) -> Result<()> {
    let mut view = NotificationsView::new(ctx);
    if let Some(raw) = &args.provider {
        view.compose().form_mut().provider = NotificationProvider::parse(raw)
            .ok_or_else(|| anyhow!("unknown provider '{raw}' (expected sms or console)"))?;
    }

    if let Some(id) = args.monitor {
        let monitor = ctx.client.get_compliance_monitor(id).await?;
        view.alert_for_monitor(&args.recipient, &monitor);
    } else if let Some(id) = args.assessment {
        let assessment = ctx.client.get_risk_assessment(id).await?;
        view.alert_for_assessment(&args.recipient, &assessment);
    } else if let Some(id) = args.policy {
        let policy = ctx.client.get_policy(id).await?;
        view.announce_policy(&args.recipient, &policy);
    } else {
        let Some(message) = args.message else {
            bail!("one of --message, --monitor, --assessment, or --policy is required");
        };
        let compose = view.compose();
        compose.open();
        compose.form_mut().recipient = args.recipient;
        compose.form_mut().message = message;
    }

    if let Some(raw) = &args.urgency {
        view.compose().form_mut().urgency = Some(
            Urgency::parse(raw).ok_or_else(|| anyhow!("unknown urgency '{raw}'"))?,
        );
    }

    let receipt = view.send().await?;
    println!("notification sent");
    print_json(&receipt)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn policy_create_requires_description() {
        let err = Cli::try_parse_from([
            "govdash", "policies", "create", "--title", "Consent", "--category", "Data Privacy",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "govdash",
            "policies",
            "create",
            "--title",
            "Consent",
            "--category",
            "Data Privacy",
            "--description",
            "Collect consent before training",
        ])
        .unwrap();
        match cli.command {
            Commands::Policies(PolicyCommand::Create(args)) => {
                assert_eq!(args.description, "Collect consent before training");
                assert_eq!(args.status, "draft");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn show_events_conflicts_with_event_log() {
        let err = Cli::try_parse_from([
            "govdash",
            "--event-log",
            "events.jsonl",
            "--show-events",
            "dashboard",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

        let cli = Cli::try_parse_from(["govdash", "--show-events", "dashboard"]).unwrap();
        assert!(cli.show_events);
        assert!(cli.event_log.is_none());
    }
}
