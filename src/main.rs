use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use student_activity_reports::config::Config;
use student_activity_reports::error::REPORT_FAILURE_MESSAGE;
use student_activity_reports::models::{
    ActivityType, OutputKind, ReportFilter, ReportFormat, Template,
};
use student_activity_reports::{build_report_data, render, JsonStore, RecordStore, RenderContext};

#[derive(Parser)]
#[command(name = "activity-report")]
#[command(about = "Student activity analytics and accreditation reports", long_about = None)]
struct Cli {
    /// Directory holding users.json and activities.json (overrides ACTIVITY_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and empty collections
    Init,
    /// Load the sample dataset into empty collections
    Seed,
    /// Import activities from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print summary statistics for the filtered activities
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a PDF or Excel report
    Report {
        /// pdf or excel
        #[arg(long, default_value = "pdf")]
        format: OutputKind,
        /// NAAC, AICTE, NIRF or Internal
        #[arg(long)]
        template: Template,
        #[command(flatten)]
        filters: FilterArgs,
        /// Directory to save the report in (overrides ACTIVITY_REPORT_DIR)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Only activities dated in this calendar year (repeatable)
    #[arg(long = "year")]
    years: Vec<i32>,
    /// Only students in this department or course (repeatable)
    #[arg(long = "department")]
    departments: Vec<String>,
    /// academic, extracurricular or volunteering (repeatable)
    #[arg(long = "activity-type")]
    activity_types: Vec<ActivityType>,
    /// Start of the date range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// End of the date range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
    /// JSON filter file; flags add to it
    #[arg(long)]
    filter_file: Option<PathBuf>,
}

impl FilterArgs {
    fn into_filter(self) -> anyhow::Result<ReportFilter> {
        let base = match &self.filter_file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read filter file {}", path.display()))?;
                serde_json::from_str::<ReportFilter>(&text)
                    .with_context(|| format!("invalid filter file {}", path.display()))?
            }
            None => ReportFilter::default(),
        };

        let mut builder = base
            .into_builder()
            .years(self.years)
            .departments(self.departments)
            .activity_types(self.activity_types);

        match (self.from, self.to) {
            (Some(start), Some(end)) => builder = builder.date_range(start, end),
            (None, None) => {}
            _ => tracing::warn!("--from and --to must be given together; ignoring the date range"),
        }

        Ok(builder.build())
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let store = JsonStore::new(&config.data_dir);

    match cli.command {
        Commands::Init => {
            store.init()?;
            println!("Data directory ready at {}.", store.dir().display());
        }
        Commands::Seed => {
            if store.seed()? {
                println!("Seed data inserted.");
            } else {
                println!("Collections already populated; nothing seeded.");
            }
        }
        Commands::Import { csv } => {
            let inserted = store
                .import_csv(&csv)
                .with_context(|| format!("failed to import {}", csv.display()))?;
            println!("Inserted {inserted} activities from {}.", csv.display());
        }
        Commands::Summary { filters, json } => {
            let filter = filters.into_filter()?;
            let snapshot = store.snapshot().context("failed to load records")?;
            let data = build_report_data(&snapshot, &filter, Local::now().date_naive());
            let summary = &data.summary;

            if json {
                println!("{}", serde_json::to_string_pretty(summary)?);
                return Ok(());
            }

            println!(
                "{} activities across {} students, approval rate {}%",
                summary.total_activities, summary.total_students, summary.approval_rate
            );
            println!("By type:");
            for (activity_type, count) in &summary.activities_by_type {
                println!("- {}: {}", activity_type.label(), count);
            }
            println!("By department:");
            for (department, count) in &summary.activities_by_department {
                println!("- {department}: {count}");
            }
            println!("Last 12 months:");
            for trend in &summary.monthly_trends {
                println!("- {}: {}", trend.month, trend.count);
            }
        }
        Commands::Report {
            format,
            template,
            filters,
            out_dir,
        } => {
            let filter = filters.into_filter()?;
            let snapshot = store.snapshot().context("failed to load records")?;
            let data = build_report_data(&snapshot, &filter, Local::now().date_naive());
            let format = ReportFormat::new(format, template);
            let ctx = RenderContext::new(config.platform_name.clone());

            let report = match render(&data, format, &filter, &ctx) {
                Ok(report) => report,
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        template = %format.template,
                        kind = %format.kind,
                        "report generation failed"
                    );
                    anyhow::bail!(REPORT_FAILURE_MESSAGE);
                }
            };

            let out_dir = out_dir.unwrap_or(config.report_dir);
            let path = report
                .save(&out_dir)
                .with_context(|| format!("failed to save report into {}", out_dir.display()))?;
            tracing::info!(
                path = %path.display(),
                activities = data.summary.total_activities,
                "report saved"
            );
            println!("Report written to {}.", path.display());
        }
    }

    Ok(())
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("student_activity_reports=info,activity_report=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
