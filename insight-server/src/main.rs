use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use serde::Serialize;

use insight_pipeline::csv_io::{load_jobs_file, report_filename, write_jobs, write_report, ReportKind};
use insight_pipeline::dashboard::{summarize, DashboardSummary};
use insight_pipeline::onboarding::sample_jobs;
use insight_pipeline::reports::{
    client_profitability, job_type_performance, margin_analysis, ClientProfitabilityRow,
    DateRange, JobFilter, JobStatusFilter, JobTypeRow, MarginAnalysis,
};
use insight_pipeline::types::{CompanyProfile, JobType, OnboardingData};
use insight_pipeline::util::format_amount;
use insight_pipeline::{FileStore, JobBook, KeyValueStore, MemoryStore, PipelineResult, Repository};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportChoice {
    Dashboard,
    Profitability,
    JobType,
    Margin,
    All,
}

impl ReportChoice {
    fn includes(&self, other: ReportChoice) -> bool {
        *self == ReportChoice::All || *self == other
    }
}

fn parse_range(s: &str) -> Result<DateRange, String> {
    DateRange::parse(s).ok_or_else(|| format!("unknown range '{}'", s))
}

fn parse_job_type(s: &str) -> Result<JobType, String> {
    JobType::parse(s).ok_or_else(|| format!("unknown job type '{}'", s))
}

fn parse_status(s: &str) -> Result<JobStatusFilter, String> {
    match s.to_ascii_lowercase().as_str() {
        "all" => Ok(JobStatusFilter::All),
        "profitable" => Ok(JobStatusFilter::Profitable),
        "red-flag" | "redflag" => Ok(JobStatusFilter::RedFlag),
        _ => Err(format!("unknown status '{}'", s)),
    }
}

/// Job profitability dashboard and reports.
#[derive(Parser, Debug)]
#[command(name = "insight-server", version, about, long_about = None)]
struct Cli {
    /// Jobs CSV to import before reporting
    #[arg(value_name = "JOBS_CSV")]
    jobs_csv: Option<PathBuf>,

    /// Import the built-in sample jobs
    #[arg(long, conflicts_with = "jobs_csv")]
    sample: bool,

    /// Report to print
    #[arg(long, value_enum, default_value_t = ReportChoice::Dashboard)]
    report: ReportChoice,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,

    /// Write report CSVs into this directory
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Keep company data in JSON files under this directory
    #[arg(long, value_name = "DIR", env = "INSIGHT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Company id the data belongs to
    #[arg(long, value_name = "ID", env = "INSIGHT_COMPANY", default_value = "default")]
    company: String,

    /// Save a new red-flag margin percent for the company
    #[arg(long, value_name = "PCT")]
    threshold: Option<f64>,

    /// Only report jobs completed in this window
    #[arg(long, value_name = "RANGE", default_value = "all", value_parser = parse_range)]
    range: DateRange,

    /// Only report jobs whose title or location contains this text
    #[arg(long, value_name = "TEXT", default_value = "")]
    search: String,

    /// Only report jobs of this type
    #[arg(long, value_name = "TYPE", value_parser = parse_job_type)]
    job_type: Option<JobType>,

    /// Only report jobs with this status: all, profitable or red-flag
    #[arg(long, value_name = "STATUS", default_value = "all", value_parser = parse_status)]
    status: JobStatusFilter,
}

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ReportJson {
    generated_at: String,
    company: String,
    red_flag_threshold: f64,
    jobs_in_range: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    dashboard: Option<DashboardSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_profitability: Option<Vec<ClientProfitabilityRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_type_performance: Option<Vec<JobTypeRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_analysis: Option<MarginAnalysis>,
}

// ---------------------------------------------------------------------------
// Human output
// ---------------------------------------------------------------------------

fn print_dashboard(summary: &DashboardSummary) {
    println!("  Dashboard");
    println!("  {:\u{2500}<64}", "");
    println!(
        "  Revenue ${}  \u{00b7}  Costs ${}  \u{00b7}  Profit ${}  \u{00b7}  Margin {:.1}%",
        format_amount(summary.total_revenue),
        format_amount(summary.total_costs),
        format_amount(summary.total_profit),
        summary.average_margin
    );
    println!(
        "  {} jobs  \u{00b7}  {} red flags ({:.0}%)  \u{00b7}  {} quotes ({} margin alerts)",
        summary.total_jobs,
        summary.red_flag_jobs.len(),
        summary.red_flag_share,
        summary.total_quotes,
        summary.quote_margin_alerts
    );
    if !summary.monthly_trend.is_empty() {
        println!();
        for month in &summary.monthly_trend {
            println!(
                "  {:10} revenue ${:>12}  costs ${:>12}  profit ${:>12}",
                month.month,
                format_amount(month.revenue),
                format_amount(month.costs),
                format_amount(month.profit)
            );
        }
    }
    if !summary.job_type_distribution.is_empty() {
        println!();
        let parts: Vec<String> = summary
            .job_type_distribution
            .iter()
            .map(|row| format!("{} {}", row.job_type, row.count))
            .collect();
        println!("  Job types: {}", parts.join("  \u{00b7}  "));
    }
    println!();
}

fn print_profitability(rows: &[ClientProfitabilityRow], threshold: f64) {
    println!("  Client Profitability");
    println!("  {:\u{2500}<64}", "");
    if rows.is_empty() {
        println!("  No clients with completed jobs.");
    }
    for row in rows {
        let flag = if row.margin < threshold { "!!" } else { "  " };
        println!(
            "  {} {:28} {:>3} jobs  ${:>12}  profit ${:>10}  {:>6.1}%",
            flag,
            row.client,
            row.job_count,
            format_amount(row.total_revenue),
            format_amount(row.profit),
            row.margin
        );
    }
    println!();
}

fn print_job_types(rows: &[JobTypeRow], threshold: f64) {
    println!("  Job Type Performance");
    println!("  {:\u{2500}<64}", "");
    if rows.is_empty() {
        println!("  No completed jobs.");
    }
    for row in rows {
        let flag = if row.avg_margin < threshold { "!!" } else { "  " };
        println!(
            "  {} {:14} {:>3} jobs  ${:>12}  profit ${:>10}  avg {:>6.1}%",
            flag,
            row.job_type.to_string(),
            row.job_count,
            format_amount(row.total_revenue),
            format_amount(row.profit),
            row.avg_margin
        );
    }
    println!();
}

fn print_margin_analysis(analysis: &MarginAnalysis) {
    println!("  Margin Analysis");
    println!("  {:\u{2500}<64}", "");
    for row in &analysis.distribution {
        println!("  {:>8}  {:>4}  {}", row.range, row.count, "\u{2588}".repeat(row.count.min(40)));
    }
    println!(
        "  Profitable {}  \u{00b7}  Low margin {}  \u{00b7}  Loss-making {}",
        analysis.health.profitable, analysis.health.low_margin, analysis.health.loss_making
    );
    println!();
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

fn export_file(dir: &Path, kind: ReportKind) -> PipelineResult<std::fs::File> {
    let path = dir.join(report_filename(kind, Utc::now().date_naive()));
    log::info!("writing {}", path.display());
    Ok(std::fs::File::create(path)?)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

async fn run(cli: Cli) -> PipelineResult<()> {
    let store: Arc<dyn KeyValueStore> = match &cli.data_dir {
        Some(dir) => Arc::new(FileStore::open(dir).await?),
        None => Arc::new(MemoryStore::new()),
    };

    let mut book = JobBook::open(Repository::new(store, cli.company.clone())).await?;
    if let Some(threshold) = cli.threshold {
        book.update_company(CompanyProfile {
            red_flag_threshold: Some(threshold),
            ..Default::default()
        })
        .await?;
    }

    let load_start = Instant::now();
    let imported = if let Some(path) = &cli.jobs_csv {
        let imported = load_jobs_file(path)?;
        Some(OnboardingData {
            imported_jobs: Some(imported.jobs),
            clients: imported.clients,
            ..Default::default()
        })
    } else if cli.sample {
        Some(OnboardingData {
            imported_jobs: Some(sample_jobs()),
            ..Default::default()
        })
    } else {
        None
    };
    if let Some(data) = imported {
        book.initialize_company_data(data).await?;
    }
    let snapshot = book.snapshot().await?;
    log::info!(
        "loaded {} jobs and {} quotes in {}ms",
        snapshot.jobs.len(),
        snapshot.quotes.len(),
        load_start.elapsed().as_millis()
    );

    let policy = *book.policy();
    let filter = JobFilter {
        search: cli.search.clone(),
        job_type: cli.job_type,
        status: cli.status,
    };
    let filtered = filter.apply(cli.range.apply(&snapshot.jobs, Utc::now()), &policy);
    if !filtered.removed.is_empty() {
        log::info!(
            "job filter kept {} jobs, removed {}",
            filtered.kept.len(),
            filtered.removed.len()
        );
    }
    let jobs = filtered.kept;
    let report = cli.report;

    let output = ReportJson {
        generated_at: Utc::now().to_rfc3339(),
        company: book.company().id.clone(),
        red_flag_threshold: policy.red_flag_threshold,
        jobs_in_range: jobs.len(),
        dashboard: if report.includes(ReportChoice::Dashboard) {
            Some(summarize(&jobs, &snapshot.quotes, &policy)?)
        } else {
            None
        },
        client_profitability: if report.includes(ReportChoice::Profitability) {
            Some(client_profitability(&jobs, &snapshot.clients, &policy)?)
        } else {
            None
        },
        job_type_performance: if report.includes(ReportChoice::JobType) {
            Some(job_type_performance(&jobs, &policy)?)
        } else {
            None
        },
        margin_analysis: if report.includes(ReportChoice::Margin) {
            Some(margin_analysis(&jobs, &policy)?)
        } else {
            None
        },
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!();
        println!(
            "  {}  \u{00b7}  {} jobs in range  \u{00b7}  red flag below {}%",
            output.company, output.jobs_in_range, output.red_flag_threshold
        );
        println!();
        if let Some(summary) = &output.dashboard {
            print_dashboard(summary);
        }
        if let Some(rows) = &output.client_profitability {
            print_profitability(rows, policy.red_flag_threshold);
        }
        if let Some(rows) = &output.job_type_performance {
            print_job_types(rows, policy.red_flag_threshold);
        }
        if let Some(analysis) = &output.margin_analysis {
            print_margin_analysis(analysis);
        }
    }

    if let Some(dir) = &cli.export_dir {
        std::fs::create_dir_all(dir)?;
        if let Some(rows) = &output.client_profitability {
            write_report(rows, export_file(dir, ReportKind::ClientProfitability)?)?;
        }
        if let Some(rows) = &output.job_type_performance {
            write_report(rows, export_file(dir, ReportKind::JobTypePerformance)?)?;
        }
        if let Some(analysis) = &output.margin_analysis {
            write_report(&analysis.distribution, export_file(dir, ReportKind::MarginAnalysis)?)?;
        }
        write_jobs(&jobs, &snapshot.clients, export_file(dir, ReportKind::JobsExport)?)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::debug!("parsed arguments: {:?}", cli);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
