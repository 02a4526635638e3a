//! CSV job import and report export.
//!
//! Import columns:
//!   title, job_type, location, client, crew, total_revenue, labor_cost,
//!   material_cost, equipment_cost, subcontractor_cost, date_completed, notes
//!
//! Only `title` and `total_revenue` are required. Empty cost cells read as 0,
//! an empty `job_type` as Construction and an empty `date_completed` as the
//! import time. Dates are RFC 3339 or `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, Utc};
use insight_profit::{check_amount, CostBreakdown};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::reports::client_names;
use crate::types::{Client, ClientDraft, Job, JobDraft, JobType};
use crate::util::next_id;

/// One CSV row as written by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRecord {
    pub title: String,
    #[serde(default)]
    pub job_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub crew: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub total_revenue: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub labor_cost: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub material_cost: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub equipment_cost: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub subcontractor_cost: f64,
    #[serde(default)]
    pub date_completed: String,
    #[serde(default)]
    pub notes: String,
}

/// Parsed import: job drafts plus one client draft per distinct client name.
#[derive(Debug, Clone, Default)]
pub struct ImportedJobs {
    pub jobs: Vec<JobDraft>,
    pub clients: Vec<ClientDraft>,
}

fn parse_date(raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| format!("invalid date_completed '{}'", raw))
}

fn parse_job_type(raw: &str) -> Result<JobType, String> {
    if raw.is_empty() {
        return Ok(JobType::default());
    }
    JobType::parse(raw).ok_or_else(|| format!("unknown job_type '{}'", raw))
}

/// Load jobs from a CSV reader.
pub fn load_jobs<R: Read>(reader: R) -> PipelineResult<ImportedJobs> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut imported = ImportedJobs::default();
    let mut client_ids: HashMap<String, String> = HashMap::new();

    for (line_num, result) in csv_reader.deserialize().enumerate() {
        let line = line_num + 2;
        let record: JobRecord = result.map_err(|e| PipelineError::CsvParse {
            line,
            reason: e.to_string(),
        })?;
        let to_parse_error = |reason: String| PipelineError::CsvParse { line, reason };

        let amounts = [
            ("total_revenue", record.total_revenue),
            ("labor_cost", record.labor_cost),
            ("material_cost", record.material_cost),
            ("equipment_cost", record.equipment_cost),
            ("subcontractor_cost", record.subcontractor_cost),
        ];
        for (field, amount) in amounts {
            check_amount(field, amount).map_err(|e| to_parse_error(e.to_string()))?;
        }
        let job_type = parse_job_type(&record.job_type).map_err(to_parse_error)?;
        let date_completed = parse_date(&record.date_completed).map_err(to_parse_error)?;

        let client_id = if record.client.is_empty() {
            String::new()
        } else {
            client_ids
                .entry(record.client.clone())
                .or_insert_with(|| {
                    let id = next_id("client");
                    imported.clients.push(ClientDraft {
                        id: Some(id.clone()),
                        name: record.client.clone(),
                        email: None,
                        phone: None,
                    });
                    id
                })
                .clone()
        };

        imported.jobs.push(JobDraft {
            title: record.title,
            job_type,
            location: record.location,
            client_id,
            crew: record.crew,
            equipment_used: Vec::new(),
            materials_used: Vec::new(),
            total_revenue: record.total_revenue,
            actual_costs: CostBreakdown::new(
                record.labor_cost,
                record.material_cost,
                record.equipment_cost,
                record.subcontractor_cost,
            ),
            notes: (!record.notes.is_empty()).then_some(record.notes),
            date_completed,
        });
    }

    log::info!(
        "loaded {} jobs and {} clients from CSV",
        imported.jobs.len(),
        imported.clients.len()
    );
    Ok(imported)
}

/// Load jobs from a CSV file path.
pub fn load_jobs_file(path: impl AsRef<Path>) -> PipelineResult<ImportedJobs> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        PipelineError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open '{}': {}", path.display(), e),
        ))
    })?;
    load_jobs(file)
}

/// Amount deserializer: empty cells are 0.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.trim();
    if s.is_empty() {
        return Ok(0.0);
    }
    s.parse::<f64>()
        .map_err(|_| serde::de::Error::custom(format!("expected a number, got '{}'", s)))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Exported report files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    ClientProfitability,
    JobTypePerformance,
    MarginAnalysis,
    JobsExport,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::ClientProfitability => "client_profitability",
            ReportKind::JobTypePerformance => "job_type_performance",
            ReportKind::MarginAnalysis => "margin_analysis",
            ReportKind::JobsExport => "jobs_export",
        }
    }
}

/// `<report>_<YYYY-MM-DD>.csv`
pub fn report_filename(kind: ReportKind, date: NaiveDate) -> String {
    format!("{}_{}.csv", kind.as_str(), date.format("%Y-%m-%d"))
}

fn quoted_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer)
}

/// Write report rows with a header taken from the row's field names.
/// No rows writes nothing.
pub fn write_report<T: Serialize, W: Write>(rows: &[T], writer: W) -> PipelineResult<()> {
    let mut csv_writer = quoted_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub const JOBS_EXPORT_HEADERS: [&str; 12] = [
    "Job Title",
    "Type",
    "Location",
    "Client",
    "Revenue",
    "Labor Cost",
    "Material Cost",
    "Equipment Cost",
    "Subcontractor Cost",
    "Total Cost",
    "Margin %",
    "Date Completed",
];

/// Write the job list export.
pub fn write_jobs<W: Write>(jobs: &[Job], clients: &[Client], writer: W) -> PipelineResult<()> {
    let names = client_names(clients);
    let mut csv_writer = quoted_writer(writer);
    csv_writer.write_record(JOBS_EXPORT_HEADERS)?;

    for job in jobs {
        let costs = &job.actual_costs;
        let total = costs.total()?;
        csv_writer.write_record([
            job.title.clone(),
            job.job_type.to_string(),
            job.location.clone(),
            names.get(job.client_id.as_str()).unwrap_or(&"Unknown").to_string(),
            job.total_revenue.to_string(),
            costs.labor.to_string(),
            costs.material.to_string(),
            costs.equipment.to_string(),
            costs.subcontractor.to_string(),
            total.to_string(),
            format!("{:.2}", job.margin),
            job.date_completed.format("%Y-%m-%d").to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}
