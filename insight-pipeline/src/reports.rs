//! Profitability reports and job list filtering.
//!
//! All report figures come from the calculator's group aggregation, so a
//! report row and a single job always agree on costs and margin.

use chrono::{DateTime, Duration, Utc};
use insight_profit::{bracket_counts, group_and_aggregate_with_policy, MarginPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PipelineResult;
use crate::types::{Client, Job, JobType};
use crate::util::sort_desc_by;

// ---------------------------------------------------------------------------
// Report rows
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfitabilityRow {
    pub client: String,
    pub job_count: usize,
    pub total_revenue: f64,
    pub total_costs: f64,
    pub profit: f64,
    /// Revenue-weighted.
    pub margin: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTypeRow {
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub job_count: usize,
    pub total_revenue: f64,
    pub total_costs: f64,
    pub profit: f64,
    /// Mean of the per-job margins.
    pub avg_margin: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarginRangeRow {
    pub range: String,
    pub count: usize,
}

/// Job counts by margin health.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginHealth {
    /// At or above the red-flag threshold.
    pub profitable: usize,
    /// Between zero and the threshold.
    pub low_margin: usize,
    /// Negative margin.
    pub loss_making: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginAnalysis {
    pub distribution: Vec<MarginRangeRow>,
    pub health: MarginHealth,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Per-client totals for clients with at least one job, best margin first.
pub fn client_profitability(
    jobs: &[Job],
    clients: &[Client],
    policy: &MarginPolicy,
) -> PipelineResult<Vec<ClientProfitabilityRow>> {
    let groups = group_and_aggregate_with_policy(
        jobs,
        policy,
        |j| j.client_id.clone(),
        Job::profitability_input,
    )?;

    let mut rows: Vec<ClientProfitabilityRow> = clients
        .iter()
        .filter_map(|client| {
            groups.get(&client.id).map(|agg| ClientProfitabilityRow {
                client: client.name.clone(),
                job_count: agg.count,
                total_revenue: agg.total_revenue,
                total_costs: agg.total_costs,
                profit: agg.total_profit,
                margin: agg.weighted_margin,
            })
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.margin);
    Ok(rows)
}

/// Per-type totals in fixed type order. Types without jobs are left out.
pub fn job_type_performance(jobs: &[Job], policy: &MarginPolicy) -> PipelineResult<Vec<JobTypeRow>> {
    let groups = group_and_aggregate_with_policy(jobs, policy, |j| j.job_type, Job::profitability_input)?;

    Ok(JobType::ALL
        .iter()
        .filter_map(|job_type| {
            groups.get(job_type).map(|agg| JobTypeRow {
                job_type: *job_type,
                job_count: agg.count,
                total_revenue: agg.total_revenue,
                total_costs: agg.total_costs,
                profit: agg.total_profit,
                avg_margin: agg.average_margin,
            })
        })
        .collect())
}

/// Margin distribution in bracket order plus health counts.
pub fn margin_analysis(jobs: &[Job], policy: &MarginPolicy) -> PipelineResult<MarginAnalysis> {
    let mut margins = Vec::with_capacity(jobs.len());
    for job in jobs {
        margins.push(policy.evaluate_input(&job.profitability_input())?.margin);
    }

    let mut health = MarginHealth::default();
    for &margin in &margins {
        if margin < 0.0 {
            health.loss_making += 1;
        } else if policy.is_red_flag(margin) {
            health.low_margin += 1;
        } else {
            health.profitable += 1;
        }
    }

    let distribution = bracket_counts(margins)
        .into_iter()
        .map(|(bracket, count)| MarginRangeRow {
            range: bracket.label().to_string(),
            count,
        })
        .collect();

    Ok(MarginAnalysis {
        distribution,
        health,
    })
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Reporting window on `date_completed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    Last30,
    Last90,
    Last180,
    Last365,
    All,
}

impl DateRange {
    pub fn parse(s: &str) -> Option<DateRange> {
        match s.trim().to_lowercase().as_str() {
            "last30" => Some(DateRange::Last30),
            "last90" => Some(DateRange::Last90),
            "last180" => Some(DateRange::Last180),
            "last365" => Some(DateRange::Last365),
            "all" => Some(DateRange::All),
            _ => None,
        }
    }

    pub fn days(&self) -> Option<i64> {
        match self {
            DateRange::Last30 => Some(30),
            DateRange::Last90 => Some(90),
            DateRange::Last180 => Some(180),
            DateRange::Last365 => Some(365),
            DateRange::All => None,
        }
    }

    pub fn contains(&self, date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.days() {
            Some(days) => date >= now - Duration::days(days),
            None => true,
        }
    }

    /// Jobs completed inside the window ending at `now`.
    pub fn apply(&self, jobs: &[Job], now: DateTime<Utc>) -> Vec<Job> {
        jobs.iter()
            .filter(|j| self.contains(j.date_completed, now))
            .cloned()
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatusFilter {
    #[default]
    All,
    Profitable,
    RedFlag,
}

/// Jobs partitioned by a filter.
pub struct FilterResult<C> {
    pub kept: Vec<C>,
    pub removed: Vec<C>,
}

/// Job list filter: text search on title and location, job type and
/// red-flag status.
#[derive(Clone, Debug, Default)]
pub struct JobFilter {
    pub search: String,
    pub job_type: Option<JobType>,
    pub status: JobStatusFilter,
}

impl JobFilter {
    pub fn matches(&self, job: &Job, policy: &MarginPolicy) -> bool {
        let needle = self.search.to_lowercase();
        let matches_search = needle.is_empty()
            || job.title.to_lowercase().contains(&needle)
            || job.location.to_lowercase().contains(&needle);
        let matches_type = self.job_type.map_or(true, |t| job.job_type == t);
        let matches_status = match self.status {
            JobStatusFilter::All => true,
            JobStatusFilter::Profitable => !policy.is_red_flag(job.margin),
            JobStatusFilter::RedFlag => policy.is_red_flag(job.margin),
        };
        matches_search && matches_type && matches_status
    }

    pub fn apply(&self, jobs: Vec<Job>, policy: &MarginPolicy) -> FilterResult<Job> {
        let (kept, removed): (Vec<_>, Vec<_>) =
            jobs.into_iter().partition(|j| self.matches(j, policy));
        FilterResult { kept, removed }
    }
}

/// Client names by id, for report and export labels.
pub fn client_names(clients: &[Client]) -> HashMap<&str, &str> {
    clients
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect()
}
