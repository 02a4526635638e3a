//! Dashboard summary over a company's jobs and quotes.

use chrono::Datelike;
use insight_profit::thresholds::DASHBOARD_TREND_MONTHS;
use insight_profit::{aggregate, MarginPolicy};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::PipelineResult;
use crate::types::{Job, JobType, Quote};

/// Revenue, costs and profit of the jobs completed in one month.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// `MMM yyyy`, e.g. `Mar 2024`.
    pub month: String,
    pub revenue: f64,
    pub costs: f64,
    pub profit: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTypeCount {
    pub job_type: JobType,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_revenue: f64,
    pub total_costs: f64,
    pub total_profit: f64,
    /// Revenue-weighted margin over all jobs.
    pub average_margin: f64,
    pub red_flag_jobs: Vec<String>,
    /// Percent of jobs that are red flags, `0` with no jobs.
    pub red_flag_share: f64,
    pub monthly_trend: Vec<MonthlyTrend>,
    pub job_type_distribution: Vec<JobTypeCount>,
    pub total_jobs: usize,
    pub total_quotes: usize,
    pub quote_margin_alerts: usize,
}

/// Summarize jobs and quotes, re-deriving every flag under `policy`.
pub fn summarize(
    jobs: &[Job],
    quotes: &[Quote],
    policy: &MarginPolicy,
) -> PipelineResult<DashboardSummary> {
    let totals = aggregate(jobs, policy, Job::profitability_input)?;

    let mut red_flag_jobs = Vec::new();
    let mut months: BTreeMap<(i32, u32), MonthlyTrend> = BTreeMap::new();
    for job in jobs {
        let result = policy.evaluate_input(&job.profitability_input())?;
        if result.is_red_flag {
            red_flag_jobs.push(job.id.clone());
        }
        let date = job.date_completed;
        let entry = months
            .entry((date.year(), date.month()))
            .or_insert_with(|| MonthlyTrend {
                month: date.format("%b %Y").to_string(),
                revenue: 0.0,
                costs: 0.0,
                profit: 0.0,
            });
        entry.revenue += job.total_revenue;
        entry.costs += result.total_costs;
        entry.profit += result.profit;
    }
    let skip = months.len().saturating_sub(DASHBOARD_TREND_MONTHS);
    let monthly_trend: Vec<MonthlyTrend> = months.into_values().skip(skip).collect();

    let job_type_distribution = JobType::ALL
        .iter()
        .map(|&job_type| JobTypeCount {
            job_type,
            count: jobs.iter().filter(|j| j.job_type == job_type).count(),
        })
        .filter(|row| row.count > 0)
        .collect();

    let mut quote_margin_alerts = 0;
    for quote in quotes {
        if policy.evaluate_input(&quote.profitability_input())?.is_red_flag {
            quote_margin_alerts += 1;
        }
    }

    let red_flag_share = if jobs.is_empty() {
        0.0
    } else {
        red_flag_jobs.len() as f64 / jobs.len() as f64 * 100.0
    };

    log::debug!(
        "dashboard: {} jobs, {} red flags, {} months",
        jobs.len(),
        red_flag_jobs.len(),
        monthly_trend.len()
    );

    Ok(DashboardSummary {
        total_revenue: totals.total_revenue,
        total_costs: totals.total_costs,
        total_profit: totals.total_profit,
        average_margin: totals.weighted_margin,
        red_flag_jobs,
        red_flag_share,
        monthly_trend,
        job_type_distribution,
        total_jobs: jobs.len(),
        total_quotes: quotes.len(),
        quote_margin_alerts,
    })
}
