//! Quote pricing and estimation helpers.
//!
//! A quote's price is its costs plus an overhead markup (percent of costs)
//! plus a flat custom markup. Margin and the margin alert come from the
//! calculator with the quoted price as revenue.

use insight_profit::{check_amount, MarginPolicy, ProfitResult};
use serde::Serialize;

use crate::types::{Job, JobType, QuoteCosts};

/// How many past jobs `similar_jobs` returns at most.
pub const SIMILAR_JOBS_LIMIT: usize = 3;
/// Description words must be longer than this to count as keywords.
const MIN_KEYWORD_CHARS: usize = 3;

/// Derived price figures of a quote.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct QuotePricing {
    pub total_costs: f64,
    pub markup_amount: f64,
    pub quoted_price: f64,
    pub margin: f64,
    pub is_margin_alert: bool,
}

/// Price a quote from its cost estimates and markups.
pub fn price_quote(
    costs: &QuoteCosts,
    overhead_markup_pct: f64,
    custom_markup: f64,
    policy: &MarginPolicy,
) -> ProfitResult<QuotePricing> {
    check_amount("overhead_markup", overhead_markup_pct)?;
    check_amount("custom_markup", custom_markup)?;

    let breakdown = costs.breakdown();
    let total_costs = breakdown.total()?;
    let markup_amount = total_costs * overhead_markup_pct / 100.0;
    let quoted_price = total_costs + markup_amount + custom_markup;
    let result = policy.evaluate(quoted_price, &breakdown)?;

    Ok(QuotePricing {
        total_costs,
        markup_amount,
        quoted_price,
        margin: result.margin,
        is_margin_alert: result.is_red_flag,
    })
}

/// Default cost estimates for a job type with no history.
pub fn default_estimate(job_type: JobType) -> QuoteCosts {
    match job_type {
        JobType::Marine => QuoteCosts::new(8000.0, 5000.0, 4000.0),
        JobType::Construction => QuoteCosts::new(6000.0, 4000.0, 3000.0),
        JobType::Logistics => QuoteCosts::new(4000.0, 2000.0, 1500.0),
    }
}

/// Estimate quote costs from the average actual costs of past jobs of the
/// same type, rounded to whole units.
pub fn quick_estimate(job_type: JobType, history: &[Job]) -> QuoteCosts {
    let same_type: Vec<&Job> = history.iter().filter(|j| j.job_type == job_type).collect();
    if same_type.is_empty() {
        return default_estimate(job_type);
    }
    let n = same_type.len() as f64;
    let avg = |f: fn(&Job) -> f64| (same_type.iter().map(|&j| f(j)).sum::<f64>() / n).round();
    QuoteCosts::new(
        avg(|j| j.actual_costs.labor),
        avg(|j| j.actual_costs.material),
        avg(|j| j.actual_costs.equipment),
    )
}

/// Past jobs of the same type whose title or notes mention a keyword from
/// the quote description.
pub fn similar_jobs<'a>(job_type: JobType, description: &str, history: &'a [Job]) -> Vec<&'a Job> {
    let description = description.to_lowercase();
    let keywords: Vec<&str> = description
        .split(' ')
        .filter(|w| w.chars().count() > MIN_KEYWORD_CHARS)
        .collect();
    if keywords.is_empty() {
        return Vec::new();
    }

    history
        .iter()
        .filter(|job| job.job_type == job_type)
        .filter(|job| {
            let title = job.title.to_lowercase();
            let notes = job.notes.as_deref().unwrap_or_default().to_lowercase();
            keywords
                .iter()
                .any(|k| title.contains(k) || notes.contains(k))
        })
        .take(SIMILAR_JOBS_LIMIT)
        .collect()
}
