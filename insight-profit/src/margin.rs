//! Margin evaluation and red-flag classification.
//!
//! `margin = (revenue - total_costs) / revenue * 100`, reported as `0` when
//! revenue is `0` so that `margin < threshold` stays well-defined and
//! zero-revenue records are always flagged.

use serde::{Deserialize, Serialize};

use crate::cost::{total_cost, CostBreakdown};
use crate::error::{check_amount, ProfitError, ProfitResult};
use crate::thresholds::DEFAULT_RED_FLAG_THRESHOLD;

/// Revenue and cost inputs of a job (total revenue + actual costs) or a
/// quote (quoted price + estimated costs).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitabilityInput {
    pub revenue: f64,
    pub costs: CostBreakdown,
}

impl ProfitabilityInput {
    pub fn new(revenue: f64, costs: CostBreakdown) -> Self {
        Self { revenue, costs }
    }
}

/// Derived profitability figures. Always recomputed from the inputs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitabilityResult {
    pub total_costs: f64,
    pub profit: f64,
    /// Percentage of revenue. Negative when costs exceed revenue.
    pub margin: f64,
    pub is_red_flag: bool,
}

/// Red-flag configuration for one company.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarginPolicy {
    pub red_flag_threshold: f64,
}

impl Default for MarginPolicy {
    fn default() -> Self {
        Self {
            red_flag_threshold: DEFAULT_RED_FLAG_THRESHOLD,
        }
    }
}

impl MarginPolicy {
    pub fn new(red_flag_threshold: f64) -> ProfitResult<Self> {
        if !red_flag_threshold.is_finite() {
            return Err(ProfitError::InvalidInput {
                field: "red_flag_threshold".into(),
                reason: format!("{} is not a number", red_flag_threshold),
            });
        }
        Ok(Self { red_flag_threshold })
    }

    pub fn is_red_flag(&self, margin: f64) -> bool {
        margin < self.red_flag_threshold
    }

    pub fn evaluate(&self, revenue: f64, costs: &CostBreakdown) -> ProfitResult<ProfitabilityResult> {
        evaluate(revenue, costs, self.red_flag_threshold)
    }

    pub fn evaluate_input(&self, input: &ProfitabilityInput) -> ProfitResult<ProfitabilityResult> {
        self.evaluate(input.revenue, &input.costs)
    }
}

/// Percentage margin of `revenue` over `total_costs`; `0` for zero revenue.
pub fn margin_pct(revenue: f64, total_costs: f64) -> f64 {
    if revenue > 0.0 {
        (revenue - total_costs) / revenue * 100.0
    } else {
        0.0
    }
}

/// Compute total costs, profit, margin and red-flag status.
pub fn evaluate(
    revenue: f64,
    costs: &CostBreakdown,
    threshold: f64,
) -> ProfitResult<ProfitabilityResult> {
    check_amount("revenue", revenue)?;
    if !threshold.is_finite() {
        return Err(ProfitError::InvalidInput {
            field: "threshold".into(),
            reason: format!("{} is not a number", threshold),
        });
    }
    let total_costs = total_cost(costs)?;
    let margin = margin_pct(revenue, total_costs);
    let result = ProfitabilityResult {
        total_costs,
        profit: revenue - total_costs,
        margin,
        is_red_flag: margin < threshold,
    };
    log::debug!(
        "evaluated revenue={} costs={} margin={:.2}% red_flag={}",
        revenue,
        total_costs,
        margin,
        result.is_red_flag
    );
    Ok(result)
}

/// `evaluate` with the default 10% threshold.
pub fn evaluate_default(revenue: f64, costs: &CostBreakdown) -> ProfitResult<ProfitabilityResult> {
    evaluate(revenue, costs, DEFAULT_RED_FLAG_THRESHOLD)
}
