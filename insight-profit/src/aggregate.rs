//! Group-by aggregation of jobs and quotes.
//!
//! Each group is reduced through the same cost and margin formulas as a
//! single record. Two aggregate margins are kept because different reports
//! use different ones:
//! - revenue-weighted: `sum(profit) / sum(revenue) * 100`
//!   (client and job-type profitability, dashboard totals)
//! - unweighted mean of per-item margins (job-type "average margin")

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::ProfitResult;
use crate::margin::{MarginPolicy, ProfitabilityInput, ProfitabilityResult};

/// Which aggregate margin a report reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateMargin {
    RevenueWeighted,
    Average,
}

/// Totals for one group of records.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub count: usize,
    pub total_revenue: f64,
    pub total_costs: f64,
    pub total_profit: f64,
    pub red_flag_count: usize,
    pub weighted_margin: f64,
    pub average_margin: f64,
}

impl AggregateResult {
    pub fn margin(&self, kind: AggregateMargin) -> f64 {
        match kind {
            AggregateMargin::RevenueWeighted => self.weighted_margin,
            AggregateMargin::Average => self.average_margin,
        }
    }
}

/// Running sums for one group.
#[derive(Clone, Debug, Default)]
struct Accumulator {
    count: usize,
    revenue: f64,
    costs: f64,
    profit: f64,
    margin_sum: f64,
    red_flags: usize,
}

impl Accumulator {
    fn push(&mut self, input: &ProfitabilityInput, result: &ProfitabilityResult) {
        self.count += 1;
        self.revenue += input.revenue;
        self.costs += result.total_costs;
        self.profit += result.profit;
        self.margin_sum += result.margin;
        if result.is_red_flag {
            self.red_flags += 1;
        }
    }

    fn finish(self) -> AggregateResult {
        let average_margin = if self.count > 0 {
            self.margin_sum / self.count as f64
        } else {
            0.0
        };
        AggregateResult {
            count: self.count,
            total_revenue: self.revenue,
            total_costs: self.costs,
            total_profit: self.profit,
            red_flag_count: self.red_flags,
            weighted_margin: weighted_margin(self.profit, self.revenue),
            average_margin,
        }
    }
}

fn weighted_margin(profit: f64, revenue: f64) -> f64 {
    if revenue > 0.0 {
        profit / revenue * 100.0
    } else {
        0.0
    }
}

/// Group `items` by `key_fn` and reduce each group, flagging at the
/// default threshold.
pub fn group_and_aggregate<T, K, FK, FE>(
    items: &[T],
    key_fn: FK,
    extract: FE,
) -> ProfitResult<HashMap<K, AggregateResult>>
where
    K: Eq + Hash,
    FK: Fn(&T) -> K,
    FE: Fn(&T) -> ProfitabilityInput,
{
    group_and_aggregate_with_policy(items, &MarginPolicy::default(), key_fn, extract)
}

/// Group `items` by `key_fn` and reduce each group under `policy`.
///
/// Fails on the first item whose revenue or costs are invalid. The input
/// slice is never modified.
pub fn group_and_aggregate_with_policy<T, K, FK, FE>(
    items: &[T],
    policy: &MarginPolicy,
    key_fn: FK,
    extract: FE,
) -> ProfitResult<HashMap<K, AggregateResult>>
where
    K: Eq + Hash,
    FK: Fn(&T) -> K,
    FE: Fn(&T) -> ProfitabilityInput,
{
    let mut groups: HashMap<K, Accumulator> = HashMap::new();
    for item in items {
        let input = extract(item);
        let result = policy.evaluate_input(&input)?;
        groups.entry(key_fn(item)).or_default().push(&input, &result);
    }
    log::debug!("aggregated {} items into {} groups", items.len(), groups.len());
    Ok(groups.into_iter().map(|(k, acc)| (k, acc.finish())).collect())
}

/// Reduce the whole collection into one result.
pub fn aggregate<T, FE>(
    items: &[T],
    policy: &MarginPolicy,
    extract: FE,
) -> ProfitResult<AggregateResult>
where
    FE: Fn(&T) -> ProfitabilityInput,
{
    let mut acc = Accumulator::default();
    for item in items {
        let input = extract(item);
        let result = policy.evaluate_input(&input)?;
        acc.push(&input, &result);
    }
    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostBreakdown;

    struct Row {
        client: &'static str,
        revenue: f64,
        labor: f64,
    }

    fn input(r: &Row) -> ProfitabilityInput {
        ProfitabilityInput::new(r.revenue, CostBreakdown::new(r.labor, 0.0, 0.0, 0.0))
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { client: "a", revenue: 1000.0, labor: 500.0 },
            Row { client: "a", revenue: 3000.0, labor: 2800.0 },
            Row { client: "b", revenue: 200.0, labor: 100.0 },
        ]
    }

    #[test]
    fn groups_and_sums_per_key() {
        let groups = group_and_aggregate(&rows(), |r| r.client, input).unwrap();
        assert_eq!(groups.len(), 2);
        let a = &groups["a"];
        assert_eq!(a.count, 2);
        assert_eq!(a.total_revenue, 4000.0);
        assert_eq!(a.total_costs, 3300.0);
        assert_eq!(a.total_profit, 700.0);
        assert_eq!(a.red_flag_count, 1);
    }

    #[test]
    fn weighted_and_average_margins_differ() {
        let groups = group_and_aggregate(&rows(), |r| r.client, input).unwrap();
        let a = &groups["a"];
        // 700 / 4000
        assert!((a.margin(AggregateMargin::RevenueWeighted) - 17.5).abs() < 1e-9);
        // (50 + 6.67) / 2
        let expected = (50.0 + 200.0 / 3000.0 * 100.0) / 2.0;
        assert!((a.margin(AggregateMargin::Average) - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_revenue_group_has_zero_margins() {
        let items = vec![Row { client: "z", revenue: 0.0, labor: 10.0 }];
        let groups = group_and_aggregate(&items, |r| r.client, input).unwrap();
        assert_eq!(groups["z"].weighted_margin, 0.0);
        assert_eq!(groups["z"].average_margin, 0.0);
        assert_eq!(groups["z"].red_flag_count, 1);
    }

    #[test]
    fn empty_collection_is_not_an_error() {
        let items: Vec<Row> = Vec::new();
        let groups = group_and_aggregate(&items, |r| r.client, input).unwrap();
        assert!(groups.is_empty());
        let total = aggregate(&items, &MarginPolicy::default(), input).unwrap();
        assert_eq!(total, AggregateResult::default());
    }

    #[test]
    fn invalid_item_fails_the_aggregation() {
        let items = vec![Row { client: "x", revenue: 100.0, labor: -1.0 }];
        assert!(group_and_aggregate(&items, |r| r.client, input).is_err());
    }

    #[test]
    fn overall_aggregate_matches_sum_of_groups() {
        let total = aggregate(&rows(), &MarginPolicy::default(), input).unwrap();
        assert_eq!(total.count, 3);
        assert_eq!(total.total_revenue, 4200.0);
        assert_eq!(total.total_profit, 800.0);
        assert_eq!(total.red_flag_count, 1);
    }
}
