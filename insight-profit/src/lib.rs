//! Job and quote profitability calculator.
//!
//! Pure functions only: no storage, no I/O, no shared state. Job creation,
//! quote pricing, onboarding import and reporting all derive margins and
//! red flags through this crate.

pub mod aggregate;
pub mod brackets;
pub mod cost;
pub mod error;
pub mod margin;
pub mod thresholds;

pub use aggregate::{
    aggregate, group_and_aggregate, group_and_aggregate_with_policy, AggregateMargin,
    AggregateResult,
};
pub use brackets::{bracket_counts, MarginBracket};
pub use cost::{total_cost, CostBreakdown, CostCategory};
pub use error::{check_amount, ProfitError, ProfitResult};
pub use margin::{
    evaluate, evaluate_default, margin_pct, MarginPolicy, ProfitabilityInput, ProfitabilityResult,
};
pub use thresholds::DEFAULT_RED_FLAG_THRESHOLD;
