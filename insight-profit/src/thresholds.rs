//! Centralized thresholds for job and quote profitability.
//!
//! Every red-flag decision in the workspace reads its cutoff from here or
//! from a `MarginPolicy` built from a company's settings. Changing the
//! default affects job creation, quote pricing, onboarding import and
//! every report.

/// Margin (percent) below which a job or quote is flagged as a red flag.
pub const DEFAULT_RED_FLAG_THRESHOLD: f64 = 10.0;

/// Overhead markup (percent) applied to quote costs when the company has
/// not configured its own.
pub const DEFAULT_OVERHEAD_MARKUP: f64 = 15.0;

/// Lower edges of the margin distribution brackets, in percent.
/// The first bracket is open below 0% and the last is open above 30%.
pub const MARGIN_BRACKET_EDGES: [f64; 4] = [0.0, 10.0, 20.0, 30.0];

/// Months shown on the dashboard revenue trend.
pub const DASHBOARD_TREND_MONTHS: usize = 6;
