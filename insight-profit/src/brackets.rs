use serde::Serialize;
use std::fmt;

use crate::thresholds::MARGIN_BRACKET_EDGES;

/// Half-open margin ranges used by the margin distribution report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MarginBracket {
    /// (-inf, 0)
    Negative,
    /// [0, 10)
    Low,
    /// [10, 20)
    Moderate,
    /// [20, 30)
    Healthy,
    /// [30, inf)
    Strong,
}

impl MarginBracket {
    /// Brackets in report order.
    pub const ALL: [MarginBracket; 5] = [
        MarginBracket::Negative,
        MarginBracket::Low,
        MarginBracket::Moderate,
        MarginBracket::Healthy,
        MarginBracket::Strong,
    ];

    pub fn for_margin(margin: f64) -> MarginBracket {
        let position = MARGIN_BRACKET_EDGES
            .iter()
            .take_while(|&&edge| margin >= edge)
            .count();
        MarginBracket::ALL[position]
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarginBracket::Negative => "< 0%",
            MarginBracket::Low => "0-10%",
            MarginBracket::Moderate => "10-20%",
            MarginBracket::Healthy => "20-30%",
            MarginBracket::Strong => "> 30%",
        }
    }
}

impl fmt::Display for MarginBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Count margins per bracket, in bracket order.
///
/// Brackets with no matching margin are left out, so an empty input gives
/// an empty result.
pub fn bracket_counts<I>(margins: I) -> Vec<(MarginBracket, usize)>
where
    I: IntoIterator<Item = f64>,
{
    let mut counts = [0usize; 5];
    for margin in margins {
        counts[MarginBracket::for_margin(margin) as usize] += 1;
    }
    MarginBracket::ALL
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(bracket, count)| (*bracket, count))
        .collect()
}
