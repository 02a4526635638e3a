use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chrono::Utc;

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a record id such as `job_1718000000000_3`.
///
/// Millisecond timestamps alone collide when several records are created
/// in one call (onboarding import), so a process-wide sequence is appended.
pub fn next_id(prefix: &str) -> String {
    let seq = ID_SEQUENCE.fetch_add(1, AtomicOrdering::Relaxed);
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), seq)
}

/// Sort descending by `score`. NaN scores go to the end.
pub fn sort_desc_by<T, F>(items: &mut [T], score: F)
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| {
        let sa = score(a);
        let sb = score(b);
        match (sa.is_nan(), sb.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => sb.partial_cmp(&sa).unwrap_or(Ordering::Equal),
        }
    });
}

/// Format an amount with comma thousands separators and no decimals.
pub fn format_amount(amount: f64) -> String {
    let whole = amount.abs().round() as u64;
    let sign = if amount < 0.0 && whole > 0 { "-" } else { "" };

    let s = whole.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    format!("{}{}", sign, result.chars().rev().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_prefixed() {
        let a = next_id("job");
        let b = next_id("job");
        assert!(a.starts_with("job_"));
        assert_ne!(a, b);
    }

    #[test]
    fn sorts_descending_with_nan_last() {
        let mut values = vec![1.0, f64::NAN, 5.0, -2.0];
        sort_desc_by(&mut values, |v| *v);
        assert_eq!(values[0], 5.0);
        assert_eq!(values[1], 1.0);
        assert_eq!(values[2], -2.0);
        assert!(values[3].is_nan());
    }

    #[test]
    fn formats_thousands() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.4), "999");
        assert_eq!(format_amount(85000.0), "85,000");
        assert_eq!(format_amount(-1234567.0), "-1,234,567");
    }
}
