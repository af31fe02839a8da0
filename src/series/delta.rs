//! Daily deltas from cumulative counters
//!
//! Sources publish running totals; reporting wants per-day counts.
//! Upstream occasionally revises historical totals downward, which
//! would make a naive difference negative. Negative deltas are clamped
//! to zero: daily counts stay non-negative at the cost of exact
//! total reconciliation on correction days.

/// Derive the day-over-day delta series of a cumulative series.
///
/// The first output sample equals the first cumulative sample (there
/// is no prior day to subtract). Every output sample is >= 0.
pub fn derive_deltas(cumulative: &[i64]) -> Vec<i64> {
    let mut out = Vec::with_capacity(cumulative.len());

    let mut prev: Option<i64> = None;
    for &total in cumulative {
        match prev {
            None => out.push(total),
            Some(p) => out.push((total - p).max(0)),
        }
        prev = Some(total);
    }

    out
}
