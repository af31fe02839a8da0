//! Gap-filling interpolation for reported count series
//!
//! Upstream CSVs carry missing samples as blanks (NaN after parsing)
//! and occasionally as negative sentinels. This repairs them by
//! bridging from the last known-good value to the nearest valid value
//! within a three-sample lookahead, subdividing the interval evenly:
//!
//! - one missing sample  -> midpoint
//! - two missing samples -> thirds of the interval
//! - three missing       -> quarters of the interval
//!
//! Filled values join the known-good history, so a later gap bridges
//! from the most recently repaired sample. When a run of missing
//! samples is longer than the lookahead, only its head is left as-is:
//! the scan advances one position at a time, so the tail of the run
//! still bridges once a valid terminator comes within reach. Samples
//! that never see a terminator (and a leading gap with nothing valid
//! before it) stay invalid; the caller decides what an unrepairable
//! sample becomes (see [`to_counts`]).

/// Maximum lookahead when bridging a gap
const MAX_LOOKAHEAD: usize = 3;

/// A sample is usable if it is finite and non-negative
fn is_valid(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

/// Repair missing/invalid samples by bounded-lookahead interpolation.
///
/// Pure: returns a new sequence, the input is untouched.
pub fn repair(series: &[f64]) -> Vec<f64> {
    let mut out = series.to_vec();
    let mut last_good: Option<f64> = None;
    let mut i = 0;

    while i < out.len() {
        if is_valid(out[i]) {
            last_good = Some(out[i]);
            i += 1;
            continue;
        }

        let Some(x) = last_good else {
            // Leading gap with no prior valid sample: nothing to
            // bridge from. Leave it; zero-fill policy lives upstream.
            i += 1;
            continue;
        };

        // Nearest valid sample within the lookahead window
        let bridge = (1..=MAX_LOOKAHEAD)
            .filter_map(|k| {
                let j = i + k;
                (j < out.len() && is_valid(out[j])).then(|| (k, out[j]))
            })
            .next();

        let Some((gap, y)) = bridge else {
            // No valid terminator in reach: skip this sample rather
            // than guessing. The next position gets its own lookahead,
            // so only the head of an over-long run stays missing.
            log::warn!("No valid sample within {} of index {}, left unrepaired", MAX_LOOKAHEAD, i);
            i += 1;
            continue;
        };

        // Evenly subdivide [x, y] into gap+1 steps and fill the gap
        let step = (y - x) / (gap as f64 + 1.0);
        for k in 1..=gap {
            out[i + k - 1] = x + step * k as f64;
        }

        last_good = Some(out[i + gap - 1]);
        i += gap;
    }

    out
}

/// Cast a repaired series to whole-unit counts.
///
/// Fractional interpolation results are truncated (a person is not
/// half-vaccinated). Samples the repair could not bridge clamp to 0.
pub fn to_counts(series: &[f64]) -> Vec<i64> {
    series
        .iter()
        .map(|&v| if is_valid(v) { v as i64 } else { 0 })
        .collect()
}
