//! Numeric helpers for sample arrays.

/// Median of a numeric sample.
///
/// The sample is sorted ascending. Odd-length samples return the middle
/// element, even-length samples the mean of the two middle elements. An
/// empty sample yields 0.
pub fn median(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let half = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[half] as f64
    } else {
        (sorted[half - 1] as f64 + sorted[half] as f64) / 2.0
    }
}
