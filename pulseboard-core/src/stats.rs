//! Stateless statistics helpers shared by the batch analyzer and the
//! live aggregator.
//!
//! All functions take a plain slice of `f64` and return `0.0` on empty
//! input. Callers must treat 0 as "no data", not "instant completion".

/// Arithmetic mean. Returns 0.0 on empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median via full sort + midpoint. Returns 0.0 on empty input.
///
/// Even-length input averages the two middle elements, so the result is
/// independent of the input order.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Percentile with linear interpolation. Returns 0.0 on empty input.
///
/// Sorts ascending and indexes at `(p/100) * (n-1)`; a fractional index
/// interpolates between the floor and ceil neighbors by fractional weight.
/// `p` is clamped to `[0, 100]`, so out-of-range requests return the min
/// or max. `percentile(values, 50.0)` agrees with [`median`].
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        return sorted[lower];
    }

    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_inputs_yield_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(percentile(&[], 95.0), 0.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[2.0, 4.0, 6.0]), 4.0);
        assert_eq!(mean(&[5.0]), 5.0);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_median_is_order_independent() {
        let a = [9.0, 1.0, 5.0, 3.0, 7.0];
        let b = [7.0, 9.0, 3.0, 5.0, 1.0];
        assert_eq!(median(&a), median(&b));
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&values, 0.0), 10.0);
        assert_eq!(percentile(&values, 100.0), 40.0);
        // rank 1.5 -> halfway between 20 and 30
        assert_eq!(percentile(&values, 50.0), 25.0);
        // rank 2.85 -> 30 + 0.85 * 10
        assert!((percentile(&values, 95.0) - 38.5).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_clamps_out_of_range() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(percentile(&values, 150.0), 3.0);
        assert_eq!(percentile(&values, -25.0), 1.0);
        assert_eq!(percentile(&[], 150.0), 0.0);
    }

    #[test]
    fn test_percentile_50_matches_median() {
        let datasets: [&[f64]; 3] = [
            &[125.0],
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            &[42.0, 17.0, 99.0, 3.0],
        ];
        for values in datasets {
            assert_eq!(percentile(values, 50.0), median(values));
        }
    }
}
