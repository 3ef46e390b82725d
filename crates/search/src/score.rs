use std::cmp::Ordering;

/// Rounds to `decimals` places, ties to even.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Descending comparison that treats NaN as equal, so stable sorts keep input order.
pub(crate) fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_requested_precision() {
        assert_eq!(round_to(1.0 / 3.0, 3), 0.333);
        assert_eq!(round_to(2.0 / 3.0, 4), 0.6667);
        assert_eq!(round_to(0.0625, 3), 0.062);
    }

    #[test]
    fn descending_orders_high_first() {
        let mut values = vec![0.5, 2.0, 1.0];
        values.sort_by(|a, b| descending(*a, *b));
        assert_eq!(values, vec![2.0, 1.0, 0.5]);
        assert_eq!(descending(f64::NAN, 1.0), Ordering::Equal);
    }
}
