//! Simple moving average over a trailing window.

/// Trailing arithmetic mean of `window` values ending at each index (inclusive).
///
/// The first `window - 1` entries are `None`, as is any entry whose window
/// contains a missing value.
pub fn simple_moving_average(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    for t in 0..values.len() {
        if t + 1 < window {
            out.push(None);
            continue;
        }
        let slice = &values[t + 1 - window..=t];
        let sum: Option<f64> = slice.iter().copied().sum();
        out.push(sum.map(|s| s / window as f64));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn short_and_long_windows_match_reference_values() {
        let closes = some(&[10.0, 12.0, 14.0, 16.0]);
        assert_eq!(
            simple_moving_average(&closes, 2),
            vec![None, Some(11.0), Some(13.0), Some(15.0)]
        );
        assert_eq!(
            simple_moving_average(&closes, 3),
            vec![None, None, Some(12.0), Some(14.0)]
        );
    }

    #[test]
    fn nulls_are_exactly_the_warm_up_rows() {
        let closes = some(&(1..=40).map(f64::from).collect::<Vec<_>>());
        for window in [2, 5, 20] {
            let sma = simple_moving_average(&closes, window);
            assert!(sma[..window - 1].iter().all(Option::is_none));
            assert!(sma[window - 1..].iter().all(Option::is_some));
        }
    }

    #[test]
    fn series_shorter_than_window_is_all_null() {
        let closes = some(&[1.0, 2.0]);
        assert_eq!(simple_moving_average(&closes, 3), vec![None, None]);
    }

    #[test]
    fn missing_value_poisons_its_windows() {
        let closes = vec![Some(1.0), None, Some(3.0), Some(5.0)];
        assert_eq!(simple_moving_average(&closes, 2), vec![None, None, None, Some(4.0)]);
    }
}
