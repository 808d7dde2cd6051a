//! Relative Strength Index (RSI).
//!
//! Measures the speed and change of price movements on a 0-100 scale.
//! RSI > 70 is typically considered overbought, < 30 oversold.

/// RSI over the trailing `window` close-to-close changes ending at each index.
///
/// Uses simple averages of gains and losses within the window:
/// `RS = avg_gain / avg_loss`, `RSI = 100 - 100 / (1 + RS)`.
///
/// - `None` for `t < window` (not enough changes yet) or when a change in the
///   window involves a missing close.
/// - `100` when the window contains no downward move.
pub fn relative_strength_index(closes: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; closes.len()];
    }

    let changes: Vec<Option<f64>> = std::iter::once(None)
        .chain(closes.windows(2).map(|w| Some(w[1]? - w[0]?)))
        .collect();

    let mut out = Vec::with_capacity(closes.len());
    for t in 0..closes.len() {
        if t < window {
            out.push(None);
            continue;
        }
        let slice: Option<Vec<f64>> = changes[t + 1 - window..=t].iter().copied().collect();
        out.push(slice.map(|s| rsi_from_changes(&s)));
    }
    out
}

fn rsi_from_changes(changes: &[f64]) -> f64 {
    let (gain, loss) = changes.iter().fold((0.0, 0.0), |(g, l), &change| {
        if change > 0.0 {
            (g + change, l)
        } else {
            (g, l - change)
        }
    });
    let n = changes.len() as f64;
    let (avg_gain, avg_loss) = (gain / n, loss / n);

    if avg_loss == 0.0 {
        100.0 // No losses = max RSI
    } else {
        let rs = avg_gain / avg_loss;
        (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn warm_up_is_window_rows() {
        let closes = some(&[1.0, 2.0, 3.0, 2.0, 4.0, 5.0]);
        let rsi = relative_strength_index(&closes, 3);
        assert_eq!(&rsi[..3], &[None, None, None]);
        assert!(rsi[3..].iter().all(Option::is_some));
    }

    #[test]
    fn no_downward_moves_is_one_hundred() {
        let closes = some(&[1.0, 2.0, 3.0, 4.0]);
        let rsi = relative_strength_index(&closes, 3);
        assert_eq!(rsi[3], Some(100.0));
    }

    #[test]
    fn only_downward_moves_is_zero() {
        let closes = some(&[4.0, 3.0, 2.0, 1.0]);
        let rsi = relative_strength_index(&closes, 3);
        assert_eq!(rsi[3], Some(0.0));
    }

    #[test]
    fn balanced_moves_give_fifty() {
        let closes = some(&[10.0, 11.0, 10.0, 11.0, 10.0]);
        let rsi = relative_strength_index(&closes, 4);
        assert!((rsi[4].unwrap() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn rsi_stays_within_bounds_on_random_walks() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut price = 100.0;
            let closes: Vec<Option<f64>> = (0..200)
                .map(|_| {
                    price *= 1.0 + rng.gen_range(-0.05..0.05);
                    Some(price)
                })
                .collect();
            for v in relative_strength_index(&closes, 14).into_iter().flatten() {
                assert!((0.0..=100.0).contains(&v), "RSI out of range: {v}");
            }
        }
    }

    #[test]
    fn missing_close_nulls_affected_windows() {
        let closes = vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0)];
        let rsi = relative_strength_index(&closes, 2);
        assert_eq!(rsi[2], None);
        assert_eq!(rsi[3], None);
        assert_eq!(rsi[4], None);
        assert_eq!(rsi[5], Some(100.0));
    }
}
