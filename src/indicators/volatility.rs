//! Rolling historical volatility of daily returns.

use crate::math::sample_std;

/// Sample std dev of the trailing `window` returns, scaled by `sqrt(window)`.
///
/// The scaling is a fixed part of the dashboard's volatility definition even
/// though the window is not a year. `None` until `window` consecutive returns are
/// defined.
pub fn rolling_volatility(returns: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; returns.len()];
    }

    let scale = (window as f64).sqrt();
    let mut out = Vec::with_capacity(returns.len());
    for t in 0..returns.len() {
        if t + 1 < window {
            out.push(None);
            continue;
        }
        let slice: Option<Vec<f64>> = returns[t + 1 - window..=t].iter().copied().collect();
        out.push(slice.and_then(|s| sample_std(&s)).map(|std| std * scale));
    }
    out
}
