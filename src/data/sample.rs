//! Synthetic daily bars for offline runs.
//!
//! Closes follow a geometric Brownian motion with occasional jumps, so the
//! anomaly scorer has something to find. Everything is driven by a seeded RNG:
//! the same symbol, range and seed always produce the same series.

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use super::MarketDataSource;
use crate::domain::{Bar, Series, Symbol};
use crate::error::AppError;

/// Per-symbol starting level and daily log-volatility.
fn profile(symbol: Symbol) -> (f64, f64) {
    match symbol {
        Symbol::Btc => (60_000.0, 0.030),
        Symbol::Eth => (3_000.0, 0.040),
        Symbol::Xrp => (0.60, 0.050),
        Symbol::Ltc => (80.0, 0.045),
        Symbol::Ada => (0.45, 0.050),
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    pub seed: u64,
    /// Probability that a day's jump is `+jump_k` or `-jump_k` daily sigmas.
    pub jump_prob: f64,
    pub jump_k: f64,
    /// Probability that a day's close and volume are dropped (exercises gap filling).
    pub missing_prob: f64,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            jump_prob: 0.02,
            jump_k: 4.0,
            missing_prob: 0.0,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if !(0.0..0.5).contains(&self.jump_prob) {
            return Err(AppError::config("jump probability must be within [0, 0.5)"));
        }
        if !(self.jump_k.is_finite() && self.jump_k > 0.0) {
            return Err(AppError::config("jump magnitude must be > 0"));
        }
        if !(0.0..1.0).contains(&self.missing_prob) {
            return Err(AppError::config("missing probability must be within [0, 1)"));
        }
        Ok(())
    }
}

impl MarketDataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, symbol: Symbol, start: NaiveDate, end: NaiveDate) -> Result<Series, AppError> {
        self.validate()?;
        if end < start {
            return Err(AppError::unavailable(format!("empty date range {start}..={end}")));
        }

        let mut rng = StdRng::seed_from_u64(sample_seed(symbol, start, end, self.seed));
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| AppError::unavailable(format!("noise distribution error: {e}")))?;

        let (mut price, sigma) = profile(symbol);
        let correction = jump_mean_correction(sigma, self.jump_prob, self.jump_k);
        let days = (end - start).num_days() + 1;

        let mut bars = Vec::with_capacity(days as usize);
        for i in 0..days {
            let date = start + Duration::days(i);
            let open = price;

            let z = normal.sample(&mut rng);
            let jump = sample_jump(&mut rng, self.jump_prob, self.jump_k);
            price *= (sigma * (z + jump) - correction).exp();

            let wick = sigma * normal.sample(&mut rng).abs() * 0.5;
            let high = open.max(price) * (1.0 + wick);
            let low = open.min(price) * (1.0 - wick).max(0.5);
            // Volume scales with the size of the move.
            let volume = price * 1e6 * (1.0 + 5.0 * ((price / open).ln().abs() / sigma));

            let dropped = self.missing_prob > 0.0 && rng.gen_range(0.0..1.0) < self.missing_prob;
            bars.push(Bar {
                date,
                open: Some(open),
                high: Some(high),
                low: Some(low),
                close: (!dropped).then_some(price),
                volume: (!dropped).then_some(volume),
            });
        }

        tracing::debug!(%symbol, bars = bars.len(), seed = self.seed, "generated synthetic series");
        Series::new(symbol, bars)
    }
}

/// Fold the inputs through a SplitMix64 finalizer. Plain integer arithmetic
/// keeps the value identical across toolchains and platforms.
fn sample_seed(symbol: Symbol, start: NaiveDate, end: NaiveDate, seed: u64) -> u64 {
    let parts = [
        symbol as u64,
        i64::from(start.num_days_from_ce()) as u64,
        i64::from(end.num_days_from_ce()) as u64,
    ];
    parts.iter().fold(seed, |h, &p| splitmix64(h ^ p))
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// Mean correction so E[exp(log-noise)] == 1.0 (no drift from the jumps).
fn jump_mean_correction(sigma: f64, p: f64, k: f64) -> f64 {
    let p_none = 1.0 - 2.0 * p;
    let m1 = p_none + p * (sigma * k).exp() + p * (-sigma * k).exp();
    0.5 * sigma * sigma + m1.ln()
}

fn sample_jump(rng: &mut StdRng, p: f64, k: f64) -> f64 {
    let roll: f64 = rng.gen_range(0.0..1.0);
    if roll < p {
        k
    } else if roll < 2.0 * p {
        -k
    } else {
        0.0
    }
}
