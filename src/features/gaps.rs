//! Gap filling for missing market values.
//!
//! Two policies, applied per column:
//!
//! - prices and volume (`close`, `volume`): forward fill from the most recent
//!   preceding value. A leading gap stays missing; a later value never fills an
//!   earlier gap.
//! - derived signals (`daily_return`, `volatility`): missing means "no signal" and
//!   becomes `0.0`.
//!
//! Present values and row count are never altered. SMA and RSI warm-up nulls are
//! left alone.

use crate::domain::{Column, FeatureTable, Series};

/// Forward fill in place. Returns the number of cells filled.
pub fn forward_fill(values: &mut [Option<f64>]) -> usize {
    let mut last = None;
    let mut filled = 0;
    for v in values.iter_mut() {
        match v {
            Some(x) => last = Some(*x),
            None => {
                if let Some(prev) = last {
                    *v = Some(prev);
                    filled += 1;
                }
            }
        }
    }
    filled
}

/// Replace missing cells with `0.0`. Returns the number of cells filled.
pub fn zero_fill(values: &mut [Option<f64>]) -> usize {
    let mut filled = 0;
    for v in values.iter_mut().filter(|v| v.is_none()) {
        *v = Some(0.0);
        filled += 1;
    }
    filled
}

/// Forward-fill `close` and `volume` of a raw series.
pub fn fill_prices(series: &Series) -> Series {
    let mut closes = series.closes();
    let mut volumes = series.volumes();
    let filled_close = forward_fill(&mut closes);
    let filled_volume = forward_fill(&mut volumes);

    if filled_close + filled_volume > 0 {
        tracing::debug!(
            symbol = %series.symbol(),
            filled_close,
            filled_volume,
            "forward-filled price gaps"
        );
    }
    if closes.iter().all(Option::is_none) {
        tracing::warn!(symbol = %series.symbol(), "close column is entirely missing");
    }
    if volumes.iter().all(Option::is_none) {
        tracing::debug!(symbol = %series.symbol(), "volume column is entirely missing");
    }

    series.with_close_volume(closes, volumes)
}

/// Zero-fill `daily_return` and `volatility` of an assembled table.
pub fn fill_derived(table: &mut FeatureTable) -> usize {
    let mut returns = table.column(Column::DailyReturn);
    let mut volatility = table.column(Column::Volatility);
    let filled = zero_fill(&mut returns) + zero_fill(&mut volatility);

    for ((row, r), v) in table.rows.iter_mut().zip(returns).zip(volatility) {
        row.indicators.daily_return = r;
        row.indicators.volatility = v;
    }
    filled
}
