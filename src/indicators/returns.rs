//! Daily percentage returns.

/// Daily returns plus the rows where the previous close was zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyReturns {
    pub values: Vec<Option<f64>>,
    /// Row indices whose return is undefined because `close[t-1] == 0`.
    pub zero_division: Vec<usize>,
}

/// `(close[t] - close[t-1]) / close[t-1]`.
///
/// Undefined (`None`) at `t = 0`, when either close is missing, or when the
/// previous close is zero.
pub fn daily_returns(closes: &[Option<f64>]) -> DailyReturns {
    let mut values = Vec::with_capacity(closes.len());
    let mut zero_division = Vec::new();

    for t in 0..closes.len() {
        if t == 0 {
            values.push(None);
            continue;
        }
        let value = match (closes[t - 1], closes[t]) {
            (Some(prev), Some(_)) if prev == 0.0 => {
                zero_division.push(t);
                None
            }
            (Some(prev), Some(cur)) => Some((cur - prev) / prev),
            _ => None,
        };
        values.push(value);
    }

    DailyReturns {
        values,
        zero_division,
    }
}
