use analysis_core::{numeric::trailing_mean, PriceBar};

/// Moving average of the last `min(n, len)` values; 0 for empty input.
pub fn ma(data: &[f64], n: usize) -> f64 {
    trailing_mean(data, n)
}

/// True range of `bar` given the previous close.
pub fn true_range(bar: &PriceBar, prev_close: f64) -> f64 {
    let high_low = bar.high - bar.low;
    let high_close = (bar.high - prev_close).abs();
    let low_close = (bar.low - prev_close).abs();
    high_low.max(high_close).max(low_close)
}

/// Simple-average true range over the last `min(period, len - 1)` bars.
/// 0 when fewer than two bars are available.
pub fn atr(bars: &[PriceBar], period: usize) -> f64 {
    if bars.len() < 2 {
        return 0.0;
    }

    let true_ranges: Vec<f64> = bars
        .windows(2)
        .map(|pair| true_range(&pair[1], pair[0].close))
        .collect();

    trailing_mean(&true_ranges, period)
}

/// 14-period ATR used by the market signal and the trade plan.
pub fn atr14(bars: &[PriceBar]) -> f64 {
    atr(bars, 14)
}

pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

pub fn volumes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume).collect()
}
