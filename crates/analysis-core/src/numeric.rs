//! Shared numeric helpers for scoring. NaN and empty input never panic.

/// Clamp `v` into `[lo, hi]`. NaN collapses to `lo`; signed indices go
/// through [`clamp_index`] instead.
pub fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    if v.is_nan() {
        return lo;
    }
    v.max(lo).min(hi)
}

/// Clamp a sentiment index into `[-1, 1]`. NaN reads as neutral.
pub fn clamp_index(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    clamp(v, -1.0, 1.0)
}

/// Round to two decimals, the precision of every published price level.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Mean of the last `min(n, len)` values (at least one). Empty input yields 0.
pub fn trailing_mean(data: &[f64], n: usize) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let n = n.clamp(1, data.len());
    mean(&data[data.len() - n..])
}

/// Pearson correlation of two equally sized series.
/// Returns 0.0 for mismatched lengths, fewer than two points, or zero variance.
pub fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let num: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let den_x: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    let den_y: f64 = ys.iter().map(|y| (y - my).powi(2)).sum();
    if den_x <= 0.0 || den_y <= 0.0 {
        return 0.0;
    }
    num / (den_x * den_y).sqrt()
}
