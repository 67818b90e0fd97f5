use analysis_core::{numeric::correlation, HistoryDay};

/// Minimum trading days before [`corr20`] reports anything.
pub const CORR20_MIN_DAYS: usize = 22;

const CORR_WINDOW: usize = 20;

/// Pearson correlation between a day's sentiment and the next day's return,
/// over the last 20 pairs. `days` must be sorted ascending; fewer than 22
/// days yields 0.
pub fn corr20(days: &[HistoryDay]) -> f64 {
    if days.len() < CORR20_MIN_DAYS {
        return 0.0;
    }
    let window = &days[days.len() - (CORR_WINDOW + 1)..];

    let (sentiment, next_return): (Vec<f64>, Vec<f64>) = window
        .windows(2)
        .map(|pair| {
            let (c0, c1) = (pair[0].close, pair[1].close);
            let ret = if c0 == 0.0 { 0.0 } else { (c1 - c0) / c0 };
            (pair[0].sentiment, ret)
        })
        .unzip();

    correlation(&sentiment, &next_return)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use approx::assert_relative_eq;

    fn history(n: usize, sentiment: impl Fn(usize) -> f64, close: impl Fn(usize) -> f64) -> Vec<HistoryDay> {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        (0..n)
            .map(|i| HistoryDay {
                date: start + chrono::Duration::days(i as i64),
                sentiment: sentiment(i),
                close: close(i),
            })
            .collect()
    }

    #[test]
    fn test_requires_enough_history() {
        let days = history(21, |i| i as f64, |i| 100.0 + i as f64);
        assert_eq!(corr20(&days), 0.0);
    }

    #[test]
    fn test_sentiment_leading_returns() {
        // Alternate bullish/bearish days, each followed by a matching move
        let sentiment = |i: usize| if i % 2 == 0 { 0.5 } else { -0.5 };
        let close = |i: usize| if i % 2 == 0 { 100.0 } else { 102.0 };
        let days = history(30, sentiment, close);
        assert_relative_eq!(corr20(&days), 1.0, epsilon = 1e-9);

        let inverted = history(30, |i| -sentiment(i), close);
        assert_relative_eq!(corr20(&inverted), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_sentiment_has_no_correlation() {
        let days = history(25, |_| 0.3, |i| 100.0 + (i % 3) as f64);
        assert_eq!(corr20(&days), 0.0);
    }

    #[test]
    fn test_zero_close_counts_as_flat_return() {
        let days = history(22, |i| (i % 4) as f64, |i| if i == 10 { 0.0 } else { 100.0 + i as f64 });
        let c = corr20(&days);
        assert!(c.is_finite());
        assert!((-1.0..=1.0).contains(&c));
    }
}
