use analysis_core::{numeric::round2, PriceBar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Price section of an instrument report.
///
/// On a non-trading day the last available bar is reported and flagged stale,
/// so news for the day can still be shown next to a price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PriceContext {
    Ok {
        #[serde(flatten)]
        bar: PriceBar,
        is_trading_day: bool,
        is_stale: bool,
        pct_change: Option<f64>,
    },
    Unavailable {
        reason: String,
    },
}

impl PriceContext {
    /// `bars` must be ascending by date.
    pub fn build(bars: &[PriceBar], date: Option<NaiveDate>) -> Self {
        if bars.is_empty() {
            return PriceContext::Unavailable {
                reason: "missing price bars".to_string(),
            };
        }

        let pos = date
            .and_then(|d| bars.iter().rposition(|b| b.date == d))
            .unwrap_or(bars.len() - 1);
        let bar = &bars[pos];
        let is_trading_day = date.is_some_and(|d| d == bar.date);
        let is_stale = !is_trading_day;

        if is_stale {
            tracing::info!("No bar for {:?}; using price as of {}", date, bar.date);
        }

        let pct_change = pos
            .checked_sub(1)
            .map(|prev| bars[prev].close)
            .filter(|prev_close| *prev_close != 0.0)
            .map(|prev_close| round2((bar.close - prev_close) / prev_close * 100.0));

        PriceContext::Ok {
            bar: bar.clone(),
            is_trading_day,
            is_stale,
            pct_change,
        }
    }

    pub fn bar(&self) -> Option<&PriceBar> {
        match self {
            PriceContext::Ok { bar, .. } => Some(bar),
            PriceContext::Unavailable { .. } => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, PriceContext::Ok { is_stale: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars() -> Vec<PriceBar> {
        [("2026-02-19", 100.0), ("2026-02-20", 102.0), ("2026-02-23", 101.0)]
            .iter()
            .map(|(d, c)| PriceBar {
                date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
                open: *c,
                high: *c,
                low: *c,
                close: *c,
                volume: 10.0,
                open_interest: 5.0,
            })
            .collect()
    }

    fn date(s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }

    #[test]
    fn test_trading_day_context() {
        let ctx = PriceContext::build(&bars(), date("2026-02-20"));
        match ctx {
            PriceContext::Ok { bar, is_trading_day, is_stale, pct_change } => {
                assert_eq!(bar.close, 102.0);
                assert!(is_trading_day);
                assert!(!is_stale);
                assert_eq!(pct_change, Some(2.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_weekend_uses_last_bar_and_is_stale() {
        let ctx = PriceContext::build(&bars(), date("2026-02-22"));
        assert!(ctx.is_stale());
        let bar = ctx.bar().unwrap();
        assert_eq!(bar.date, date("2026-02-23").unwrap());
        if let PriceContext::Ok { pct_change, .. } = ctx {
            assert_eq!(pct_change, Some(-0.98));
        }
    }

    #[test]
    fn test_first_bar_has_no_change() {
        let ctx = PriceContext::build(&bars(), date("2026-02-19"));
        if let PriceContext::Ok { pct_change, .. } = &ctx {
            assert_eq!(*pct_change, None);
        }
        assert!(!ctx.is_stale());
    }

    #[test]
    fn test_missing_bars() {
        let ctx = PriceContext::build(&[], date("2026-02-19"));
        assert!(matches!(ctx, PriceContext::Unavailable { .. }));
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["status"], "unavailable");
    }

    #[test]
    fn test_serialized_shape() {
        let ctx = PriceContext::build(&bars(), date("2026-02-23"));
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["close"], 101.0);
        assert_eq!(json["date"], "2026-02-23");
        assert_eq!(json["is_stale"], false);
    }
}
