use analysis_core::{numeric::clamp, AgentScore, MarketOutcome, PriceBar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::indicators::{atr14, closes, ma, volumes};

/// Closes needed before the trend signal means anything.
pub const MIN_CLOSES: usize = 10;

pub const INSUFFICIENT_HISTORY: &str = "insufficient price history";

/// Precomputed numeric facts of a price series as of one trading day. Shared
/// by the heuristic market signal, the LLM prompt and the trade plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub close: f64,
    pub ma20: f64,
    pub ma60: f64,
    pub atr14: f64,
    pub volume: f64,
    pub vol_ma20: f64,
    pub bars: usize,
}

impl TechnicalSnapshot {
    /// Compute over every bar on or before `date`. `bars` must be ascending.
    pub fn asof(bars: &[PriceBar], date: NaiveDate) -> Self {
        let end = bars.partition_point(|b| b.date <= date);
        Self::from_bars(&bars[..end])
    }

    pub fn from_bars(bars: &[PriceBar]) -> Self {
        let closes = closes(bars);
        let volumes = volumes(bars);
        Self {
            close: closes.last().copied().unwrap_or(0.0),
            ma20: ma(&closes, 20),
            ma60: ma(&closes, 60),
            atr14: atr14(bars),
            volume: volumes.last().copied().unwrap_or(0.0),
            vol_ma20: ma(&volumes, 20),
            bars: bars.len(),
        }
    }

    pub fn has_enough_history(&self) -> bool {
        self.bars >= MIN_CLOSES
    }

    /// Today's volume over its 20-day average, when that average is positive.
    pub fn vol_ratio(&self) -> Option<f64> {
        (self.vol_ma20 > 0.0).then(|| self.volume / self.vol_ma20)
    }

    /// `±0.5` for ma20 vs ma60 plus `±0.5` for close vs ma20. Ties count as down;
    /// a term is skipped when its averages are zero.
    pub fn trend(&self) -> f64 {
        let mut trend = 0.0;
        if self.ma20 != 0.0 && self.ma60 != 0.0 {
            trend += if self.ma20 > self.ma60 { 0.5 } else { -0.5 };
        }
        if self.ma20 != 0.0 {
            trend += if self.close > self.ma20 { 0.5 } else { -0.5 };
        }
        trend
    }

    pub fn vol_boost(&self) -> f64 {
        self.vol_ratio()
            .map(|r| clamp(r - 1.0, -0.5, 0.5))
            .unwrap_or(0.0)
    }

    pub fn index(&self) -> f64 {
        clamp(self.trend() + 0.5 * self.vol_boost(), -1.0, 1.0)
    }

    /// 0.6, reduced by up to 0.2 as ATR grows relative to price.
    pub fn confidence(&self) -> f64 {
        let mut conf = 0.6;
        if self.close > 0.0 && self.atr14 > 0.0 {
            conf -= clamp(self.atr14 / self.close * 10.0, 0.0, 0.2);
        }
        clamp(conf, 0.5, 0.9)
    }

    /// Heuristic score. Callers check [`has_enough_history`](Self::has_enough_history) first.
    pub fn score(&self) -> AgentScore {
        let mut rationale = vec![format!(
            "close {:.2}, ma20 {:.2}, ma60 {:.2}",
            self.close, self.ma20, self.ma60
        )];
        rationale.push(match self.vol_ratio() {
            Some(r) => format!("volume / 20-day average {:.2}", r),
            None => "volume average unavailable".to_string(),
        });
        rationale.push(format!("atr14 {:.2}", self.atr14));
        AgentScore::technical(self.index(), self.confidence(), rationale)
    }
}

/// Whether `date` has a bar, i.e. the market traded that day.
pub fn is_trading_day(bars: &[PriceBar], date: NaiveDate) -> bool {
    bars.iter().any(|b| b.date == date)
}

/// Fixed neutral score for short series.
pub fn insufficient_history() -> AgentScore {
    AgentScore::technical(0.0, 0.55, vec![INSUFFICIENT_HISTORY.to_string()])
}

/// Trend/volume/volatility market signal for one trading day.
///
/// A date without a bar is a non-trading day and is skipped rather than scored.
pub fn market_heuristic(bars: &[PriceBar], date: Option<NaiveDate>) -> MarketOutcome {
    let Some(date) = date.filter(|d| is_trading_day(bars, *d)) else {
        return MarketOutcome::Skipped {
            reason: "market closed".to_string(),
        };
    };

    let snapshot = TechnicalSnapshot::asof(bars, date);
    if !snapshot.has_enough_history() {
        return MarketOutcome::Ok(insufficient_history());
    }
    MarketOutcome::Ok(snapshot.score())
}
