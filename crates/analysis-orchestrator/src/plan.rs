use analysis_core::{
    numeric::round2, AgentScore, Direction, HorizonPlan, PlanOutcome, PositionSize, TradePlan,
};
use chrono::NaiveDate;
use technical_analysis::TechnicalSnapshot;

pub const PLAN_DISCLAIMER: &str =
    "Structured template derived from historical volatility (ATR) and the fused score; not investment advice.";

/// ATR multiples for one holding horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonMultipliers {
    pub entry: f64,
    pub stop: f64,
    pub target1: f64,
    pub target2: f64,
}

pub const SHORT_TERM: HorizonMultipliers = HorizonMultipliers {
    entry: 0.5,
    stop: 1.5,
    target1: 1.0,
    target2: 2.0,
};

pub const SWING: HorizonMultipliers = HorizonMultipliers {
    entry: 1.0,
    stop: 2.5,
    target1: 2.0,
    target2: 4.0,
};

pub const MID_TERM: HorizonMultipliers = HorizonMultipliers {
    entry: 1.5,
    stop: 3.5,
    target1: 3.0,
    target2: 6.0,
};

fn horizon(
    close: f64,
    atr: f64,
    direction: Direction,
    size: PositionSize,
    m: HorizonMultipliers,
) -> HorizonPlan {
    let entry_zone = [round2(close - atr * m.entry), round2(close + atr * m.entry)];
    // +1 above close for targets of a long, mirrored for a short
    let side = match direction {
        Direction::Long => 1.0,
        Direction::Short => -1.0,
        Direction::Neutral => {
            return HorizonPlan {
                direction,
                entry_zone,
                stop: None,
                target1: None,
                target2: None,
                position_size_label: size,
                triggers: vec!["Stand aside until the fused score leaves the neutral band".to_string()],
            }
        }
    };

    HorizonPlan {
        direction,
        entry_zone,
        stop: Some(round2(close - side * atr * m.stop)),
        target1: Some(round2(close + side * atr * m.target1)),
        target2: Some(round2(close + side * atr * m.target2)),
        position_size_label: size,
        triggers: vec![
            "Enter if price breaks out of the entry zone on rising volume".to_string(),
            "Exit without exception if the stop is hit".to_string(),
        ],
    }
}

/// ATR-based plan for three horizons.
///
/// Needs a positive close and ATR; anything else is reported as unavailable
/// rather than producing levels.
pub fn trade_plan(snapshot: &TechnicalSnapshot, asof: NaiveDate, final_score: &AgentScore) -> PlanOutcome {
    if snapshot.bars == 0 {
        return PlanOutcome::Unavailable {
            reason: "missing price bars".to_string(),
        };
    }
    let (close, atr) = (snapshot.close, snapshot.atr14);
    if close <= 0.0 || atr <= 0.0 {
        return PlanOutcome::Unavailable {
            reason: "insufficient price history for ATR".to_string(),
        };
    }

    let direction = Direction::from_index(final_score.index());
    let size = PositionSize::from_confidence(final_score.confidence());

    PlanOutcome::Ok(TradePlan {
        asof,
        direction,
        short_term: horizon(close, atr, direction, size, SHORT_TERM),
        swing: horizon(close, atr, direction, size, SWING),
        mid_term: horizon(close, atr, direction, size, MID_TERM),
        notes: vec![PLAN_DISCLAIMER.to_string()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::AgentMode;

    fn snapshot(close: f64, atr14: f64) -> TechnicalSnapshot {
        TechnicalSnapshot {
            close,
            ma20: close,
            ma60: close,
            atr14,
            volume: 0.0,
            vol_ma20: 0.0,
            bars: 30,
        }
    }

    fn fused(index: f64, confidence: f64) -> AgentScore {
        AgentScore::new(index, confidence, AgentMode::Heuristic, vec![])
    }

    fn asof() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 23).unwrap()
    }

    #[test]
    fn test_long_plan_levels() {
        let outcome = trade_plan(&snapshot(100.0, 2.0), asof(), &fused(0.5, 0.7));
        let plan = outcome.plan().unwrap();
        assert_eq!(plan.direction, Direction::Long);

        let st = &plan.short_term;
        assert_eq!(st.entry_zone, [99.0, 101.0]);
        assert_eq!(st.stop, Some(97.0));
        assert_eq!(st.target1, Some(102.0));
        assert_eq!(st.target2, Some(104.0));
        assert_eq!(st.position_size_label, PositionSize::Medium);

        assert_eq!(plan.swing.entry_zone, [98.0, 102.0]);
        assert_eq!(plan.swing.stop, Some(95.0));
        assert_eq!(plan.mid_term.target2, Some(112.0));
        assert_eq!(plan.notes, vec![PLAN_DISCLAIMER.to_string()]);
    }

    #[test]
    fn test_short_plan_is_mirrored() {
        let outcome = trade_plan(&snapshot(100.0, 2.0), asof(), &fused(-0.6, 0.85));
        let plan = outcome.plan().unwrap();
        assert_eq!(plan.direction, Direction::Short);
        assert_eq!(plan.short_term.stop, Some(103.0));
        assert_eq!(plan.short_term.target1, Some(98.0));
        assert_eq!(plan.mid_term.target2, Some(88.0));
        assert_eq!(plan.mid_term.position_size_label, PositionSize::Heavy);
    }

    #[test]
    fn test_neutral_plan_has_entry_zone_only() {
        let outcome = trade_plan(&snapshot(3512.0, 40.0), asof(), &fused(0.2, 0.55));
        let plan = outcome.plan().unwrap();
        assert_eq!(plan.direction, Direction::Neutral);
        for h in [&plan.short_term, &plan.swing, &plan.mid_term] {
            assert!(h.stop.is_none() && h.target1.is_none() && h.target2.is_none());
            assert_eq!(h.position_size_label, PositionSize::Light);
        }
        assert_eq!(plan.short_term.entry_zone, [3492.0, 3532.0]);
    }

    #[test]
    fn test_unavailable_without_usable_prices() {
        let empty = TechnicalSnapshot { bars: 0, ..snapshot(0.0, 0.0) };
        assert!(matches!(
            trade_plan(&empty, asof(), &fused(0.5, 0.7)),
            PlanOutcome::Unavailable { .. }
        ));
        assert!(matches!(
            trade_plan(&snapshot(100.0, 0.0), asof(), &fused(0.5, 0.7)),
            PlanOutcome::Unavailable { .. }
        ));
        assert!(matches!(
            trade_plan(&snapshot(-1.0, 2.0), asof(), &fused(0.5, 0.7)),
            PlanOutcome::Unavailable { .. }
        ));
    }
}
