use analysis_core::{numeric::clamp_index, AgentMode, AgentScore, FinalOutcome, FusionWeights};

pub const NO_MARKET_SIGNAL: &str = "no market signal: market closed on the reference date";

/// Weighted fusion of the agent scores.
///
/// Without a market score the macro/symbol weights are renormalised to sum to 1
/// (50/50 when both are zero) and the outcome is marked `Reduced`.
pub fn fuse(
    weights: &FusionWeights,
    macro_score: &AgentScore,
    symbol_score: &AgentScore,
    market: Option<&AgentScore>,
) -> FinalOutcome {
    match market {
        Some(market) => {
            let index = weights.macro_news * macro_score.index()
                + weights.symbol * symbol_score.index()
                + weights.market * market.index();
            let confidence = weights.macro_news * macro_score.confidence()
                + weights.symbol * symbol_score.confidence()
                + weights.market * market.confidence();
            FinalOutcome::Ok(AgentScore::new(
                clamp_index(index),
                confidence,
                AgentMode::Heuristic,
                vec!["weighted macro, symbol news and market signals".to_string()],
            ))
        }
        None => {
            let total = weights.macro_news + weights.symbol;
            let (wm, ws) = if total <= 0.0 {
                (0.5, 0.5)
            } else {
                (weights.macro_news / total, weights.symbol / total)
            };
            let index = wm * macro_score.index() + ws * symbol_score.index();
            let confidence = wm * macro_score.confidence() + ws * symbol_score.confidence();
            FinalOutcome::Reduced {
                score: AgentScore::new(
                    clamp_index(index),
                    confidence,
                    AgentMode::Heuristic,
                    vec!["macro and symbol news only".to_string()],
                ),
                reason: NO_MARKET_SIGNAL.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn score(index: f64, confidence: f64) -> AgentScore {
        AgentScore::new(index, confidence, AgentMode::Heuristic, vec![])
    }

    #[test]
    fn test_three_way_fusion() {
        let out = fuse(
            &FusionWeights::default(),
            &score(0.5, 0.7),
            &score(-0.2, 0.6),
            Some(&score(0.8, 0.8)),
        );
        assert!(!out.is_reduced());
        // 0.15 - 0.06 + 0.32
        assert_relative_eq!(out.score().index(), 0.41, epsilon = 1e-12);
        // 0.21 + 0.18 + 0.32
        assert_relative_eq!(out.score().confidence(), 0.71, epsilon = 1e-12);
        assert_eq!(out.score().mode(), AgentMode::Heuristic);
    }

    #[test]
    fn test_missing_market_renormalises() {
        let out = fuse(&FusionWeights::default(), &score(0.6, 0.8), &score(0.2, 0.6), None);
        assert!(out.is_reduced());
        assert_relative_eq!(out.score().index(), 0.4, epsilon = 1e-12);
        assert_relative_eq!(out.score().confidence(), 0.7, epsilon = 1e-12);
        match out {
            FinalOutcome::Reduced { reason, .. } => assert!(reason.contains("no market signal")),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_zero_news_weights_split_evenly() {
        let weights = FusionWeights {
            macro_news: 0.0,
            symbol: 0.0,
            market: 1.0,
        };
        let out = fuse(&weights, &score(1.0, 0.9), &score(0.0, 0.5), None);
        assert_relative_eq!(out.score().index(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(out.score().confidence(), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_outputs_are_bounded() {
        let heavy = FusionWeights {
            macro_news: 2.0,
            symbol: 2.0,
            market: 2.0,
        };
        let out = fuse(&heavy, &score(1.0, 0.95), &score(1.0, 0.95), Some(&score(1.0, 0.9)));
        assert_eq!(out.score().index(), 1.0);
        assert_eq!(out.score().confidence(), 0.95);

        let light = FusionWeights {
            macro_news: 0.1,
            symbol: 0.1,
            market: 0.1,
        };
        let out = fuse(&light, &score(-0.2, 0.6), &score(-0.2, 0.6), Some(&score(-0.2, 0.6)));
        assert_eq!(out.score().confidence(), 0.5);
    }
}
