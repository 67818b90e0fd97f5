use analysis_core::{AgentMode, AgentScore, AnalysisError, FundamentalsSnapshot, NewsItem};
use async_trait::async_trait;
use llm_client::{LlmError, LlmProvider, LlmVerdict};
use sentiment_analysis::sentiment_from_analyzed;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use technical_analysis::TechnicalSnapshot;
use thiserror::Error;

/// Headlines sent to the model per call.
pub const MAX_PROMPT_HEADLINES: usize = 30;
/// Characters kept per headline in a prompt.
pub const MAX_HEADLINE_CHARS: usize = 200;
/// Titles quoted as rationale by the heuristic news agents.
const HEURISTIC_RATIONALE_TITLES: usize = 3;

/// Market LLM confidence ceiling when fundamentals are not `ok`.
pub const MISSING_FUNDAMENTALS_CAP: f64 = 0.75;
/// Market LLM confidence ceiling when fundamentals are from another day.
pub const STALE_FUNDAMENTALS_CAP: f64 = 0.72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Macro,
    Symbol,
    Market,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Macro => "macro",
            AgentKind::Symbol => "symbol",
            AgentKind::Market => "market",
        }
    }
}

/// A strategy that failed and was skipped in favour of the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackNote {
    pub agent: AgentKind,
    pub strategy: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    /// The strategy does not apply to this input (e.g. no headlines to send).
    #[error("not applicable: {0}")]
    NotApplicable(String),

    /// The strategy ran but produced nothing trustworthy.
    #[error("unusable: {0}")]
    Unusable(String),
}

impl From<LlmError> for StrategyError {
    fn from(e: LlmError) -> Self {
        StrategyError::Unusable(e.to_string())
    }
}

/// Headlines handed to a news agent.
#[derive(Debug, Clone)]
pub struct NewsBrief {
    pub kind: AgentKind,
    pub date: String,
    /// Instrument name for symbol news; `None` for macro news.
    pub subject: Option<String>,
    pub items: Vec<NewsItem>,
}

/// Precomputed market facts handed to a market agent.
#[derive(Debug, Clone)]
pub struct MarketBrief {
    pub date: String,
    pub subject: String,
    pub snapshot: TechnicalSnapshot,
    pub fundamentals: FundamentalsSnapshot,
}

/// One way of producing an agent score.
#[async_trait]
pub trait ScoreStrategy<I: Send + Sync>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score(&self, input: &I) -> Result<AgentScore, StrategyError>;
}

/// Ordered strategies tried until one yields a score.
pub struct ScoreChain<I: Send + Sync> {
    strategies: Vec<Arc<dyn ScoreStrategy<I>>>,
}

impl<I: Send + Sync> ScoreChain<I> {
    pub fn new(strategies: Vec<Arc<dyn ScoreStrategy<I>>>) -> Self {
        Self { strategies }
    }

    /// Score with the first strategy that succeeds. Every unusable result on
    /// the way is returned as a [`FallbackNote`].
    pub async fn run(
        &self,
        agent: AgentKind,
        input: &I,
    ) -> Result<(AgentScore, Vec<FallbackNote>), AnalysisError> {
        let mut notes = Vec::new();
        for strategy in &self.strategies {
            match strategy.score(input).await {
                Ok(score) => return Ok((score, notes)),
                Err(StrategyError::NotApplicable(reason)) => {
                    tracing::debug!("{} agent: {} skipped ({})", agent.as_str(), strategy.name(), reason);
                }
                Err(StrategyError::Unusable(reason)) => {
                    tracing::warn!(
                        "{} agent: {} unusable, falling back: {}",
                        agent.as_str(),
                        strategy.name(),
                        reason
                    );
                    notes.push(FallbackNote {
                        agent,
                        strategy: strategy.name().to_string(),
                        reason,
                    });
                }
            }
        }
        Err(AnalysisError::InsufficientData(format!(
            "no scoring strategy produced a {} score",
            agent.as_str()
        )))
    }
}

/// Weighted lexicon aggregate; rationale quotes the top-ranked titles.
pub struct HeuristicNewsScorer;

#[async_trait]
impl ScoreStrategy<NewsBrief> for HeuristicNewsScorer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn score(&self, input: &NewsBrief) -> Result<AgentScore, StrategyError> {
        let agg = sentiment_from_analyzed(&input.items);
        let rationale = input
            .items
            .iter()
            .take(HEURISTIC_RATIONALE_TITLES)
            .map(|it| it.title.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Ok(AgentScore::new(agg.index, agg.confidence, AgentMode::Heuristic, rationale))
    }
}

async fn ask(
    provider: &dyn LlmProvider,
    timeout: Duration,
    system: &str,
    user: &str,
) -> Result<LlmVerdict, StrategyError> {
    let reply = tokio::time::timeout(timeout, provider.complete_json(system, user))
        .await
        .map_err(|_| LlmError::Timeout)??;
    Ok(LlmVerdict::from_object(&reply)?)
}

fn headline_list(items: &[NewsItem]) -> String {
    items
        .iter()
        .take(MAX_PROMPT_HEADLINES)
        .map(|it| format!("- {}", it.title.chars().take(MAX_HEADLINE_CHARS).collect::<String>()))
        .collect::<Vec<_>>()
        .join("\n")
}

const JSON_CONTRACT: &str = "Reply with a single JSON object only, with exactly these fields: \
index (number from -1 to 1), confidence (number from 0.5 to 0.95), \
rationale (array of at most 5 short strings). No other fields, no Markdown.";

/// LLM scoring of a headline list.
pub struct LlmNewsScorer {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl LlmNewsScorer {
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    fn prompts(input: &NewsBrief) -> (String, String) {
        let role = match input.kind {
            AgentKind::Macro => "a macro news sentiment agent for futures trading",
            _ => "an instrument news sentiment agent for futures trading",
        };
        let system = format!("You are {}. {}", role, JSON_CONTRACT);
        let header = match &input.subject {
            Some(name) => format!("Date {}, instrument {}. Related headlines:", input.date, name),
            None => format!("Date {}. Macro headlines:", input.date),
        };
        (system, format!("{}\n{}", header, headline_list(&input.items)))
    }
}

#[async_trait]
impl ScoreStrategy<NewsBrief> for LlmNewsScorer {
    fn name(&self) -> &'static str {
        self.provider.backend_name()
    }

    async fn score(&self, input: &NewsBrief) -> Result<AgentScore, StrategyError> {
        if input.items.is_empty() {
            return Err(StrategyError::NotApplicable("no headlines".to_string()));
        }
        let (system, user) = Self::prompts(input);
        let verdict = ask(self.provider.as_ref(), self.timeout, &system, &user).await?;
        Ok(verdict.into_score())
    }
}

/// Trend/volume/volatility score from the snapshot.
pub struct HeuristicMarketScorer;

#[async_trait]
impl ScoreStrategy<MarketBrief> for HeuristicMarketScorer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn score(&self, input: &MarketBrief) -> Result<AgentScore, StrategyError> {
        Ok(input.snapshot.score())
    }
}

/// LLM reading of the technical snapshot plus fundamentals.
///
/// Only precomputed numbers are sent; rationale numbers are stripped from the
/// reply and confidence is capped when the fundamentals are missing or stale.
pub struct LlmMarketScorer {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl LlmMarketScorer {
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    fn prompts(input: &MarketBrief) -> (String, String) {
        let system = format!(
            "You are a futures market data agent. {} \
Use only the facts and numbers given in the input; never invent or guess values. \
If data is missing, say so in the rationale and lower the confidence.",
            JSON_CONTRACT
        );

        let s = &input.snapshot;
        let vol_ratio = s
            .vol_ratio()
            .map(|r| format!("{:.4}", r))
            .unwrap_or_else(|| "unknown".to_string());
        let signals = serde_json::to_string(&input.fundamentals.signals)
            .unwrap_or_else(|_| "{}".to_string());

        let user = format!(
            "Date {}, instrument {}. Authoritative signals (cite only these):\n\
Technical: close={:.4}, ma20={:.4}, ma60={:.4}, atr14={:.6}, vol_ratio20={}\n\
Fundamentals (status={}, asof={}): {}\n\
Task: combine technicals and fundamentals into index and confidence with at most 5 rationale lines. \
Do not introduce indicators or numbers that are not in the input.",
            input.date,
            input.subject,
            s.close,
            s.ma20,
            s.ma60,
            s.atr14,
            vol_ratio,
            input.fundamentals.status,
            input.fundamentals.asof,
            signals
        );
        (system, user)
    }
}

/// Apply the fundamentals-quality ceilings to a market verdict.
pub fn cap_market_confidence(verdict: &mut LlmVerdict, fundamentals: &FundamentalsSnapshot, date: &str) {
    if !fundamentals.is_ok() {
        verdict.cap_confidence(MISSING_FUNDAMENTALS_CAP);
    }
    let asof = fundamentals.asof.trim();
    if !asof.is_empty() && asof != date.trim() {
        verdict.cap_confidence(STALE_FUNDAMENTALS_CAP);
    }
}

#[async_trait]
impl ScoreStrategy<MarketBrief> for LlmMarketScorer {
    fn name(&self) -> &'static str {
        self.provider.backend_name()
    }

    async fn score(&self, input: &MarketBrief) -> Result<AgentScore, StrategyError> {
        let (system, user) = Self::prompts(input);
        let mut verdict = ask(self.provider.as_ref(), self.timeout, &system, &user).await?;
        cap_market_confidence(&mut verdict, &input.fundamentals, &input.date);
        Ok(verdict.into_score())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use analysis_core::Sentiment;
    use approx::assert_relative_eq;

    fn news_brief(items: Vec<NewsItem>) -> NewsBrief {
        NewsBrief {
            kind: AgentKind::Macro,
            date: "2026-02-23".to_string(),
            subject: None,
            items,
        }
    }

    fn market_brief(fundamentals: FundamentalsSnapshot) -> MarketBrief {
        MarketBrief {
            date: "2026-02-23".to_string(),
            subject: "螺纹钢".to_string(),
            snapshot: TechnicalSnapshot {
                close: 100.0,
                ma20: 98.0,
                ma60: 95.0,
                atr14: 2.0,
                volume: 1200.0,
                vol_ma20: 1000.0,
                bars: 60,
            },
            fundamentals,
        }
    }

    fn ok_fundamentals(asof: &str) -> FundamentalsSnapshot {
        FundamentalsSnapshot {
            status: "ok".to_string(),
            asof: asof.to_string(),
            signals: Default::default(),
        }
    }

    fn news_chain(provider: Arc<ScriptedProvider>) -> ScoreChain<NewsBrief> {
        ScoreChain::new(vec![
            Arc::new(LlmNewsScorer::new(provider, Duration::from_secs(5))) as Arc<dyn ScoreStrategy<NewsBrief>>,
            Arc::new(HeuristicNewsScorer),
        ])
    }

    fn classified_items() -> Vec<NewsItem> {
        vec![
            NewsItem::new("A", "2026-02-23").classified(Sentiment::Bull, 0.8),
            NewsItem::new("B", "2026-02-23").classified(Sentiment::Bull, 0.8),
            NewsItem::new("C", "2026-02-23").classified(Sentiment::Bull, 0.8),
            NewsItem::new("D", "2026-02-23").classified(Sentiment::Bear, 0.4),
        ]
    }

    #[tokio::test]
    async fn test_heuristic_news_agent() {
        let (score, notes) = ScoreChain::new(vec![Arc::new(HeuristicNewsScorer) as Arc<dyn ScoreStrategy<NewsBrief>>])
            .run(AgentKind::Macro, &news_brief(classified_items()))
            .await
            .unwrap();
        assert_relative_eq!(score.index(), 0.5, epsilon = 1e-12);
        assert_eq!(score.mode(), AgentMode::Heuristic);
        assert_eq!(score.rationale(), &["A".to_string(), "B".to_string(), "C".to_string()]);
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn test_llm_success_is_clamped() {
        let provider = Arc::new(ScriptedProvider::replies(vec![Ok(r#"{"index": 5.0, "confidence": 0.7, "rationale": ["Rate cut 25bp"]}"#)]));
        let (score, notes) = news_chain(provider.clone())
            .run(AgentKind::Macro, &news_brief(classified_items()))
            .await
            .unwrap();
        assert_eq!(score.index(), 1.0);
        assert_eq!(score.mode(), AgentMode::Llm);
        assert_eq!(score.rationale(), &["Rate cut bp".to_string()]);
        assert!(notes.is_empty());

        let prompt = provider.last_user_prompt().unwrap();
        assert!(prompt.starts_with("Date 2026-02-23. Macro headlines:"));
        assert!(prompt.contains("- D"));
    }

    #[tokio::test]
    async fn test_unusable_reply_falls_back_with_note() {
        let provider = Arc::new(ScriptedProvider::replies(vec![Ok(r#"{"confidence": 0.9}"#)]));
        let (score, notes) = news_chain(provider)
            .run(AgentKind::Symbol, &news_brief(classified_items()))
            .await
            .unwrap();
        assert_eq!(score.mode(), AgentMode::Heuristic);
        assert_relative_eq!(score.index(), 0.5, epsilon = 1e-12);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].agent, AgentKind::Symbol);
        assert_eq!(notes[0].strategy, "scripted");
    }

    #[tokio::test]
    async fn test_transport_error_falls_back() {
        let provider = Arc::new(ScriptedProvider::replies(vec![Err(LlmError::ServiceUnavailable("Status: 503".to_string()))]));
        let (score, notes) = news_chain(provider)
            .run(AgentKind::Macro, &news_brief(classified_items()))
            .await
            .unwrap();
        assert_eq!(score.mode(), AgentMode::Heuristic);
        assert!(notes[0].reason.contains("503"));
    }

    #[tokio::test]
    async fn test_empty_news_skips_llm_without_note() {
        let provider = Arc::new(ScriptedProvider::replies(vec![]));
        let (score, notes) = news_chain(provider.clone())
            .run(AgentKind::Macro, &news_brief(vec![]))
            .await
            .unwrap();
        assert_eq!(score.index(), 0.0);
        assert_eq!(score.confidence(), 0.55);
        assert!(notes.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let provider = Arc::new(ScriptedProvider::replies(vec![Ok(r#"{"index": 0.9}"#)]).with_delay(Duration::from_millis(200)));
        let chain = ScoreChain::new(vec![
            Arc::new(LlmNewsScorer::new(provider, Duration::from_millis(20))) as Arc<dyn ScoreStrategy<NewsBrief>>,
            Arc::new(HeuristicNewsScorer),
        ]);
        let (score, notes) = chain
            .run(AgentKind::Macro, &news_brief(classified_items()))
            .await
            .unwrap();
        assert_eq!(score.mode(), AgentMode::Heuristic);
        assert_eq!(notes[0].reason, LlmError::Timeout.to_string());
    }

    #[tokio::test]
    async fn test_market_llm_caps_for_missing_fundamentals() {
        let provider = Arc::new(ScriptedProvider::replies(vec![Ok(r#"{"index": 0.6, "confidence": 0.9}"#)]));
        let scorer = LlmMarketScorer::new(provider.clone(), Duration::from_secs(5));
        let score = scorer.score(&market_brief(FundamentalsSnapshot::missing())).await.unwrap();
        assert_eq!(score.confidence(), MISSING_FUNDAMENTALS_CAP);

        let prompt = provider.last_user_prompt().unwrap();
        assert!(prompt.contains("close=100.0000"));
        assert!(prompt.contains("vol_ratio20=1.2000"));
        assert!(prompt.contains("status=missing"));
    }

    #[tokio::test]
    async fn test_market_llm_caps_for_stale_fundamentals() {
        let provider = Arc::new(ScriptedProvider::replies(vec![
            Ok(r#"{"index": 0.6, "confidence": 0.9}"#),
            Ok(r#"{"index": 0.6, "confidence": 0.9}"#),
        ]));
        let scorer = LlmMarketScorer::new(provider, Duration::from_secs(5));

        let stale = scorer.score(&market_brief(ok_fundamentals("2026-02-20"))).await.unwrap();
        assert_eq!(stale.confidence(), STALE_FUNDAMENTALS_CAP);

        let fresh = scorer.score(&market_brief(ok_fundamentals("2026-02-23"))).await.unwrap();
        assert_eq!(fresh.confidence(), 0.9);
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_an_error() {
        let provider = Arc::new(ScriptedProvider::replies(vec![Ok("not json")]));
        let chain = ScoreChain::new(vec![
            Arc::new(LlmMarketScorer::new(provider, Duration::from_secs(5))) as Arc<dyn ScoreStrategy<MarketBrief>>,
        ]);
        let err = chain
            .run(AgentKind::Market, &market_brief(FundamentalsSnapshot::missing()))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }
}
