use analysis_core::{
    AgentMode, AgentScore, AnalysisError, AppConfig, FinalOutcome, FundamentalsSnapshot, HistoryDay,
    Instrument, InstrumentDataSource, MarketOutcome, NewsItem, PlanOutcome, PriceBar, TopicClassifier,
};
use chrono::NaiveDate;
use futures_util::future::join_all;
use llm_client::{DeepSeekClient, LlmProvider};
use news_weighting::{dedup, parse_reference_date, FilteredNews, NewsFilter};
use sentiment_analysis::aggregate::EMPTY_CONFIDENCE;
use sentiment_analysis::{corr20, daily_sentiment, DailySentiment, Lexicon, LexiconScorer};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use technical_analysis::{insufficient_history, is_trading_day, PriceContext, TechnicalSnapshot};

pub mod agents;
pub mod fusion;
pub mod plan;
#[cfg(test)]
mod testing;

pub use agents::{
    AgentKind, FallbackNote, HeuristicMarketScorer, HeuristicNewsScorer, LlmMarketScorer, LlmNewsScorer,
    MarketBrief, NewsBrief, ScoreChain, ScoreStrategy, StrategyError,
};
pub use fusion::fuse;
pub use plan::trade_plan;

const MARKET_CLOSED: &str = "market closed";
const NO_NEWS_SCORE: &str = "no usable news score";

/// Macro agent output, computed once per run and shared by every instrument.
#[derive(Debug, Clone, Serialize)]
pub struct MacroContext {
    pub news: FilteredNews,
    pub score: AgentScore,
    pub fallbacks: Vec<FallbackNote>,
}

/// Everything one instrument needs besides the shared macro context.
#[derive(Debug, Clone)]
pub struct InstrumentInput {
    pub instrument: Instrument,
    pub symbol_news: Vec<NewsItem>,
    pub bars: Vec<PriceBar>,
    pub fundamentals: Option<FundamentalsSnapshot>,
    pub history: Vec<HistoryDay>,
    /// Source failures already hit while collecting this input.
    pub data_issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstrumentReport {
    pub instrument: Instrument,
    pub date: String,
    pub price: PriceContext,
    pub sentiment: DailySentiment,
    pub corr20: f64,
    pub news: Vec<NewsItem>,
    pub superseded: Vec<NewsItem>,
    #[serde(rename = "macro")]
    pub macro_score: AgentScore,
    pub symbol: AgentScore,
    pub market: MarketOutcome,
    #[serde(rename = "final")]
    pub final_score: FinalOutcome,
    pub plan: PlanOutcome,
    pub fallbacks: Vec<FallbackNote>,
    pub data_issues: Vec<String>,
}

/// Output of one run over all instruments.
#[derive(Debug, Clone, Serialize)]
pub struct DailyBrief {
    pub date: String,
    #[serde(rename = "macro")]
    pub macro_score: AgentScore,
    pub macro_news: Vec<NewsItem>,
    pub macro_superseded: Vec<NewsItem>,
    pub data_issues: Vec<String>,
    pub instruments: Vec<InstrumentReport>,
}

pub struct AnalysisOrchestrator {
    config: AppConfig,
    news_filter: NewsFilter,
    scorer: LexiconScorer,
    /// `None` runs every agent on heuristics.
    llm: Option<Arc<dyn LlmProvider>>,
    llm_timeout: Duration,
}

impl AnalysisOrchestrator {
    pub fn new(config: AppConfig) -> Self {
        let llm_settings = config.analysis.llm_settings().cloned();
        let llm_timeout = llm_settings
            .as_ref()
            .map(|s| s.timeout)
            .unwrap_or(Duration::from_secs(30));

        let llm: Option<Arc<dyn LlmProvider>> = match llm_settings {
            Some(settings) => match DeepSeekClient::new(settings) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::warn!("LLM client unavailable, using heuristics: {}", e);
                    None
                }
            },
            None => None,
        };

        let lexicon = Lexicon::chinese().with_overrides(&config.analysis.lexicon);
        Self {
            news_filter: NewsFilter::new(config.news.weighting),
            scorer: LexiconScorer::new(lexicon),
            llm,
            llm_timeout,
            config,
        }
    }

    pub fn with_llm_provider(mut self, provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        self.llm = Some(provider);
        self.llm_timeout = timeout;
        self
    }

    pub fn without_llm(mut self) -> Self {
        self.llm = None;
        self
    }

    pub fn with_topic_classifier(mut self, classifier: Arc<dyn TopicClassifier>) -> Self {
        self.news_filter = NewsFilter::with_classifier(self.config.news.weighting, classifier);
        self
    }

    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.scorer = LexiconScorer::new(lexicon);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn agent_mode(&self) -> AgentMode {
        if self.llm.is_some() {
            AgentMode::Llm
        } else {
            AgentMode::Heuristic
        }
    }

    fn news_chain(&self) -> ScoreChain<NewsBrief> {
        let mut strategies: Vec<Arc<dyn ScoreStrategy<NewsBrief>>> = Vec::new();
        if let Some(provider) = &self.llm {
            strategies.push(Arc::new(LlmNewsScorer::new(provider.clone(), self.llm_timeout)));
        }
        strategies.push(Arc::new(HeuristicNewsScorer));
        ScoreChain::new(strategies)
    }

    fn market_chain(&self) -> ScoreChain<MarketBrief> {
        let mut strategies: Vec<Arc<dyn ScoreStrategy<MarketBrief>>> = Vec::new();
        if let Some(provider) = &self.llm {
            strategies.push(Arc::new(LlmMarketScorer::new(provider.clone(), self.llm_timeout)));
        }
        strategies.push(Arc::new(HeuristicMarketScorer));
        ScoreChain::new(strategies)
    }

    /// Dedup, weight, rank and lexicon-classify one news list.
    fn prepare_news(&self, items: Vec<NewsItem>, date: &str, max_items: usize) -> FilteredNews {
        let filtered = self.news_filter.filter(dedup(items), date, max_items);
        FilteredNews {
            items: self.scorer.analyze_items(filtered.items),
            superseded: filtered.superseded,
        }
    }

    async fn score_news(&self, brief: &NewsBrief) -> (AgentScore, Vec<FallbackNote>) {
        match self.news_chain().run(brief.kind, brief).await {
            Ok(scored) => scored,
            Err(e) => {
                tracing::warn!("{} agent produced no score: {}", brief.kind.as_str(), e);
                (neutral_news_score(), Vec::new())
            }
        }
    }

    /// Score the macro news for `date`.
    pub async fn score_macro(&self, macro_news: Vec<NewsItem>, date: &str) -> MacroContext {
        let news = self.prepare_news(macro_news, date, self.config.news.macro_max_items);
        tracing::info!(
            "Macro agent: {} headlines ({} superseded), mode {:?}",
            news.items.len(),
            news.superseded.len(),
            self.agent_mode()
        );
        let brief = NewsBrief {
            kind: AgentKind::Macro,
            date: date.to_string(),
            subject: None,
            items: news.items.clone(),
        };
        let (score, fallbacks) = self.score_news(&brief).await;
        MacroContext { news, score, fallbacks }
    }

    async fn score_market(
        &self,
        input: &InstrumentInput,
        date: &str,
        day: Option<NaiveDate>,
        fallbacks: &mut Vec<FallbackNote>,
    ) -> (MarketOutcome, Option<TechnicalSnapshot>) {
        let Some(day) = day.filter(|d| is_trading_day(&input.bars, *d)) else {
            tracing::info!("{}: no bar for {}, market agent skipped", input.instrument.id, date);
            return (
                MarketOutcome::Skipped {
                    reason: MARKET_CLOSED.to_string(),
                },
                None,
            );
        };

        let snapshot = TechnicalSnapshot::asof(&input.bars, day);
        if !snapshot.has_enough_history() {
            return (MarketOutcome::Ok(insufficient_history()), Some(snapshot));
        }

        let brief = MarketBrief {
            date: date.to_string(),
            subject: input.instrument.name.clone(),
            snapshot,
            fundamentals: input
                .fundamentals
                .clone()
                .unwrap_or_else(FundamentalsSnapshot::missing),
        };
        let score = match self.market_chain().run(AgentKind::Market, &brief).await {
            Ok((score, notes)) => {
                fallbacks.extend(notes);
                score
            }
            Err(e) => {
                tracing::warn!("market agent produced no score: {}", e);
                snapshot.score()
            }
        };
        (MarketOutcome::Ok(score), Some(snapshot))
    }

    /// Full pipeline for one instrument against a precomputed macro context.
    pub async fn analyze_instrument(&self, macro_ctx: &MacroContext, mut input: InstrumentInput, date: &str) -> InstrumentReport {
        tracing::info!("Analyzing {} ({}) for {}", input.instrument.id, input.instrument.name, date);
        let day = parse_reference_date(date);

        let news = self.prepare_news(std::mem::take(&mut input.symbol_news), date, self.config.news.max_items);
        let sentiment = daily_sentiment(&news.items);

        let brief = NewsBrief {
            kind: AgentKind::Symbol,
            date: date.to_string(),
            subject: Some(input.instrument.name.clone()),
            items: news.items.clone(),
        };
        let (symbol_score, mut fallbacks) = self.score_news(&brief).await;

        let (market, snapshot) = self.score_market(&input, date, day, &mut fallbacks).await;

        let final_score = fuse(
            &self.config.analysis.weights,
            &macro_ctx.score,
            &symbol_score,
            market.score(),
        );

        let plan = match (snapshot, day) {
            (Some(snapshot), Some(day)) => trade_plan(&snapshot, day, final_score.score()),
            _ => PlanOutcome::Skipped {
                reason: MARKET_CLOSED.to_string(),
            },
        };

        let mut all_fallbacks = macro_ctx.fallbacks.clone();
        all_fallbacks.extend(fallbacks);

        tracing::info!(
            "{}: final index {:.3} (confidence {:.2}){}",
            input.instrument.id,
            final_score.score().index(),
            final_score.score().confidence(),
            if final_score.is_reduced() { ", reduced" } else { "" }
        );

        InstrumentReport {
            price: PriceContext::build(&input.bars, day),
            corr20: corr20(&input.history),
            instrument: input.instrument,
            date: date.to_string(),
            sentiment,
            news: news.items,
            superseded: news.superseded,
            macro_score: macro_ctx.score.clone(),
            symbol: symbol_score,
            market,
            final_score,
            plan,
            fallbacks: all_fallbacks,
            data_issues: input.data_issues,
        }
    }

    /// Analyze every instrument concurrently against one macro context.
    pub async fn analyze_all(&self, macro_ctx: &MacroContext, inputs: Vec<InstrumentInput>, date: &str) -> Vec<InstrumentReport> {
        join_all(
            inputs
                .into_iter()
                .map(|input| self.analyze_instrument(macro_ctx, input, date)),
        )
        .await
    }

    async fn collect_input(&self, source: &dyn InstrumentDataSource, instrument: Instrument, date: &str) -> InstrumentInput {
        let (news, bars, fundamentals, history) = tokio::join!(
            source.symbol_news(&instrument, date),
            source.price_bars(&instrument, date),
            source.fundamentals(&instrument, date),
            source.history(&instrument),
        );

        let mut issues = Vec::new();
        let mut record = |what: &str, e: AnalysisError| {
            tracing::warn!("{}: {} unavailable: {}", instrument.id, what, e);
            issues.push(format!("{}: {}", what, e));
        };

        let symbol_news = news.unwrap_or_else(|e| {
            record("symbol news", e);
            Vec::new()
        });
        let bars = bars.unwrap_or_else(|e| {
            record("price bars", e);
            Vec::new()
        });
        let fundamentals = fundamentals.unwrap_or_else(|e| {
            record("fundamentals", e);
            None
        });
        let history = history.unwrap_or_else(|e| {
            record("history", e);
            Vec::new()
        });

        InstrumentInput {
            instrument,
            symbol_news,
            bars,
            fundamentals,
            history,
            data_issues: issues,
        }
    }

    /// Fetch inputs from `source` and produce the brief for `date`.
    /// Source failures become data issues in the report instead of aborting the run.
    pub async fn run(&self, source: &dyn InstrumentDataSource, instruments: Vec<Instrument>, date: &str) -> DailyBrief {
        tracing::info!("Daily run for {} over {} instruments", date, instruments.len());

        let mut data_issues = Vec::new();
        let macro_news = match source.macro_news(date).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Macro news unavailable: {}", e);
                data_issues.push(format!("macro news: {}", e));
                Vec::new()
            }
        };
        let macro_ctx = self.score_macro(macro_news, date).await;

        let inputs = join_all(
            instruments
                .into_iter()
                .map(|instrument| self.collect_input(source, instrument, date)),
        )
        .await;
        let instruments = self.analyze_all(&macro_ctx, inputs, date).await;

        DailyBrief {
            date: date.to_string(),
            macro_score: macro_ctx.score,
            macro_news: macro_ctx.news.items,
            macro_superseded: macro_ctx.news.superseded,
            data_issues,
            instruments,
        }
    }
}

fn neutral_news_score() -> AgentScore {
    AgentScore::new(0.0, EMPTY_CONFIDENCE, AgentMode::Heuristic, vec![NO_NEWS_SCORE.to_string()])
}
