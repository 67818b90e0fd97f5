use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::numeric::{clamp, clamp_index};

/// Index threshold separating the neutral band from bull/bear.
pub const BAND_THRESHOLD: f64 = 0.2;

/// Maximum number of rationale lines an agent may publish.
pub const MAX_RATIONALE: usize = 5;

/// Coarse sentiment label, used both per headline and as the band of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bull,
    Bear,
    Neutral,
}

impl Sentiment {
    /// Band of a sentiment index: strictly above +0.2 is bull, strictly below -0.2 is bear.
    pub fn from_index(index: f64) -> Self {
        if index > BAND_THRESHOLD {
            Sentiment::Bull
        } else if index < -BAND_THRESHOLD {
            Sentiment::Bear
        } else {
            Sentiment::Neutral
        }
    }

    /// Label of a signed keyword score.
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s > 0 => Sentiment::Bull,
            s if s < 0 => Sentiment::Bear,
            _ => Sentiment::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Bull => "bull",
            Sentiment::Bear => "bear",
            Sentiment::Neutral => "neutral",
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

/// A normalized news record as delivered by a news source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    /// ISO date, ISO datetime or RFC-2822 timestamp, as published
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_days: Option<i64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub superseded: bool,
}

impl NewsItem {
    pub fn new(title: impl Into<String>, published_at: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: String::new(),
            source: String::new(),
            published_at: published_at.into(),
            content: String::new(),
            sentiment: None,
            confidence: None,
            weight: 1.0,
            age_days: None,
            superseded: false,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Attach a classification (used by scorers and tests).
    pub fn classified(mut self, sentiment: Sentiment, confidence: f64) -> Self {
        self.sentiment = Some(sentiment);
        self.confidence = Some(confidence);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Tradable instrument the pipeline reports on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Instrument {
    /// Whether a headline is about this instrument: its name, id or any keyword
    /// appears in the title (case-insensitive).
    pub fn matches_title(&self, title: &str) -> bool {
        let t = title.to_lowercase();
        if t.trim().is_empty() {
            return false;
        }
        let name = if self.name.trim().is_empty() { &self.id } else { &self.name };
        let name = name.trim().to_lowercase();
        if !name.is_empty() && t.contains(&name) {
            return true;
        }
        self.keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .any(|k| !k.is_empty() && t.contains(&k))
    }
}

/// Daily OHLCV bar with open interest (futures).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub open_interest: f64,
}

/// One trading day of an instrument's sentiment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryDay {
    pub date: NaiveDate,
    pub sentiment: f64,
    pub close: f64,
}

/// How an agent score was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    Llm,
    Heuristic,
}

/// Bounded output of one agent. Only constructed through [`AgentScore::new`]
/// or [`AgentScore::technical`], which enforce the index/confidence bounds;
/// deserialization goes through `new` as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAgentScore")]
pub struct AgentScore {
    index: f64,
    band: Sentiment,
    confidence: f64,
    mode: AgentMode,
    rationale: Vec<String>,
}

/// Wire form of [`AgentScore`]; `band` is always recomputed from the index.
#[derive(Deserialize)]
struct RawAgentScore {
    index: f64,
    #[serde(default)]
    confidence: f64,
    mode: AgentMode,
    #[serde(default)]
    rationale: Vec<String>,
}

impl From<RawAgentScore> for AgentScore {
    fn from(raw: RawAgentScore) -> Self {
        AgentScore::new(raw.index, raw.confidence, raw.mode, raw.rationale)
    }
}

impl AgentScore {
    pub const MIN_CONFIDENCE: f64 = 0.5;
    pub const MAX_CONFIDENCE: f64 = 0.95;
    /// Ceiling for pure price-technical heuristics.
    pub const MAX_TECHNICAL_CONFIDENCE: f64 = 0.9;

    pub fn new(index: f64, confidence: f64, mode: AgentMode, rationale: Vec<String>) -> Self {
        Self::bounded(index, confidence, Self::MAX_CONFIDENCE, mode, rationale)
    }

    /// Heuristic score derived only from the price series.
    pub fn technical(index: f64, confidence: f64, rationale: Vec<String>) -> Self {
        Self::bounded(
            index,
            confidence,
            Self::MAX_TECHNICAL_CONFIDENCE,
            AgentMode::Heuristic,
            rationale,
        )
    }

    fn bounded(
        index: f64,
        confidence: f64,
        max_confidence: f64,
        mode: AgentMode,
        mut rationale: Vec<String>,
    ) -> Self {
        let index = clamp_index(index);
        rationale.truncate(MAX_RATIONALE);
        Self {
            index,
            band: Sentiment::from_index(index),
            confidence: clamp(confidence, Self::MIN_CONFIDENCE, max_confidence),
            mode,
            rationale,
        }
    }

    pub fn index(&self) -> f64 {
        self.index
    }

    pub fn band(&self) -> Sentiment {
        self.band
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn mode(&self) -> AgentMode {
        self.mode
    }

    pub fn rationale(&self) -> &[String] {
        &self.rationale
    }
}

/// One fundamentals module reading, e.g. the latest inventory print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSignal {
    pub status: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, serde_json::Value>,
}

impl FundamentalSignal {
    pub fn unavailable() -> Self {
        Self {
            status: "unavailable".to_string(),
            values: BTreeMap::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

impl Default for FundamentalSignal {
    fn default() -> Self {
        Self::unavailable()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSignals {
    #[serde(default)]
    pub inventory: FundamentalSignal,
    #[serde(default)]
    pub spot_basis: FundamentalSignal,
    #[serde(default)]
    pub roll_yield: FundamentalSignal,
    #[serde(default)]
    pub positions_rank: FundamentalSignal,
}

/// Compact fundamentals context for futures-like instruments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsSnapshot {
    pub status: String,
    #[serde(default)]
    pub asof: String,
    #[serde(default)]
    pub signals: FundamentalSignals,
}

impl FundamentalsSnapshot {
    /// Placeholder used when no fundamentals were supplied at all.
    pub fn missing() -> Self {
        Self {
            status: "missing".to_string(),
            asof: String::new(),
            signals: FundamentalSignals::default(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl Direction {
    pub fn from_index(index: f64) -> Self {
        match Sentiment::from_index(index) {
            Sentiment::Bull => Direction::Long,
            Sentiment::Bear => Direction::Short,
            Sentiment::Neutral => Direction::Neutral,
        }
    }
}

/// Three-tier position size bucket derived from the final confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSize {
    Light,
    Medium,
    Heavy,
}

impl PositionSize {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence < 0.65 {
            PositionSize::Light
        } else if confidence < 0.8 {
            PositionSize::Medium
        } else {
            PositionSize::Heavy
        }
    }
}

/// Entry/stop/target levels for one holding horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonPlan {
    pub direction: Direction,
    pub entry_zone: [f64; 2],
    pub stop: Option<f64>,
    pub target1: Option<f64>,
    pub target2: Option<f64>,
    pub position_size_label: PositionSize,
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub asof: NaiveDate,
    pub direction: Direction,
    pub short_term: HorizonPlan,
    pub swing: HorizonPlan,
    pub mid_term: HorizonPlan,
    pub notes: Vec<String>,
}

/// Market agent result. `Skipped` marks a non-trading day and is not a neutral score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MarketOutcome {
    Ok(AgentScore),
    Skipped { reason: String },
}

impl MarketOutcome {
    pub fn score(&self) -> Option<&AgentScore> {
        match self {
            MarketOutcome::Ok(score) => Some(score),
            MarketOutcome::Skipped { .. } => None,
        }
    }
}

/// Fused score. `Reduced` was computed without the market agent and must not be
/// presented as equivalent to a three-way fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FinalOutcome {
    Ok(AgentScore),
    Reduced { score: AgentScore, reason: String },
}

impl FinalOutcome {
    pub fn score(&self) -> &AgentScore {
        match self {
            FinalOutcome::Ok(score) => score,
            FinalOutcome::Reduced { score, .. } => score,
        }
    }

    pub fn is_reduced(&self) -> bool {
        matches!(self, FinalOutcome::Reduced { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    Ok(TradePlan),
    Unavailable { reason: String },
    Skipped { reason: String },
}

impl PlanOutcome {
    pub fn plan(&self) -> Option<&TradePlan> {
        match self {
            PlanOutcome::Ok(plan) => Some(plan),
            _ => None,
        }
    }
}
