use analysis_core::{numeric::clamp, text::normalize_text, LexiconOverride, NewsItem, Sentiment};
use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod history;

pub use aggregate::{daily_sentiment, sentiment_from_analyzed, AggregateSentiment, DailySentiment, LabelCounts};
pub use history::{corr20, CORR20_MIN_DAYS};

const CHINESE_POSITIVE: &[&str] = &[
    "利好", "回暖", "支持", "加码", "走强", "上行", "突破", "改善", "增产不及预期", "降息",
];

const CHINESE_NEGATIVE: &[&str] = &[
    "承压", "回落", "走弱", "下行", "下跌", "收紧", "风险", "不确定", "库存上升", "加息",
];

const ENGLISH_POSITIVE: &[&str] = &[
    "bullish", "rally", "surge", "gain", "growth", "beat", "upgrade", "outperform",
    "strong", "rise", "breakthrough", "momentum", "record high", "rebound", "recovery",
    "robust", "tailwind", "rate cut", "supply shortfall",
];

const ENGLISH_NEGATIVE: &[&str] = &[
    "bearish", "decline", "plunge", "crash", "miss", "downgrade", "underperform", "weak",
    "drop", "slump", "warning", "headwind", "uncertainty", "risk", "inventory build",
    "rate hike", "tightening",
];

/// Keyword lists for the lexicon scorer. Matching is substring-based on
/// normalized text, so entries should be lower-case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Lexicon {
    pub fn new(positive: Vec<String>, negative: Vec<String>) -> Self {
        Self {
            positive: positive.into_iter().map(|w| normalize_text(&w)).collect(),
            negative: negative.into_iter().map(|w| normalize_text(&w)).collect(),
        }
    }

    /// Chinese futures commentary.
    pub fn chinese() -> Self {
        Self::new(owned(CHINESE_POSITIVE), owned(CHINESE_NEGATIVE))
    }

    /// English financial headlines.
    pub fn english() -> Self {
        Self::new(owned(ENGLISH_POSITIVE), owned(ENGLISH_NEGATIVE))
    }

    /// Replace either list with the configured one, when present.
    pub fn with_overrides(self, overrides: &LexiconOverride) -> Self {
        let positive = overrides.positive.clone().unwrap_or(self.positive);
        let negative = overrides.negative.clone().unwrap_or(self.negative);
        Self::new(positive, negative)
    }

    /// `(positive hits, negative hits)`, each keyword counted at most once.
    pub fn hits(&self, text: &str) -> (i32, i32) {
        let count = |words: &[String]| {
            words
                .iter()
                .filter(|w| !w.is_empty() && text.contains(w.as_str()))
                .count() as i32
        };
        (count(&self.positive), count(&self.negative))
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::chinese()
    }
}

/// Per-headline classification produced by [`LexiconScorer::classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub score: i32,
}

/// Keyword-counting scorer for individual news records.
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer {
    lexicon: Lexicon,
}

impl LexiconScorer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Classify one headline: `score = pos - neg`, label by sign,
    /// `confidence = 0.55 + 0.1 * min(3, |score|)`.
    pub fn classify(&self, title: &str, content: &str) -> Classification {
        let text = normalize_text(&format!("{} {}", title, content));
        let (pos, neg) = self.lexicon.hits(&text);
        let score = pos - neg;
        let confidence = clamp(0.55 + 0.1 * score.abs().min(3) as f64, 0.5, 0.95);

        Classification {
            sentiment: Sentiment::from_score(score),
            confidence,
            score,
        }
    }

    /// Attach sentiment and confidence to every record. Other fields, including
    /// weight and supersession flags, pass through untouched.
    pub fn analyze_items(&self, items: Vec<NewsItem>) -> Vec<NewsItem> {
        tracing::debug!("Lexicon scoring {} news items", items.len());
        items
            .into_iter()
            .map(|item| {
                let c = self.classify(&item.title, &item.content);
                item.classified(c.sentiment, c.confidence)
            })
            .collect()
    }
}
