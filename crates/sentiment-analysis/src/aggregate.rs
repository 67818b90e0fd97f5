use analysis_core::{numeric::{clamp, clamp_index}, NewsItem, Sentiment};
use serde::{Deserialize, Serialize};

/// Default confidence when there is nothing to aggregate.
pub const EMPTY_CONFIDENCE: f64 = 0.55;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub bull: usize,
    pub bear: usize,
    pub neutral: usize,
}

impl LabelCounts {
    pub fn of(items: &[NewsItem]) -> Self {
        let mut counts = Self::default();
        for item in items {
            match item.sentiment {
                Some(Sentiment::Bull) => counts.bull += 1,
                Some(Sentiment::Bear) => counts.bear += 1,
                Some(Sentiment::Neutral) => counts.neutral += 1,
                None => {}
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.bull + self.bear + self.neutral
    }
}

/// Weighted sentiment over a classified news list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateSentiment {
    pub index: f64,
    pub counts: LabelCounts,
    pub confidence: f64,
}

impl Default for AggregateSentiment {
    fn default() -> Self {
        Self {
            index: 0.0,
            counts: LabelCounts::default(),
            confidence: EMPTY_CONFIDENCE,
        }
    }
}

/// Weighted aggregate of classified records.
///
/// `index = (Σ w·c over bull − Σ w·c over bear) / Σ w` with each weight clamped
/// to `[0, 1]`; zero-weight records do not contribute. Confidence is the weighted
/// mean of the record confidences, clamped to `[0.5, 0.95]`.
pub fn sentiment_from_analyzed(items: &[NewsItem]) -> AggregateSentiment {
    let mut bull = 0.0;
    let mut bear = 0.0;
    let mut total_w = 0.0;
    let mut conf_sum = 0.0;
    let mut conf_w = 0.0;

    for item in items {
        let w = clamp(item.weight, 0.0, 1.0);
        if w <= 0.0 {
            continue;
        }
        total_w += w;
        let conf = item.confidence.unwrap_or(0.0);
        match item.sentiment {
            Some(Sentiment::Bull) => bull += w * conf,
            Some(Sentiment::Bear) => bear += w * conf,
            _ => {}
        }
        if let Some(c) = item.confidence {
            conf_sum += w * c;
            conf_w += w;
        }
    }

    if total_w <= 0.0 {
        return AggregateSentiment::default();
    }

    let confidence = if conf_w > 0.0 {
        clamp(conf_sum / conf_w, 0.5, 0.95)
    } else {
        EMPTY_CONFIDENCE
    };

    AggregateSentiment {
        index: clamp_index((bull - bear) / total_w),
        counts: LabelCounts::of(items),
        confidence,
    }
}

/// Unweighted headline sentiment of one day, as shown next to the agent scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailySentiment {
    pub index: f64,
    pub band: Sentiment,
    pub counts: LabelCounts,
    pub news_total: usize,
}

/// `(Σ c over bull − Σ c over bear) / n`, ignoring recency weights.
pub fn daily_sentiment(items: &[NewsItem]) -> DailySentiment {
    let counts = LabelCounts::of(items);
    let index = if items.is_empty() {
        0.0
    } else {
        let signed: f64 = items
            .iter()
            .map(|it| {
                let c = it.confidence.unwrap_or(0.0);
                match it.sentiment {
                    Some(Sentiment::Bull) => c,
                    Some(Sentiment::Bear) => -c,
                    _ => 0.0,
                }
            })
            .sum();
        clamp_index(signed / items.len() as f64)
    };

    DailySentiment {
        index,
        band: Sentiment::from_index(index),
        counts,
        news_total: items.len(),
    }
}
