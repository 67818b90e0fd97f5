pub mod recency;
pub mod supersede;

use analysis_core::{text::clean_text, NewsItem, TopicClassifier, WeightingParams};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

pub use recency::{parse_published_date, parse_reference_date, recency_weight, UNKNOWN_AGE_WEIGHT};
pub use supersede::{apply_supersession, EntityRule, KeywordTopicClassifier, TopicRule};

/// Result of filtering one news list for a run date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilteredNews {
    /// Ranked by weight (desc), then age (asc, unknown last); at most `max_items`.
    pub items: Vec<NewsItem>,
    /// Records zeroed by a newer contradicting claim, kept for audit.
    pub superseded: Vec<NewsItem>,
}

/// Recency weighting, supersession and ranking of news for one run date.
#[derive(Clone)]
pub struct NewsFilter {
    params: WeightingParams,
    classifier: Arc<dyn TopicClassifier>,
}

impl NewsFilter {
    pub fn new(params: WeightingParams) -> Self {
        Self::with_classifier(params, Arc::new(KeywordTopicClassifier::policy()))
    }

    pub fn with_classifier(params: WeightingParams, classifier: Arc<dyn TopicClassifier>) -> Self {
        Self { params, classifier }
    }

    pub fn params(&self) -> &WeightingParams {
        &self.params
    }

    /// Weight every record against `date`, zero superseded ones, rank and truncate.
    ///
    /// Weights are recomputed from scratch, so filtering an already-filtered
    /// list yields the same result. An unparseable `date` disables decay but
    /// still applies supersession and ranking.
    pub fn filter(&self, items: Vec<NewsItem>, date: &str, max_items: usize) -> FilteredNews {
        if items.is_empty() {
            return FilteredNews::default();
        }

        let reference = parse_reference_date(date);
        if reference.is_none() {
            tracing::warn!("Unparseable reference date '{}', recency decay disabled", date);
        }

        let mut items: Vec<NewsItem> = items
            .into_iter()
            .map(|mut item| {
                let (weight, age) = recency_weight(&self.params, &item.published_at, reference);
                item.weight = weight;
                item.age_days = age;
                item.superseded = false;
                item
            })
            .collect();

        if self.params.supersede_enabled {
            let n = apply_supersession(&mut items, self.classifier.as_ref());
            if n > 0 {
                tracing::debug!("{} news records superseded for {}", n, date);
            }
        }

        let (superseded, kept): (Vec<NewsItem>, Vec<NewsItem>) =
            items.into_iter().partition(|it| it.superseded);
        let mut kept: Vec<NewsItem> = kept.into_iter().filter(|it| it.weight > 0.0).collect();

        kept.sort_by(rank_order);
        kept.truncate(max_items);

        FilteredNews {
            items: kept,
            superseded,
        }
    }
}

impl Default for NewsFilter {
    fn default() -> Self {
        Self::new(WeightingParams::default())
    }
}

fn rank_order(a: &NewsItem, b: &NewsItem) -> Ordering {
    b.weight
        .partial_cmp(&a.weight)
        .unwrap_or(Ordering::Equal)
        .then_with(|| match (a.age_days, b.age_days) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Drop repeated records, keyed by cleaned `url|title`. Records without a
/// title are dropped. The first occurrence wins and order is preserved.
pub fn dedup(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|it| {
            if clean_text(&it.title).is_empty() {
                return false;
            }
            seen.insert(clean_text(&format!("{}|{}", it.url, it.title)))
        })
        .collect()
}
