use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AnalysisError, FundamentalsSnapshot, HistoryDay, Instrument, NewsItem, PriceBar};

/// Direction of a policy claim inside a topic: +1 tightening / imposing, -1 easing / lifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicDirection {
    Up,
    Down,
}

/// A headline's directional claim on a supersedable topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicClaim {
    pub topic: String,
    pub direction: TopicDirection,
}

/// Classifies headlines into topics where a newer opposite claim invalidates an older one.
pub trait TopicClassifier: Send + Sync {
    fn classify(&self, title: &str) -> Option<TopicClaim>;
}

/// Source of per-run inputs. Implementations are thin I/O adapters; each call
/// returns a typed failure instead of swallowing errors.
#[async_trait]
pub trait InstrumentDataSource: Send + Sync {
    /// Macro news shared by every instrument, already deduplicated.
    async fn macro_news(&self, date: &str) -> Result<Vec<NewsItem>, AnalysisError>;

    async fn symbol_news(&self, instrument: &Instrument, date: &str) -> Result<Vec<NewsItem>, AnalysisError>;

    /// Daily bars ascending by date.
    async fn price_bars(&self, instrument: &Instrument, date: &str) -> Result<Vec<PriceBar>, AnalysisError>;

    async fn fundamentals(
        &self,
        _instrument: &Instrument,
        _date: &str,
    ) -> Result<Option<FundamentalsSnapshot>, AnalysisError> {
        Ok(None)
    }

    /// Past daily sentiment and closes, ascending by date.
    async fn history(&self, _instrument: &Instrument) -> Result<Vec<HistoryDay>, AnalysisError> {
        Ok(Vec::new())
    }
}
