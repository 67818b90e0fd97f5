use analysis_core::{
    AnalysisError, FundamentalsSnapshot, HistoryDay, Instrument, InstrumentDataSource, NewsItem, PriceBar,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Pre-collected inputs for one run, keyed by instrument id.
///
/// `news` is a shared pool; an instrument receives the pool headlines that
/// mention it in addition to its own `symbol_news` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InputBundle {
    pub date: Option<String>,
    pub instruments: Vec<Instrument>,
    pub macro_news: Vec<NewsItem>,
    pub news: Vec<NewsItem>,
    pub symbol_news: HashMap<String, Vec<NewsItem>>,
    pub bars: HashMap<String, Vec<PriceBar>>,
    pub fundamentals: HashMap<String, FundamentalsSnapshot>,
    pub history: HashMap<String, Vec<HistoryDay>>,
}

impl InputBundle {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut bundle: InputBundle = serde_json::from_str(json).context("malformed input bundle")?;
        for bars in bundle.bars.values_mut() {
            bars.sort_by_key(|b| b.date);
        }
        for days in bundle.history.values_mut() {
            days.sort_by_key(|d| d.date);
        }
        Ok(bundle)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input bundle {}", path.display()))?;
        Self::from_json_str(&text)
    }
}

#[async_trait]
impl InstrumentDataSource for InputBundle {
    async fn macro_news(&self, _date: &str) -> Result<Vec<NewsItem>, AnalysisError> {
        Ok(self.macro_news.clone())
    }

    async fn symbol_news(&self, instrument: &Instrument, _date: &str) -> Result<Vec<NewsItem>, AnalysisError> {
        let mut items = self.symbol_news.get(&instrument.id).cloned().unwrap_or_default();
        items.extend(
            self.news
                .iter()
                .filter(|it| instrument.matches_title(&it.title))
                .cloned(),
        );
        Ok(items)
    }

    async fn price_bars(&self, instrument: &Instrument, _date: &str) -> Result<Vec<PriceBar>, AnalysisError> {
        Ok(self.bars.get(&instrument.id).cloned().unwrap_or_default())
    }

    async fn fundamentals(
        &self,
        instrument: &Instrument,
        _date: &str,
    ) -> Result<Option<FundamentalsSnapshot>, AnalysisError> {
        Ok(self.fundamentals.get(&instrument.id).cloned())
    }

    async fn history(&self, instrument: &Instrument) -> Result<Vec<HistoryDay>, AnalysisError> {
        Ok(self.history.get(&instrument.id).cloned().unwrap_or_default())
    }
}
