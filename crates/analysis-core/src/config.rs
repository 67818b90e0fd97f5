//! Run configuration.
//!
//! The on-disk form is a loosely filled JSON document (every key optional).
//! [`AppConfig::from_json_str`] deserializes it into the `Raw*` mirror structs,
//! then validates and clamps it into the typed [`AppConfig`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::AnalysisError;

pub const DEFAULT_DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";
pub const DEFAULT_API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

/// Relative weight of each agent in the fused score. Weights need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    #[serde(rename = "macro")]
    pub macro_news: f64,
    pub symbol: f64,
    pub market: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            macro_news: 0.3,
            symbol: 0.3,
            market: 0.4,
        }
    }
}

impl FusionWeights {
    fn validate(self) -> Result<Self, AnalysisError> {
        for (name, w) in [
            ("macro", self.macro_news),
            ("symbol", self.symbol),
            ("market", self.market),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "analysis.weights.{name} must be a finite non-negative number, got {w}"
                )));
            }
        }
        Ok(self)
    }
}

/// Connection settings for the DeepSeek chat-completions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DeepSeekSettings {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    /// Resolved from `api_key_env` at load time; never read from the file.
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl DeepSeekSettings {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Which scorer drives the agents.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringProvider {
    Lexicon,
    DeepSeek(DeepSeekSettings),
}

/// Replacement keyword lists for the lexicon scorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexiconOverride {
    #[serde(default)]
    pub positive: Option<Vec<String>>,
    #[serde(default)]
    pub negative: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub provider: ScoringProvider,
    pub weights: FusionWeights,
    pub lexicon: LexiconOverride,
}

impl AnalysisConfig {
    /// DeepSeek settings when the LLM path is enabled: provider selected and a key present.
    pub fn llm_settings(&self) -> Option<&DeepSeekSettings> {
        match &self.provider {
            ScoringProvider::DeepSeek(settings) if settings.has_api_key() => Some(settings),
            _ => None,
        }
    }
}

/// Recency-decay and supersession parameters for the news filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightingParams {
    pub half_life_days: f64,
    pub min_weight: f64,
    pub fresh_boost_days: i64,
    pub fresh_boost: f64,
    pub supersede_enabled: bool,
}

impl Default for WeightingParams {
    fn default() -> Self {
        Self {
            half_life_days: 10.0,
            min_weight: 0.0005,
            fresh_boost_days: 1,
            fresh_boost: 1.25,
            supersede_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsConfig {
    pub max_items: usize,
    pub macro_max_items: usize,
    pub weighting: WeightingParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub timezone: String,
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub news: NewsConfig,
    pub data: DataConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig {
                provider: ScoringProvider::Lexicon,
                weights: FusionWeights::default(),
                lexicon: LexiconOverride::default(),
            },
            news: RawNews::default().resolve(),
            data: DataConfig {
                timezone: "Asia/Shanghai".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Parse and validate a JSON config, resolving the API key through `env`.
    pub fn from_json_str<F>(json: &str, env: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = serde_json::from_str(json)
            .map_err(|e| AnalysisError::InvalidConfig(format!("malformed config: {e}")))?;
        Self::from_raw(raw, env)
    }

    /// Load a JSON config file, resolving the API key from the process environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text, |name| std::env::var(name).ok())
    }

    fn from_raw<F>(raw: RawConfig, env: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match raw.analysis.provider.trim().to_lowercase().as_str() {
            "" | "lexicon" => ScoringProvider::Lexicon,
            "deepseek" => {
                let d = raw.analysis.deepseek;
                let api_key_env = non_empty_or(d.api_key_env, DEFAULT_API_KEY_ENV);
                let api_key = env(&api_key_env)
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty());
                if api_key.is_none() {
                    tracing::warn!(
                        "analysis.provider=deepseek but {} is not set; agents will use heuristics",
                        api_key_env
                    );
                }
                ScoringProvider::DeepSeek(DeepSeekSettings {
                    base_url: non_empty_or(d.base_url, DEFAULT_DEEPSEEK_BASE_URL)
                        .trim_end_matches('/')
                        .to_string(),
                    model: non_empty_or(d.model, DEFAULT_DEEPSEEK_MODEL),
                    api_key_env,
                    api_key,
                    temperature: d.temperature.unwrap_or(0.2).clamp(0.0, 2.0),
                    max_tokens: d.max_tokens.unwrap_or(1200).clamp(1, 8192),
                    timeout: Duration::from_secs(d.timeout_secs.unwrap_or(30).clamp(1, 120)),
                })
            }
            other => {
                return Err(AnalysisError::InvalidConfig(format!(
                    "unknown analysis.provider '{other}' (expected 'lexicon' or 'deepseek')"
                )))
            }
        };

        let weights = raw.analysis.weights.validate()?;
        let news = raw.news.resolve();

        Ok(Self {
            analysis: AnalysisConfig {
                provider,
                weights,
                lexicon: raw.analysis.lexicon,
            },
            news,
            data: DataConfig {
                timezone: non_empty_or(raw.data.timezone, "Asia/Shanghai"),
            },
        })
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    analysis: RawAnalysis,
    news: RawNews,
    data: RawData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAnalysis {
    provider: String,
    weights: FusionWeights,
    deepseek: RawDeepSeek,
    lexicon: LexiconOverride,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDeepSeek {
    base_url: Option<String>,
    model: Option<String>,
    api_key_env: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNews {
    max_age_days: Option<i64>,
    max_items: Option<usize>,
    macro_max_items: Option<usize>,
    weighting: RawWeighting,
    supersede: RawSupersede,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWeighting {
    half_life_days: Option<i64>,
    min_weight: Option<f64>,
    fresh_boost_days: Option<i64>,
    fresh_boost: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSupersede {
    enabled: bool,
}

impl Default for RawSupersede {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawData {
    timezone: Option<String>,
}

impl RawNews {
    fn resolve(self) -> NewsConfig {
        let max_age_days = self.max_age_days.unwrap_or(30).clamp(0, 365);
        let half_life_days = match self.weighting.half_life_days {
            Some(d) => d.clamp(1, 365),
            // Derived from the news window: 30 days of history halves every 10 days.
            None if max_age_days <= 0 => 10,
            None => ((max_age_days as f64 / 3.0).round() as i64).clamp(1, 365),
        };
        let min_weight = self
            .weighting
            .min_weight
            .filter(|w| w.is_finite())
            .unwrap_or(0.0005)
            .clamp(0.0, 1.0);
        let fresh_boost = self
            .weighting
            .fresh_boost
            .filter(|b| b.is_finite())
            .unwrap_or(1.25)
            .clamp(1.0, 3.0);
        let max_items = self.max_items.unwrap_or(12);

        NewsConfig {
            max_items,
            macro_max_items: self.macro_max_items.unwrap_or(6).min(max_items),
            weighting: WeightingParams {
                half_life_days: half_life_days as f64,
                min_weight,
                fresh_boost_days: self.weighting.fresh_boost_days.unwrap_or(1).clamp(0, 30),
                fresh_boost,
                supersede_enabled: self.supersede.enabled,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.analysis.provider, ScoringProvider::Lexicon);
        assert_eq!(cfg.analysis.weights, FusionWeights::default());
        assert_eq!(cfg.news.weighting.half_life_days, 10.0);
        assert_eq!(cfg.news.weighting.min_weight, 0.0005);
        assert_eq!(cfg.news.weighting.fresh_boost_days, 1);
        assert_eq!(cfg.news.weighting.fresh_boost, 1.25);
        assert!(cfg.news.weighting.supersede_enabled);
        assert_eq!(cfg.news.max_items, 12);
        assert_eq!(cfg.news.macro_max_items, 6);
        assert_eq!(cfg.data.timezone, "Asia/Shanghai");

        assert_eq!(AppConfig::from_json_str("{}", no_env).unwrap(), cfg);
    }

    #[test]
    fn test_half_life_derived_from_max_age() {
        let cfg = AppConfig::from_json_str(r#"{"news": {"max_age_days": 45}}"#, no_env).unwrap();
        assert_eq!(cfg.news.weighting.half_life_days, 15.0);

        let cfg = AppConfig::from_json_str(r#"{"news": {"max_age_days": 0}}"#, no_env).unwrap();
        assert_eq!(cfg.news.weighting.half_life_days, 10.0);

        let cfg = AppConfig::from_json_str(
            r#"{"news": {"max_age_days": 45, "weighting": {"half_life_days": 4}}}"#,
            no_env,
        )
        .unwrap();
        assert_eq!(cfg.news.weighting.half_life_days, 4.0);
    }

    #[test]
    fn test_weighting_knobs_are_clamped() {
        let cfg = AppConfig::from_json_str(
            r#"{"news": {"weighting": {"fresh_boost": 9.0, "fresh_boost_days": 90, "min_weight": -1.0},
                         "supersede": {"enabled": false}}}"#,
            no_env,
        )
        .unwrap();
        assert_eq!(cfg.news.weighting.fresh_boost, 3.0);
        assert_eq!(cfg.news.weighting.fresh_boost_days, 30);
        assert_eq!(cfg.news.weighting.min_weight, 0.0);
        assert!(!cfg.news.weighting.supersede_enabled);
    }

    #[test]
    fn test_deepseek_requires_key_to_enable_llm() {
        let json = r#"{"analysis": {"provider": "deepseek", "deepseek": {"api_key_env": "MY_KEY", "base_url": "https://llm.example/"}}}"#;

        let without = AppConfig::from_json_str(json, no_env).unwrap();
        assert!(matches!(without.analysis.provider, ScoringProvider::DeepSeek(_)));
        assert!(without.analysis.llm_settings().is_none());

        let with = AppConfig::from_json_str(json, |name| {
            (name == "MY_KEY").then(|| "sk-test".to_string())
        })
        .unwrap();
        let settings = with.analysis.llm_settings().expect("llm enabled");
        assert_eq!(settings.base_url, "https://llm.example");
        assert_eq!(settings.model, DEFAULT_DEEPSEEK_MODEL);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.max_tokens, 1200);
    }

    #[test]
    fn test_blank_key_does_not_enable_llm() {
        let cfg = AppConfig::from_json_str(r#"{"analysis": {"provider": "deepseek"}}"#, |_| {
            Some("   ".to_string())
        })
        .unwrap();
        assert!(cfg.analysis.llm_settings().is_none());
    }

    #[test]
    fn test_rejects_unknown_provider_and_bad_weights() {
        let err = AppConfig::from_json_str(r#"{"analysis": {"provider": "gpt"}}"#, no_env);
        assert!(matches!(err, Err(AnalysisError::InvalidConfig(_))));

        let err = AppConfig::from_json_str(
            r#"{"analysis": {"weights": {"macro": -0.1}}}"#,
            no_env,
        );
        assert!(matches!(err, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_weights_keep_defaults() {
        let cfg = AppConfig::from_json_str(r#"{"analysis": {"weights": {"market": 0.0}}}"#, no_env).unwrap();
        assert_eq!(cfg.analysis.weights.macro_news, 0.3);
        assert_eq!(cfg.analysis.weights.symbol, 0.3);
        assert_eq!(cfg.analysis.weights.market, 0.0);
    }
}
