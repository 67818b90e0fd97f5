use analysis_core::{AgentMode, AgentScore, MAX_RATIONALE};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::error::{LlmError, LlmResult};

/// Confidence assumed when the model omits one.
pub const DEFAULT_CONFIDENCE: f64 = 0.55;

/// Validated `{index, confidence, rationale}` reply of a scoring prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmVerdict {
    pub index: f64,
    pub confidence: f64,
    pub rationale: Vec<String>,
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

impl LlmVerdict {
    /// Validate a parsed reply. A missing or non-numeric `index`, or a present
    /// but non-numeric `confidence`, makes the reply unusable.
    pub fn from_object(map: &Map<String, Value>) -> LlmResult<Self> {
        let index = map
            .get("index")
            .and_then(number)
            .ok_or_else(|| LlmError::InvalidResponse("missing or non-numeric index".to_string()))?;

        let confidence = match map.get("confidence") {
            None | Some(Value::Null) => DEFAULT_CONFIDENCE,
            Some(v) => number(v).ok_or_else(|| {
                LlmError::InvalidResponse(format!("non-numeric confidence: {}", v))
            })?,
        };

        Ok(Self {
            index,
            confidence,
            rationale: sanitize_rationale(map.get("rationale")),
        })
    }

    /// Lower the confidence to at most `cap`.
    pub fn cap_confidence(&mut self, cap: f64) {
        self.confidence = self.confidence.min(cap);
    }

    /// Bounded LLM-mode score.
    pub fn into_score(self) -> AgentScore {
        AgentScore::new(self.index, self.confidence, AgentMode::Llm, self.rationale)
    }
}

/// Keep at most five rationale lines, with every number removed so unverified
/// figures never reach the report. Non-list rationales become empty.
pub fn sanitize_rationale(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(lines)) = value else {
        return Vec::new();
    };

    lines
        .iter()
        .take(MAX_RATIONALE)
        .map(|line| match line {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .map(|line| strip_numbers(&line))
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Signed decimal literal. `\d` covers every Unicode digit, full-width included.
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("number pattern compiles"));

/// Remove signed decimal literals from `text`.
pub fn strip_numbers(text: &str) -> String {
    NUMBER.replace_all(text, "").into_owned()
}
