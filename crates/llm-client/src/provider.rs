use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::LlmResult;
use crate::parse::extract_json_object;

/// Backend-agnostic chat completion used by the scoring agents.
///
/// Implemented by the DeepSeek HTTP client and by scripted providers in tests.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Raw assistant reply to a system + user prompt pair.
    async fn complete(&self, system: &str, user: &str) -> LlmResult<String>;

    /// Reply parsed as a JSON object.
    async fn complete_json(&self, system: &str, user: &str) -> LlmResult<Map<String, Value>> {
        let reply = self.complete(system, user).await?;
        extract_json_object(&reply)
    }

    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;

    struct Canned(&'static str);

    #[async_trait]
    impl LlmProvider for Canned {
        async fn complete(&self, _system: &str, _user: &str) -> LlmResult<String> {
            Ok(self.0.to_string())
        }

        fn backend_name(&self) -> &'static str {
            "canned"
        }
    }

    #[tokio::test]
    async fn test_complete_json_parses_reply() {
        let provider = Canned("```json\n{\"index\": 0.3}\n```");
        let map = provider.complete_json("sys", "user").await.unwrap();
        assert_eq!(map["index"], 0.3);
    }

    #[tokio::test]
    async fn test_complete_json_rejects_prose() {
        let provider = Canned("I think the market is bullish.");
        let err = provider.complete_json("sys", "user").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }
}
