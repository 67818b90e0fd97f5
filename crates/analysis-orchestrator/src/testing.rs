//! In-memory LLM provider for tests.

use async_trait::async_trait;
use llm_client::{LlmError, LlmProvider, LlmResult};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Replays a fixed script of replies, one per call, and records the prompts.
/// An exhausted script answers with `ServiceUnavailable`.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<LlmResult<String>>>,
    prompts: Mutex<Vec<(String, String)>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn replies(script: Vec<LlmResult<&str>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(|r| r.map(str::to_string)).collect()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().map(|(_, user)| user.clone())
    }

    pub fn user_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().iter().map(|(_, user)| user.clone()).collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, system: &str, user: &str) -> LlmResult<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::ServiceUnavailable("script exhausted".to_string())))
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}
