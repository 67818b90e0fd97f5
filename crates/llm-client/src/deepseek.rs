use analysis_core::DeepSeekSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, LlmResult};
use crate::provider::LlmProvider;

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// DeepSeek (OpenAI-compatible) chat-completions client.
#[derive(Clone)]
pub struct DeepSeekClient {
    client: reqwest::Client,
    settings: DeepSeekSettings,
    api_key: String,
}

impl DeepSeekClient {
    pub fn new(settings: DeepSeekSettings) -> LlmResult<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(settings.api_key_env.clone()))?
            .to_string();

        let client = reqwest::Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            client,
            settings,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.settings.base_url)
    }
}

#[async_trait]
impl LlmProvider for DeepSeekClient {
    async fn complete(&self, system: &str, user: &str) -> LlmResult<String> {
        let request = ChatRequest {
            model: &self.settings.model,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        tracing::debug!("DeepSeek request to {} (model {})", self.endpoint(), self.settings.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { LlmError::Timeout } else { LlmError::RequestFailed(e) })?;

        if !response.status().is_success() {
            return Err(LlmError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let body = response.json::<ChatResponse>().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("empty completion".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "deepseek"
    }
}
