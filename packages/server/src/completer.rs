//! OpenAI-compatible chat-completion client.

use async_trait::async_trait;
use resource_pool::error::{PoolError, Result};
use resource_pool::ChatCompleter;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Minimal chat-completions client against any OpenAI-compatible endpoint.
pub struct OpenAiCompleter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompleter {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ChatCompleter for OpenAiCompleter {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| PoolError::Completion(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PoolError::Completion(
                format!("chat completion returned {status}").into(),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PoolError::Completion(Box::new(e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| PoolError::Completion("empty choices in completion".into()))?;

        debug!(model = %self.model, chars = content.len(), "completion received");
        Ok(content)
    }
}
