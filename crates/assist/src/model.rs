use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use project_hub_core::{HubError, HubResult};

pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const TEMPERATURE: f32 = 0.7;

/// A text-in, text-out completion endpoint.
#[async_trait]
pub trait LanguageModel: Send + Sync {
  /// # Errors
  ///
  /// Fails with [`HubError::Model`] when the call does not produce a completion.
  async fn complete(&self, prompt: &str) -> HubResult<String>;
}

#[async_trait]
impl<M: LanguageModel + ?Sized> LanguageModel for Box<M> {
  async fn complete(&self, prompt: &str) -> HubResult<String> {
    (**self).complete(prompt).await
  }
}

/// Chat completions served by OpenRouter.
pub struct OpenRouterModel {
  client: reqwest::Client,
  api_key: String,
  model: String,
  url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: [ChatMessage<'a>; 1],
  temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
  #[serde(default)]
  content: Option<String>,
}

impl OpenRouterModel {
  pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
    Self {
      client: reqwest::Client::new(),
      api_key: api_key.into(),
      model: model.into(),
      url: OPENROUTER_URL.to_string(),
    }
  }

  /// Points the client at another OpenAI-compatible endpoint.
  pub fn url(mut self, url: impl Into<String>) -> Self {
    self.url = url.into();
    self
  }

  pub fn model(&self) -> &str {
    &self.model
  }
}

#[async_trait]
impl LanguageModel for OpenRouterModel {
  #[instrument(level = "debug", skip_all, fields(model = %self.model))]
  async fn complete(&self, prompt: &str) -> HubResult<String> {
    let request = ChatRequest {
      model: &self.model,
      messages: [ChatMessage {
        role: "user",
        content: prompt,
      }],
      temperature: TEMPERATURE,
    };

    let response = self
      .client
      .post(&self.url)
      .bearer_auth(&self.api_key)
      .json(&request)
      .send()
      .await
      .map_err(|e| HubError::Model(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
      let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
      return Err(HubError::Model(format!("model returned {status}: {body}")));
    }

    let reply: ChatResponse = response
      .json()
      .await
      .map_err(|e| HubError::Model(format!("unexpected response: {e}")))?;
    debug!("Received {} choices", reply.choices.len());

    reply
      .choices
      .into_iter()
      .next()
      .and_then(|choice| choice.message.content)
      .ok_or_else(|| HubError::Model("No output from the model".into()))
  }
}
