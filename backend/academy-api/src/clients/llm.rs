// ============================================
// LLM chat-completion client
// ============================================
//
// Talks to any OpenAI-compatible `/chat/completions` endpoint. The API key
// stays on the server; callers only ever see the generated text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one chat completion and return the assistant's text.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;

    fn model(&self) -> &str;
}

pub struct OpenAiCompatibleProvider {
    client: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        if config.api_key.is_empty() {
            tracing::warn!("LLM API key is not configured; AI endpoints will fail upstream");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("LLM API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "LLM API error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("LLM API parse error: {}", e)))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::Upstream("LLM returned an empty completion".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Decode JSON the model was asked to produce. Models often wrap it in a
/// Markdown fence or surround it with prose, so only the outermost object
/// is parsed.
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let trimmed = raw.trim();
    let candidate = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    };

    serde_json::from_str(candidate)
        .map_err(|e| AppError::Upstream(format!("Could not parse model output as JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        sentiment: String,
        score: i32,
    }

    #[test]
    fn parses_bare_json() {
        let v: Verdict = parse_model_json(r#"{"sentiment":"bullish","score":3}"#).unwrap();
        assert_eq!(v.sentiment, "bullish");
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"sentiment\": \"neutral\", \"score\": 0}\n```";
        let v: Verdict = parse_model_json(raw).unwrap();
        assert_eq!(
            v,
            Verdict {
                sentiment: "neutral".into(),
                score: 0
            }
        );
    }

    #[test]
    fn parses_json_surrounded_by_prose() {
        let raw = "Sure! Here it is: {\"sentiment\": \"bearish\", \"score\": -2} Hope that helps.";
        let v: Verdict = parse_model_json(raw).unwrap();
        assert_eq!(v.score, -2);
    }

    #[test]
    fn rejects_non_json() {
        let err = parse_model_json::<Verdict>("I cannot help with that.").unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::system("hi")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"hi"}"#);
    }
}
