use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{truncate_body, ProviderHttpError};
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};
use crate::provider::{Provider, ReviewRequest, ReviewResponse, Usage};

pub const OPENAI_API_BASE: &str = "https://api.openai.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiProvider {
    client: reqwest::Client,
    base: String,
    key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl OpenAiProvider {
    pub fn new(key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base(OPENAI_API_BASE, key, model)
    }

    pub fn with_base(
        base: impl Into<String>,
        key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            client,
            base: base.into(),
            key: key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn review(&self, request: &ReviewRequest) -> Result<ReviewResponse> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_user_prompt(request),
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base))
            .bearer_auth(&self.key)
            .json(&body)
            .send()
            .await
            .context("openai request")?;

        let status = response.status();
        let bytes = response.bytes().await.context("openai response body")?;
        if !status.is_success() {
            return Err(ProviderHttpError {
                provider: "openai",
                status,
                body: truncate_body(&bytes),
            }
            .into());
        }

        parse_chat_response(&bytes, &self.model)
    }
}

fn parse_chat_response(bytes: &[u8], model: &str) -> Result<ReviewResponse> {
    let decoded: ChatResponse =
        serde_json::from_slice(bytes).context("decoding openai response")?;
    let choice = decoded
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("openai returned no choices"))?;

    Ok(ReviewResponse {
        content: choice.message.content,
        provider: "openai".to_string(),
        model: model.to_string(),
        usage: Usage {
            prompt_tokens: decoded.usage.prompt_tokens,
            completion_tokens: decoded.usage.completion_tokens,
            total_tokens: decoded.usage.total_tokens,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_and_usage() {
        let body = r#"{
            "choices": [{"message": {"content": "{\"issues\":[]}"}}],
            "usage": {"prompt_tokens": 100, "completion_tokens": 80, "total_tokens": 180}
        }"#;
        let response = parse_chat_response(body.as_bytes(), "gpt-3.5-turbo").expect("parsed");

        assert_eq!(response.content, "{\"issues\":[]}");
        assert_eq!(response.provider, "openai");
        assert_eq!(response.model, "gpt-3.5-turbo");
        assert_eq!(response.usage.prompt_tokens, 100);
        assert_eq!(response.usage.completion_tokens, 80);
        assert_eq!(response.usage.total_tokens, 180);
    }

    #[test]
    fn missing_choices_is_an_error() {
        let result = parse_chat_response(br#"{"choices": []}"#, "gpt-3.5-turbo");
        assert!(result.is_err());
    }

    #[test]
    fn missing_usage_defaults_to_zero() {
        let body = r#"{"choices": [{"message": {"content": "x"}}]}"#;
        let response = parse_chat_response(body.as_bytes(), "gpt-3.5-turbo").expect("parsed");
        assert_eq!(response.usage, Usage::default());
    }
}
