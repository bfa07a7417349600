use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chunker::estimate_tokens;
use serde::{Deserialize, Serialize};

use crate::error::{truncate_body, ProviderHttpError};
use crate::prompt::build_user_prompt;
use crate::provider::{Provider, ReviewRequest, ReviewResponse, Usage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OllamaProvider {
    client: reqwest::Client,
    base: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaProvider {
    pub fn new(base: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            client,
            base: base.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn review(&self, request: &ReviewRequest) -> Result<ReviewResponse> {
        let prompt = build_user_prompt(request);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base))
            .json(&body)
            .send()
            .await
            .context("ollama request")?;

        let status = response.status();
        let bytes = response.bytes().await.context("ollama response body")?;
        if !status.is_success() {
            return Err(ProviderHttpError {
                provider: "ollama",
                status,
                body: truncate_body(&bytes),
            }
            .into());
        }

        let decoded: GenerateResponse =
            serde_json::from_slice(&bytes).context("decoding ollama response")?;

        // Ollama does not report token usage; estimate from text length.
        let usage = estimate_usage(&body.prompt, &decoded.response);
        Ok(ReviewResponse {
            content: decoded.response,
            provider: "ollama".to_string(),
            model: self.model.clone(),
            usage,
        })
    }
}

fn estimate_usage(prompt: &str, completion: &str) -> Usage {
    let prompt_tokens = estimate_tokens(prompt) as u64;
    let completion_tokens = estimate_tokens(completion) as u64;
    Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
    }
}
