use async_trait::async_trait;

/// One chunk of diff text to review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub file: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewResponse {
    /// Raw model output; expected to be the strict-JSON issue list.
    pub content: String,
    pub provider: String,
    pub model: String,
    pub usage: Usage,
}

/// The single capability every model backend and decorator implements.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn review(&self, request: &ReviewRequest) -> anyhow::Result<ReviewResponse>;
}
