use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::provider::{Provider, ReviewRequest, ReviewResponse};

/// Tries the secondary provider whenever the primary errors.
///
/// Two levels only, and the secondary is deliberately left outside any
/// circuit breaker: it is the escape hatch when the primary's breaker is open.
pub struct FallbackProvider {
    primary: Arc<dyn Provider>,
    secondary: Arc<dyn Provider>,
}

impl FallbackProvider {
    pub fn new(primary: Arc<dyn Provider>, secondary: Arc<dyn Provider>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    async fn review(&self, request: &ReviewRequest) -> Result<ReviewResponse> {
        match self.primary.review(request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                warn!(error = %err, "primary provider failed, trying fallback");
                self.secondary.review(request).await
            }
        }
    }
}
