use std::sync::Arc;

use common::AppConfig;

use crate::breaker::CircuitBreakerProvider;
use crate::fallback::FallbackProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use crate::provider::Provider;

/// Assembles the provider chain: primary behind a circuit breaker, with the
/// Ollama client as the unwrapped fallback when OpenAI is primary.
pub fn build_provider(config: &AppConfig) -> Arc<dyn Provider> {
    match config.ai_provider.as_str() {
        "ollama" => {
            let primary =
                OllamaProvider::new(config.ollama_url.clone(), config.ollama_model.clone());
            Arc::new(CircuitBreakerProvider::new(Arc::new(primary)))
        }
        _ => {
            let primary =
                OpenAiProvider::new(config.openai_key.clone(), config.openai_model.clone());
            let guarded = CircuitBreakerProvider::new(Arc::new(primary));
            let fallback =
                OllamaProvider::new(config.ollama_url.clone(), config.ollama_model.clone());
            Arc::new(FallbackProvider::new(
                Arc::new(guarded),
                Arc::new(fallback),
            ))
        }
    }
}
