pub mod breaker;
pub mod error;
pub mod factory;
pub mod fallback;
pub mod metrics;
pub mod ollama;
pub mod openai;
pub mod pricing;
pub mod prompt;
pub mod provider;
pub mod review;

pub use breaker::CircuitBreakerProvider;
pub use error::CircuitOpenError;
pub use factory::build_provider;
pub use fallback::FallbackProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{Provider, ReviewRequest, ReviewResponse, Usage};
pub use review::{parse_review, Issue, ReviewResult, Severity};
