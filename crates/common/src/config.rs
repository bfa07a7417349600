use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Process configuration, bound from the environment.
///
/// Every key has a default so the service boots with an empty environment;
/// `.env` files are honoured for local runs. Field names map to the upper-case
/// environment variables (`github_webhook_secret` ← `GITHUB_WEBHOOK_SECRET`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "AppConfig::default_port")]
    pub port: u16,
    #[serde(default = "AppConfig::default_env")]
    pub env: String,
    #[serde(default = "AppConfig::default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub github_webhook_secret: String,
    #[serde(default)]
    pub github_app_id: String,
    #[serde(default)]
    pub github_app_installation_id: String,
    #[serde(default)]
    pub github_app_private_key_path: String,

    #[serde(default = "AppConfig::default_ai_provider")]
    pub ai_provider: String,
    #[serde(default)]
    pub openai_key: String,
    #[serde(default = "AppConfig::default_openai_model")]
    pub openai_model: String,
    #[serde(default = "AppConfig::default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "AppConfig::default_ollama_model")]
    pub ollama_model: String,

    #[serde(default = "AppConfig::default_queue_type")]
    pub queue_type: String,
    #[serde(default = "AppConfig::default_redis_addr")]
    pub redis_addr: String,

    #[serde(default = "AppConfig::default_rate_limit_rps")]
    pub rate_limit_rps: u32,
    #[serde(default = "AppConfig::default_rate_limit_burst")]
    pub rate_limit_burst: u32,

    #[serde(default)]
    pub budget_enabled: bool,
    #[serde(default = "AppConfig::default_budget_daily_usd")]
    pub budget_daily_usd: f64,
    #[serde(default = "AppConfig::default_budget_per_pr_usd")]
    pub budget_per_pr_usd: f64,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(Environment::default())
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    const fn default_port() -> u16 {
        8080
    }

    fn default_env() -> String {
        "local".to_string()
    }

    fn default_log_level() -> String {
        "debug".to_string()
    }

    fn default_ai_provider() -> String {
        "openai".to_string()
    }

    fn default_openai_model() -> String {
        "gpt-3.5-turbo".to_string()
    }

    fn default_ollama_url() -> String {
        "http://localhost:11434".to_string()
    }

    fn default_ollama_model() -> String {
        "llama3".to_string()
    }

    fn default_queue_type() -> String {
        "memory".to_string()
    }

    fn default_redis_addr() -> String {
        "localhost:6379".to_string()
    }

    const fn default_rate_limit_rps() -> u32 {
        2
    }

    const fn default_rate_limit_burst() -> u32 {
        4
    }

    const fn default_budget_daily_usd() -> f64 {
        10.0
    }

    const fn default_budget_per_pr_usd() -> f64 {
        1.0
    }
}
