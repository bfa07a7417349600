use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use http::header;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{truncate_body, HttpExec};
use crate::error::GithubApiError;

/// Installation tokens live for an hour; refresh well before that.
pub const INSTALLATION_TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

const APP_JWT_BACKDATE: i64 = 60;
const APP_JWT_LIFETIME: i64 = 9 * 60;
const TOKEN_ENDPOINT_BASE: &str = "https://api.github.com/app/installations";

/// Single-slot cache for the current installation token.
#[derive(Debug, Default)]
pub struct TokenCache {
    inner: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl TokenCache {
    pub fn get(&self) -> Option<String> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|cached| Instant::now() < cached.expires_at)
            .map(|cached| cached.token.clone())
    }

    pub fn set(&self, token: String, ttl: Duration) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(CachedToken {
            token,
            expires_at: Instant::now() + ttl,
        });
    }
}

/// Source of forge bearer tokens; production uses [`AppAuth`], tests inject a
/// static token.
#[async_trait]
pub trait InstallationAuth: Send + Sync {
    async fn installation_token(&self) -> Result<String>;
}

/// GitHub App identity: signs a short-lived RS256 JWT and exchanges it for a
/// cached installation token.
pub struct AppAuth {
    app_id: String,
    installation_id: String,
    private_key_path: String,
    http: Arc<dyn HttpExec>,
    cache: TokenCache,
}

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
}

impl AppAuth {
    pub fn new(
        app_id: impl Into<String>,
        installation_id: impl Into<String>,
        private_key_path: impl Into<String>,
        http: Arc<dyn HttpExec>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            installation_id: installation_id.into(),
            private_key_path: private_key_path.into(),
            http,
            cache: TokenCache::default(),
        }
    }

    async fn app_jwt(&self) -> Result<String> {
        let pem = tokio::fs::read(&self.private_key_path)
            .await
            .with_context(|| format!("reading app private key {}", self.private_key_path))?;
        // Accepts both PKCS1 and PKCS8 RSA keys.
        let key = EncodingKey::from_rsa_pem(&pem).context("parsing app private key")?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock before unix epoch")?
            .as_secs() as i64;
        let claims = AppClaims {
            iat: now - APP_JWT_BACKDATE,
            exp: now + APP_JWT_LIFETIME,
            iss: self.app_id.clone(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .context("signing app jwt")
    }
}

#[async_trait]
impl InstallationAuth for AppAuth {
    async fn installation_token(&self) -> Result<String> {
        if let Some(token) = self.cache.get() {
            return Ok(token);
        }

        let jwt = self.app_jwt().await?;
        let endpoint = format!(
            "{TOKEN_ENDPOINT_BASE}/{}/access_tokens",
            self.installation_id
        );
        let request = http::Request::builder()
            .method("POST")
            .uri(&endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {jwt}"))
            .header(header::ACCEPT, "application/vnd.github+json")
            .body(Vec::new())
            .context("building token request")?;

        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.into_body();
        if !status.is_success() {
            return Err(GithubApiError::status(
                status,
                "app installation token",
                truncate_body(&body),
            )
            .into());
        }

        let decoded: TokenResponse =
            serde_json::from_slice(&body).context("decoding token response")?;
        if decoded.token.is_empty() {
            return Err(GithubApiError::EmptyToken.into());
        }

        debug!("refreshed installation token");
        self.cache
            .set(decoded.token.clone(), INSTALLATION_TOKEN_TTL);
        Ok(decoded.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_returns_fresh_token() {
        let cache = TokenCache::default();
        assert_eq!(cache.get(), None);

        cache.set("t1".to_string(), Duration::from_secs(60));
        assert_eq!(cache.get(), Some("t1".to_string()));
    }

    #[test]
    fn cache_expires_token() {
        let cache = TokenCache::default();
        cache.set("t1".to_string(), Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn cache_replaces_token() {
        let cache = TokenCache::default();
        cache.set("t1".to_string(), Duration::from_secs(60));
        cache.set("t2".to_string(), Duration::from_secs(60));
        assert_eq!(cache.get(), Some("t2".to_string()));
    }
}
