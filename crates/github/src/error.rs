use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GithubApiError {
    #[error("github api error: {status} for {endpoint}: {body}")]
    Http {
        status: StatusCode,
        endpoint: String,
        body: String,
    },
    #[error("github rate limited for {endpoint}")]
    RateLimited { endpoint: String },
    #[error("empty installation token")]
    EmptyToken,
}

impl GithubApiError {
    pub fn status(status: StatusCode, endpoint: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            endpoint: endpoint.into(),
            body: body.into(),
        }
    }

    pub fn rate_limited(endpoint: impl Into<String>) -> Self {
        Self::RateLimited {
            endpoint: endpoint.into(),
        }
    }
}
