use thiserror::Error;

/// Fail-fast error emitted while the breaker is open or half-open probes are
/// exhausted; the fallback provider treats it like any other primary failure.
#[derive(Debug, Clone, Copy, Error)]
#[error("circuit breaker is open")]
pub struct CircuitOpenError;

#[derive(Debug, Error)]
#[error("{provider} error: status {status}: {body}")]
pub struct ProviderHttpError {
    pub provider: &'static str,
    pub status: reqwest::StatusCode,
    pub body: String,
}

const ERROR_BODY_LIMIT: usize = 4096;

pub(crate) fn truncate_body(body: &[u8]) -> String {
    let capped = &body[..body.len().min(ERROR_BODY_LIMIT)];
    String::from_utf8_lossy(capped).into_owned()
}
