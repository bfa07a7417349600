use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use github::filter::skip_reason;
use github::model::PullRequestEvent;
use worker::Job;

use crate::routes::AppState;

/// The handler answers as soon as the enqueue resolves, never on the review.
const ENQUEUE_DEADLINE: Duration = Duration::from_secs(3);

const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const EVENT_HEADER: &str = "x-github-event";

pub async fn handle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !verify_signature(&state.webhook_secret, signature, &body) {
        warn!("invalid webhook signature");
        return (StatusCode::UNAUTHORIZED, "unauthorized");
    }

    let event = headers
        .get(EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if event != "pull_request" {
        debug!(event, "event ignored");
        return (StatusCode::OK, "ignored");
    }

    let payload: PullRequestEvent = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "malformed pull request payload");
            return (StatusCode::BAD_REQUEST, "invalid payload");
        }
    };

    let repo = payload.repository.full_name.clone();
    let pr = payload.pull_request.number;
    if let Some(reason) = skip_reason(&payload) {
        info!(repo, pr, reason, "pull request skipped");
        return (StatusCode::OK, "skipped");
    }

    info!(repo, pr, action = %payload.action, "pull request accepted");
    match timeout(ENQUEUE_DEADLINE, state.queue.push(Job { repo, pr })).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "enqueue failed"),
        Err(_) => warn!("enqueue timed out"),
    }

    (StatusCode::OK, "ok")
}

/// Constant-time check of `sha256=<hex>` against HMAC-SHA256 of the body.
///
/// An unconfigured secret rejects everything rather than accepting blind.
fn verify_signature(secret: &str, header: &str, body: &[u8]) -> bool {
    if secret.is_empty() {
        warn!("webhook secret not configured");
        return false;
    }
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac key");
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_a_matching_signature() {
        let body = br#"{"action":"opened"}"#;
        let header = sign("s3cret", body);
        assert!(verify_signature("s3cret", &header, body));
    }

    #[test]
    fn rejects_a_wrong_digest() {
        assert!(!verify_signature("s3cret", "sha256=deadbeef", b"{}"));
    }

    #[test]
    fn rejects_missing_prefix_and_bad_hex() {
        let body = b"{}";
        let header = sign("s3cret", body);
        let bare = header.trim_start_matches("sha256=");
        assert!(!verify_signature("s3cret", bare, body));
        assert!(!verify_signature("s3cret", "sha256=zzzz", body));
    }

    #[test]
    fn rejects_when_secret_is_unconfigured() {
        let body = b"{}";
        let header = sign("", body);
        assert!(!verify_signature("", &header, body));
    }
}
