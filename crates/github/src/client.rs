use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use http::{header, Request, Response, StatusCode};
use tracing::{debug, info};
use url::Url;

use common::retry::{retry, Backoff};

use crate::error::GithubApiError;
use crate::filter::is_reviewable;
use crate::model::{LineComment, PRFile};
use crate::token::InstallationAuth;

pub const GITHUB_API_BASE: &str = "https://api.github.com/";
const USER_AGENT: &str = "ai-review-pipeline";
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const ERROR_BODY_LIMIT: usize = 4096;
const FILES_RETRY_ATTEMPTS: u32 = 3;
const FILES_RETRY_STEP: Duration = Duration::from_millis(500);

/// Raw HTTP execution, separated so tests can stub the wire.
#[async_trait]
pub trait HttpExec: Send + Sync {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>>;
}

pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl Default for ReqwestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestExecutor {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self { client }
    }
}

#[async_trait]
impl HttpExec for ReqwestExecutor {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let (parts, body) = req.into_parts();
        let mut builder = self.client.request(parts.method, parts.uri.to_string());
        builder = builder.headers(parts.headers);
        let resp = builder.body(body).send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?;
        let mut builder = Response::builder().status(status);
        if let Some(target) = builder.headers_mut() {
            *target = headers;
        }
        Ok(builder.body(bytes.to_vec())?)
    }
}

/// Read side of the forge: the files changed by a pull request, already
/// filtered to reviewable extensions.
#[async_trait]
pub trait PullRequestClient: Send + Sync {
    async fn get_pr_files(&self, repo: &str, pr: u64) -> Result<Vec<PRFile>>;
}

/// Write side of the forge: review line comments and issue comments.
#[async_trait]
pub trait CommentClient: Send + Sync {
    async fn create_line_comment(&self, repo: &str, pr: u64, comment: &LineComment) -> Result<()>;
    async fn create_comment(&self, repo: &str, pr: u64, body: &str) -> Result<()>;
}

pub struct RestGithubClient {
    http: Arc<dyn HttpExec>,
    auth: Arc<dyn InstallationAuth>,
    base: Url,
}

impl RestGithubClient {
    pub fn new(http: Arc<dyn HttpExec>, auth: Arc<dyn InstallationAuth>) -> Self {
        Self {
            http,
            auth,
            base: Url::parse(GITHUB_API_BASE).expect("valid base url"),
        }
    }

    pub fn with_base(mut self, base: Url) -> Self {
        self.base = base;
        self
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response<Vec<u8>>> {
        let token = self.auth.installation_token().await?;
        let url = self.base.join(path)?;
        debug!(method, endpoint = path, "dispatching github request");

        let mut builder = Request::builder()
            .method(method)
            .uri(url.as_str())
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, USER_AGENT);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(body.unwrap_or_default())
            .context("building github request")?;

        self.http.execute(request).await
    }

    async fn fetch_files_once(&self, repo: &str, pr: u64) -> Result<Vec<PRFile>> {
        let path = format!("repos/{repo}/pulls/{pr}/files");
        let response = self.send("GET", &path, None).await?;
        let status = response.status();
        let body = response.into_body();

        if status == StatusCode::FORBIDDEN {
            return Err(GithubApiError::rate_limited(path).into());
        }
        if !status.is_success() {
            return Err(GithubApiError::status(status, path, truncate_body(&body)).into());
        }

        serde_json::from_slice(&body).context("decoding pull request files")
    }

    async fn post_expect_success(&self, path: &str, payload: Vec<u8>) -> Result<()> {
        let response = self.send("POST", path, Some(payload)).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.into_body();
            return Err(GithubApiError::status(status, path, truncate_body(&body)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl PullRequestClient for RestGithubClient {
    async fn get_pr_files(&self, repo: &str, pr: u64) -> Result<Vec<PRFile>> {
        let files = retry(
            FILES_RETRY_ATTEMPTS,
            Backoff::Linear(FILES_RETRY_STEP),
            || self.fetch_files_once(repo, pr),
        )
        .await?;

        let reviewable: Vec<PRFile> = files
            .iter()
            .filter(|file| is_reviewable(&file.filename))
            .cloned()
            .collect();
        info!(
            repo,
            pr,
            total = files.len(),
            reviewable = reviewable.len(),
            "fetched pull request files"
        );
        Ok(reviewable)
    }
}

#[async_trait]
impl CommentClient for RestGithubClient {
    async fn create_line_comment(&self, repo: &str, pr: u64, comment: &LineComment) -> Result<()> {
        let path = format!("repos/{repo}/pulls/{pr}/comments");
        let payload = serde_json::to_vec(comment).context("encoding line comment")?;
        self.post_expect_success(&path, payload).await
    }

    async fn create_comment(&self, repo: &str, pr: u64, body: &str) -> Result<()> {
        let path = format!("repos/{repo}/issues/{pr}/comments");
        let payload = serde_json::to_vec(&serde_json::json!({ "body": body }))
            .context("encoding comment")?;
        self.post_expect_success(&path, payload).await
    }
}

/// Lossy, bounded rendering of an error body for messages and logs.
pub(crate) fn truncate_body(body: &[u8]) -> String {
    let capped = &body[..body.len().min(ERROR_BODY_LIMIT)];
    String::from_utf8_lossy(capped).into_owned()
}
