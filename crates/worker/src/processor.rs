use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use sha1::{Digest, Sha1};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use ai::metrics::{label, AI_CALLS, AI_COST, AI_ERRORS, AI_LATENCY, AI_TOKENS, DEFAULT_LABEL};
use ai::{parse_review, pricing, Issue, Provider, ReviewRequest};
use chunker::Chunk;
use common::retry::{retry, Backoff};
use github::client::{CommentClient, PullRequestClient};
use github::model::LineComment;

use crate::budget::{Admission, BudgetGuard};
use crate::dedup::DedupStore;
use crate::queue::{Job, JobQueue};
use crate::ratelimit::LimiterRegistry;
use crate::summary::ReviewSummary;

/// Hard deadline per job, counted from the moment it is popped.
pub const JOB_TIMEOUT: Duration = Duration::from_secs(90);

const COMMENT_RETRY_ATTEMPTS: u32 = 3;
const COMMENT_RETRY_BASE: Duration = Duration::from_secs(1);
const POP_ERROR_PAUSE: Duration = Duration::from_secs(1);
const FALLBACK_COMMENT: &str = "Automated review finding; see the summary comment.";

/// Consumes jobs and drives the full review pipeline for each.
pub struct Processor {
    queue: Arc<dyn JobQueue>,
    files: Arc<dyn PullRequestClient>,
    comments: Arc<dyn CommentClient>,
    provider: Arc<dyn Provider>,
    dedup: Arc<dyn DedupStore>,
    limiters: Arc<LimiterRegistry>,
    budget: Arc<BudgetGuard>,
    token_limit: usize,
}

impl Processor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<dyn JobQueue>,
        files: Arc<dyn PullRequestClient>,
        comments: Arc<dyn CommentClient>,
        provider: Arc<dyn Provider>,
        dedup: Arc<dyn DedupStore>,
        limiters: Arc<LimiterRegistry>,
        budget: Arc<BudgetGuard>,
    ) -> Self {
        Self {
            queue,
            files,
            comments,
            provider,
            dedup,
            limiters,
            budget,
            token_limit: chunker::DEFAULT_TOKEN_LIMIT,
        }
    }

    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Single worker loop: blocks on the queue until shut down, retries pop
    /// errors after a short pause.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("review processor started");
        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                popped = self.queue.pop() => match popped {
                    Ok(job) => job,
                    Err(err) => {
                        warn!(error = %err, "queue pop failed");
                        sleep(POP_ERROR_PAUSE).await;
                        continue;
                    }
                },
            };
            self.handle(job).await;
        }
        info!("review processor stopped");
    }

    /// Reviews one job under the 90 s deadline; the timeout drops all
    /// in-flight I/O.
    #[instrument(skip(self), fields(repo = %job.repo, pr = job.pr))]
    pub async fn handle(&self, job: Job) {
        match timeout(JOB_TIMEOUT, self.review_pr(&job)).await {
            Ok(Ok(summary)) => info!(
                issues = summary.total_issues,
                posted = summary.posted_comments,
                cost_usd = summary.cost_usd,
                budget_stopped = summary.budget_stop.is_some(),
                "review finished"
            ),
            Ok(Err(err)) => warn!(error = %err, "review failed"),
            Err(_) => warn!("review timed out"),
        }
    }

    async fn review_pr(&self, job: &Job) -> Result<ReviewSummary> {
        let files = self.files.get_pr_files(&job.repo, job.pr).await?;
        let limiter = self.limiters.get(&job.repo);
        let mut summary = ReviewSummary::default();

        'files: for file in &files {
            let Some(patch) = file.patch.as_deref() else {
                continue;
            };
            for diff in chunker::parse(patch) {
                // Forge patches often omit the diff --git header line.
                let filename = if diff.filename.is_empty() {
                    file.filename.as_str()
                } else {
                    diff.filename.as_str()
                };
                let content = diff.prompt_text();

                for chunk in chunker::split(filename, &content, self.token_limit) {
                    match self.budget.allow(&job.repo, job.pr, 0.0, Utc::now()).await {
                        Ok(Admission::Granted) => {}
                        Ok(Admission::Denied { reason }) => {
                            info!(reason = %reason, "budget guard stopped the job");
                            summary.budget_stop = Some(reason);
                            break 'files;
                        }
                        Err(err) => {
                            warn!(error = %err, "budget check failed");
                            summary.budget_stop = Some(err.to_string());
                            break 'files;
                        }
                    }

                    limiter.until_ready().await;
                    self.review_chunk(job, &chunk, &mut summary).await;
                }
            }
        }

        let body = summary.to_markdown();
        let posted = retry(
            COMMENT_RETRY_ATTEMPTS,
            Backoff::Exponential(COMMENT_RETRY_BASE),
            || self.comments.create_comment(&job.repo, job.pr, &body),
        )
        .await;
        if let Err(err) = posted {
            warn!(error = %err, "failed to post summary comment");
        }

        Ok(summary)
    }

    /// One model call plus everything downstream of it; errors never
    /// propagate past the chunk.
    async fn review_chunk(&self, job: &Job, chunk: &Chunk, summary: &mut ReviewSummary) {
        let request = ReviewRequest {
            file: chunk.file.clone(),
            content: chunk.content.clone(),
        };
        let started = Instant::now();
        let result = self.provider.review(&request).await;
        let elapsed = started.elapsed().as_secs_f64();

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                AI_CALLS.with_label_values(&[DEFAULT_LABEL]).inc();
                AI_LATENCY.with_label_values(&[DEFAULT_LABEL]).observe(elapsed);
                AI_ERRORS.with_label_values(&[DEFAULT_LABEL]).inc();
                warn!(file = %chunk.file, error = %err, "model review failed");
                return;
            }
        };

        let provider = label(&response.provider);
        let model = label(&response.model);
        AI_CALLS.with_label_values(&[provider]).inc();
        AI_LATENCY.with_label_values(&[provider]).observe(elapsed);
        AI_TOKENS
            .with_label_values(&[provider, model, "prompt"])
            .inc_by(response.usage.prompt_tokens);
        AI_TOKENS
            .with_label_values(&[provider, model, "completion"])
            .inc_by(response.usage.completion_tokens);

        let cost = pricing::estimate_usd(
            &response.model,
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
        );
        AI_COST.with_label_values(&[provider, model]).inc_by(cost);
        summary.cost_usd += cost;
        if let Err(err) = self.budget.record(&job.repo, job.pr, cost, Utc::now()).await {
            warn!(error = %err, "failed to record spend");
        }

        let result = match parse_review(&response.content) {
            Ok(result) => result,
            Err(err) => {
                debug!(file = %chunk.file, error = %err, "model output was not valid JSON");
                return;
            }
        };

        for issue in &result.issues {
            self.post_issue(job, chunk, issue, summary).await;
        }
    }

    async fn post_issue(&self, job: &Job, chunk: &Chunk, issue: &Issue, summary: &mut ReviewSummary) {
        summary.total_issues += 1;
        summary.bump_severity(issue.normalized_severity());

        let key = dedup_key(&chunk.file, issue);
        if self.dedup.seen(&key) {
            debug!(file = %chunk.file, line = issue.line, "duplicate issue suppressed");
            return;
        }

        let body = if !issue.suggestion.is_empty() {
            issue.suggestion.clone()
        } else if !issue.title.is_empty() {
            issue.title.clone()
        } else {
            FALLBACK_COMMENT.to_string()
        };
        let comment = LineComment::right(chunk.file.clone(), issue.line, body);

        let posted = retry(
            COMMENT_RETRY_ATTEMPTS,
            Backoff::Exponential(COMMENT_RETRY_BASE),
            || self.comments.create_line_comment(&job.repo, job.pr, &comment),
        )
        .await;
        match posted {
            Ok(()) => {
                self.dedup.mark(&key);
                summary.posted_comments += 1;
            }
            Err(err) => {
                warn!(file = %chunk.file, line = issue.line, error = %err, "failed to post line comment");
            }
        }
    }
}

/// `file:line:SHA1(severity+title+suggestion)`; stable across re-reviews of
/// the same finding.
fn dedup_key(file: &str, issue: &Issue) -> String {
    let mut hasher = Sha1::new();
    hasher.update(issue.severity.as_bytes());
    hasher.update(issue.title.as_bytes());
    hasher.update(issue.suggestion.as_bytes());
    format!("{file}:{}:{}", issue.line, hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: &str, title: &str, suggestion: &str) -> Issue {
        serde_json::from_str(&format!(
            r#"{{"line": 3, "severity": "{severity}", "title": "{title}", "suggestion": "{suggestion}"}}"#
        ))
        .expect("issue")
    }

    #[test]
    fn dedup_key_is_stable_for_identical_findings() {
        let a = dedup_key("main.go", &issue("high", "nil check", "add nil check"));
        let b = dedup_key("main.go", &issue("high", "nil check", "add nil check"));
        assert_eq!(a, b);
        assert!(a.starts_with("main.go:3:"));
    }

    #[test]
    fn dedup_key_differs_per_field() {
        let base = dedup_key("main.go", &issue("high", "nil check", "add nil check"));
        assert_ne!(
            base,
            dedup_key("other.go", &issue("high", "nil check", "add nil check"))
        );
        assert_ne!(
            base,
            dedup_key("main.go", &issue("low", "nil check", "add nil check"))
        );
        assert_ne!(
            base,
            dedup_key("main.go", &issue("high", "nil check", "different fix"))
        );
    }
}
