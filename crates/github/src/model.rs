use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: PullRequest,
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub draft: bool,
    pub user: Actor,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

/// One changed file as reported by the pull-request files endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PRFile {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    /// Unified-diff fragment; absent for binary or oversized files.
    #[serde(default)]
    pub patch: Option<String>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineComment {
    pub body: String,
    pub path: String,
    pub line: u64,
    /// `RIGHT` anchors the comment on the new side of the diff.
    pub side: String,
}

impl LineComment {
    pub fn right(path: impl Into<String>, line: u64, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            path: path.into(),
            line,
            side: "RIGHT".to_string(),
        }
    }
}
