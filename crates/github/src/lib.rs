pub mod client;
pub mod error;
pub mod filter;
pub mod model;
pub mod token;

pub use client::{
    CommentClient, HttpExec, PullRequestClient, ReqwestExecutor, RestGithubClient,
};
pub use error::GithubApiError;
pub use model::{LineComment, PRFile, PullRequestEvent};
pub use token::{AppAuth, InstallationAuth, TokenCache};
