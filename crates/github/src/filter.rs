use crate::model::PullRequestEvent;

const SKIP_EXTENSIONS: &[&str] = &[".json", ".lock", ".sum", ".yaml", ".yml", ".md", ".txt"];
const REVIEW_EXTENSIONS: &[&str] = &[".go", ".js", ".ts", ".py"];

/// Whether a changed file is worth sending to the model.
pub fn is_reviewable(filename: &str) -> bool {
    if SKIP_EXTENSIONS.iter().any(|ext| filename.ends_with(ext)) {
        return false;
    }
    REVIEW_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
}

/// Returns why a pull-request event should not be reviewed, if any.
///
/// Drafts and bot authors are dropped outright; only `opened` and
/// `synchronize` actions trigger a review.
pub fn skip_reason(event: &PullRequestEvent) -> Option<&'static str> {
    if event.pull_request.draft {
        return Some("draft pull request");
    }
    if event.pull_request.user.login.to_lowercase().contains("bot") {
        return Some("bot author");
    }
    if event.action != "opened" && event.action != "synchronize" {
        return Some("ignored action");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Actor, PullRequest, Repository};

    fn event(action: &str, login: &str, draft: bool) -> PullRequestEvent {
        PullRequestEvent {
            action: action.to_string(),
            pull_request: PullRequest {
                number: 7,
                draft,
                user: Actor {
                    login: login.to_string(),
                },
                title: String::new(),
            },
            repository: Repository {
                full_name: "acme/repo".to_string(),
            },
        }
    }

    #[test]
    fn reviews_known_source_extensions() {
        assert!(is_reviewable("cmd/main.go"));
        assert!(is_reviewable("web/app.ts"));
        assert!(is_reviewable("scripts/run.py"));
        assert!(is_reviewable("lib/index.js"));
    }

    #[test]
    fn skips_config_and_doc_files() {
        for name in [
            "package.json",
            "Cargo.lock",
            "go.sum",
            "deploy.yaml",
            "ci.yml",
            "README.md",
            "notes.txt",
        ] {
            assert!(!is_reviewable(name), "{name} should be skipped");
        }
    }

    #[test]
    fn skips_unknown_extensions() {
        assert!(!is_reviewable("image.png"));
        assert!(!is_reviewable("Makefile"));
    }

    #[test]
    fn accepts_opened_and_synchronize() {
        assert_eq!(skip_reason(&event("opened", "alice", false)), None);
        assert_eq!(skip_reason(&event("synchronize", "alice", false)), None);
    }

    #[test]
    fn skips_drafts() {
        assert_eq!(
            skip_reason(&event("opened", "alice", true)),
            Some("draft pull request")
        );
    }

    #[test]
    fn skips_bot_logins_case_insensitively() {
        assert_eq!(
            skip_reason(&event("opened", "dependabot[bot]", false)),
            Some("bot author")
        );
        assert_eq!(
            skip_reason(&event("opened", "RoBot99", false)),
            Some("bot author")
        );
    }

    #[test]
    fn skips_other_actions() {
        assert_eq!(
            skip_reason(&event("closed", "alice", false)),
            Some("ignored action")
        );
        assert_eq!(
            skip_reason(&event("labeled", "alice", false)),
            Some("ignored action")
        );
    }
}
