use std::fmt::Write;

use ai::Severity;

/// Per-job tally rendered into the final pull-request comment.
#[derive(Debug, Clone, Default)]
pub struct ReviewSummary {
    pub total_issues: u64,
    pub posted_comments: u64,
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub cost_usd: f64,
    /// Reason the budget guard stopped the job, when it did.
    pub budget_stop: Option<String>,
}

impl ReviewSummary {
    pub fn bump_severity(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut body = String::from("## AI Review Summary\n\n");

        if self.total_issues == 0 {
            let _ = write!(
                body,
                "No issues detected in the changed files.\n\nEstimated cost (USD): ${:.4}\n",
                self.cost_usd
            );
        } else {
            let _ = writeln!(body, "- Total issues found: {}", self.total_issues);
            let _ = writeln!(body, "- Line comments posted: {}", self.posted_comments);
            let _ = writeln!(body, "- Critical: {}", self.critical);
            let _ = writeln!(body, "- High: {}", self.high);
            let _ = writeln!(body, "- Medium: {}", self.medium);
            let _ = writeln!(body, "- Low: {}", self.low);
            let _ = writeln!(body, "- Estimated cost (USD): ${:.4}", self.cost_usd);
        }

        if let Some(reason) = &self.budget_stop {
            if reason.is_empty() {
                body.push_str("- Budget guard triggered\n");
            } else {
                let _ = writeln!(body, "- Budget guard triggered: {reason}");
            }
        }

        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_issues_reports_clean_run_with_cost() {
        let summary = ReviewSummary {
            cost_usd: 0.0123,
            ..ReviewSummary::default()
        };
        let body = summary.to_markdown();

        assert!(body.starts_with("## AI Review Summary"));
        assert!(body.contains("No issues detected"));
        assert!(body.contains("Estimated cost (USD): $0.0123"));
    }

    #[test]
    fn totals_match_severity_counters() {
        let mut summary = ReviewSummary::default();
        summary.bump_severity(Severity::High);
        summary.bump_severity(Severity::Low);
        summary.bump_severity(Severity::Medium);
        summary.total_issues = 3;
        summary.posted_comments = 2;

        let body = summary.to_markdown();
        assert!(body.contains("Total issues found: 3"));
        assert!(body.contains("Line comments posted: 2"));
        assert!(body.contains("High: 1"));
        assert!(body.contains("Medium: 1"));
        assert!(body.contains("Low: 1"));
        assert!(body.contains("Critical: 0"));
        assert!(!body.contains("Budget guard triggered"));
    }

    #[test]
    fn budget_stop_appends_a_bullet() {
        let summary = ReviewSummary {
            budget_stop: Some("PR budget exceeded (limit=0.0100 USD)".to_string()),
            ..ReviewSummary::default()
        };
        let body = summary.to_markdown();
        assert!(body.contains("Budget guard triggered: PR budget exceeded"));
    }

    #[test]
    fn budget_stop_without_reason_is_bare() {
        let summary = ReviewSummary {
            budget_stop: Some(String::new()),
            ..ReviewSummary::default()
        };
        assert!(summary.to_markdown().ends_with("- Budget guard triggered\n"));
    }
}
