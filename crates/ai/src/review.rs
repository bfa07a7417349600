use serde::Deserialize;

/// Closed severity set; anything the model invents collapses to `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "low" => Severity::Low,
            _ => Severity::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// One finding reported by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub line: u64,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub suggestion: String,
}

impl Issue {
    pub fn normalized_severity(&self) -> Severity {
        Severity::parse(&self.severity)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewResult {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Decodes the model's strict-JSON issue list.
///
/// Markdown fences, prose, or schema drift all fail the decode; the caller
/// discards that call's findings and moves on.
pub fn parse_review(content: &str) -> Result<ReviewResult, serde_json::Error> {
    serde_json::from_str(content)
}
