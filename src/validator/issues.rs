use std::fmt;

/// A structural problem found while loading the OpenAPI document.
///
/// Issues are collected for the whole document before loading fails, so a
/// single startup attempt reports everything that needs fixing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Where in the document the issue was found (e.g. `GET /pets/{id}`)
    pub location: String,
    /// Short machine-friendly category (e.g. `UnresolvedPathParameter`)
    pub kind: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            location: location.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Render a list of issues one per line, the way they are reported at startup.
#[must_use]
pub fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
