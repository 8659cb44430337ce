use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity level of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

/// Where an issue came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSource {
    /// Remote prose lint service
    Remote,
    /// Local structural rules
    Local,
}

impl fmt::Display for IssueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSource::Remote => f.write_str("remote"),
            IssueSource::Local => f.write_str("local"),
        }
    }
}

/// Replacement of a byte range of the document text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub range: (usize, usize),
    pub text: String,
}

/// A quality issue found in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Stable identifier, assigned when the issue joins a report
    pub id: String,

    pub source: IssueSource,

    /// The rule that produced this issue
    pub rule_id: String,

    /// Human-readable message
    pub message: String,

    /// 1-based line
    pub line: usize,

    /// 1-based column
    pub column: usize,

    pub severity: Severity,

    /// Optional machine-applicable fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl Issue {
    pub fn new(
        source: IssueSource,
        severity: Severity,
        rule_id: impl Into<String>,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            id: String::new(),
            source,
            rule_id: rule_id.into(),
            message: message.into(),
            line: line.max(1),
            column: column.max(1),
            severity,
            fix: None,
        }
    }

    pub fn error(rule_id: impl Into<String>, message: impl Into<String>, line: usize) -> Self {
        Self::new(IssueSource::Local, Severity::Error, rule_id, message, line, 1)
    }

    pub fn warning(rule_id: impl Into<String>, message: impl Into<String>, line: usize) -> Self {
        Self::new(IssueSource::Local, Severity::Warning, rule_id, message, line, 1)
    }

    pub fn with_fix(mut self, range: (usize, usize), text: impl Into<String>) -> Self {
        self.fix = Some(Fix {
            range,
            text: text.into(),
        });
        self
    }

    /// Identifier before duplicate disambiguation
    pub(crate) fn base_id(&self) -> String {
        format!("{}:{}:{}:{}", self.source, self.rule_id, self.line, self.column)
    }
}
