//! Structured configuration issues.
//!
//! Loaders report problems as [`ConfigIssue`]s instead of failing outright,
//! so the binary can log warnings and refuse to start only on errors.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: a fallback value is used instead.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// An enum-like string field has an unrecognized value.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// A numeric field is outside its accepted range.
    OutOfRange { field: String, value: i64 },
    /// A field could not be parsed at all.
    Unparseable { field: String, value: String },
    /// Two jurors share the same id.
    DuplicateJuror { id: String },
    /// Fewer jurors than a debate needs.
    RosterTooSmall { count: usize },
    /// Fewer rounds than jurors: not every juror is guaranteed the floor.
    RoundsBelowRoster { rounds: u32, jurors: usize },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
