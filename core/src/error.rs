use serde::Serialize;
use thiserror::Error;

/// Error codes used across tool and resource dispatch
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NOT_FOUND: &str = "not_found";
    pub const HANDLER_FAULT: &str = "handler_fault";
    pub const EMPTY_CONTENTS: &str = "empty_contents";
}

/// One offending field in a rejected argument object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Which field caused the error ("arguments" when the whole object is wrong)
    pub field: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Input failed schema constraints. Lists every offending field, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|issue| issue.field.as_str()).collect()
    }
}

fn render_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.field, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure raised from inside a tool or resource handler body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerFault {
    pub message: String,
}

impl HandlerFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for HandlerFault {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Failed to decode arguments: {err}"))
    }
}

/// Per-invocation failures. These never leave the registry/router boundary
/// as anything but a well-formed error response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Unknown tool: {name}")]
    ToolNotFound { name: String },

    #[error("No resource template matches {uri}")]
    ResourceNotFound { uri: String },

    #[error("Invalid arguments: {0}")]
    Validation(#[from] ValidationError),

    #[error("'{capability}' failed: {fault}")]
    Handler {
        capability: String,
        fault: HandlerFault,
    },

    #[error("Resource '{name}' returned no contents for {uri}")]
    EmptyContents { name: String, uri: String },
}

impl DispatchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ToolNotFound { .. } | Self::ResourceNotFound { .. } => codes::NOT_FOUND,
            Self::Validation(_) => codes::VALIDATION_FAILED,
            Self::Handler { .. } => codes::HANDLER_FAULT,
            Self::EmptyContents { .. } => codes::EMPTY_CONTENTS,
        }
    }
}

/// Start-up failures. Fatal: the host must not serve requests after one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Capability name '{name}' is registered more than once")]
    DuplicateName { name: String },

    #[error("Invalid URI template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error(
        "Tool '{tool}' schema does not match its handler (missing in schema: {missing:?}, unknown to handler: {unexpected:?})"
    )]
    SchemaMismatch {
        tool: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("{key} must be set")]
    MissingValue { key: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_message_lists_every_issue() {
        let err = ValidationError::new(vec![
            FieldIssue::new("a", "required field is missing"),
            FieldIssue::new("b", "expected number, received string"),
        ]);
        assert_eq!(
            err.to_string(),
            "a: required field is missing; b: expected number, received string"
        );
        assert_eq!(err.fields(), vec!["a", "b"]);
    }

    #[test]
    fn dispatch_error_codes_are_stable() {
        let not_found = DispatchError::ToolNotFound {
            name: "nope".to_string(),
        };
        assert_eq!(not_found.code(), codes::NOT_FOUND);
        assert_eq!(not_found.to_string(), "Unknown tool: nope");

        let fault = DispatchError::Handler {
            capability: "add".to_string(),
            fault: HandlerFault::new("boom"),
        };
        assert_eq!(fault.code(), codes::HANDLER_FAULT);
        assert_eq!(fault.to_string(), "'add' failed: boom");
    }

    #[test]
    fn missing_value_names_the_key() {
        let err = ConfigurationError::MissingValue {
            key: "API_KEY".to_string(),
        };
        assert_eq!(err.to_string(), "API_KEY must be set");
    }
}
