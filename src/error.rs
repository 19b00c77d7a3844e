//! Error types for quill.

use thiserror::Error;

/// The main error type for query compilation.
///
/// Every variant is fatal: a failing stage aborts the whole compile and no
/// partial command is returned.
#[derive(Debug, Error)]
pub enum QuillError {
    /// No transformer is registered for a method-call signature.
    #[error("The method '{method}' is not supported by this code generator, and no custom transformer has been registered. Expression: '{call}'")]
    UnsupportedMethod { method: String, call: String },

    /// A transformer rejected one of the call's arguments.
    #[error("Invalid argument for method '{method}': {message}")]
    InvalidMethodArgument { method: String, message: String },

    /// A query clause this backend cannot translate.
    #[error("Clause '{clause}' is not supported: {reason}")]
    UnsupportedClause { clause: String, reason: String },

    /// A result operator that is unknown or cannot be combined with the previous ones.
    #[error("Result operator '{operator}' is not supported: {reason}")]
    UnsupportedResultOperator { operator: String, reason: String },

    /// The mapping resolver has no schema mapping for a type or member.
    #[error("No mapping found for {kind} '{name}'")]
    UnmappedItem { kind: &'static str, name: String },

    /// An IR node the generator (or a stage) does not know how to handle.
    #[error("Expression kind '{kind}' is not supported: {expression}")]
    UnsupportedExpressionKind { kind: &'static str, expression: String },

    /// A node used in a predicate position that is not a predicate.
    #[error("Criterion kind '{kind}' is not supported: {expression}")]
    UnsupportedCriterionKind { kind: &'static str, expression: String },

    /// Malformed IR (non-boolean WHERE, missing projection, ...).
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// A textual method signature could not be parsed.
    #[error("Invalid method signature '{input}': {message}")]
    InvalidSignature { input: String, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuillError {
    /// Create an unmapped-item error.
    pub fn unmapped(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnmappedItem {
            kind,
            name: name.into(),
        }
    }

    /// Create a contract-violation error.
    pub fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation(message.into())
    }

    /// Create an unsupported-result-operator error.
    pub fn result_operator(operator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedResultOperator {
            operator: operator.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for quill operations.
pub type QuillResult<T> = Result<T, QuillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuillError::unmapped("type", "Chef");
        assert_eq!(err.to_string(), "No mapping found for type 'Chef'");
    }

    #[test]
    fn test_unsupported_method_names_call() {
        let err = QuillError::UnsupportedMethod {
            method: "String.PadLeft(Int32)".to_string(),
            call: "c.FirstName.PadLeft(3)".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("String.PadLeft(Int32)"));
        assert!(text.contains("c.FirstName.PadLeft(3)"));
    }
}
