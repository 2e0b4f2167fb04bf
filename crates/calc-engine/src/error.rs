//! Engine error types

use calc_engine_core::ValueKind;
use thiserror::Error;

/// Result type for engine operations
pub type CalcResult<T> = std::result::Result<T, CalcError>;

/// Errors that can occur while parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    /// Malformed token stream, unbalanced grouping or trailing input
    #[error("Syntax error: {message} (at {context})")]
    Syntax { message: String, context: String },

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Binding path could not be resolved
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Typed evaluation could not convert the result
    #[error("Cannot convert {kind} value '{value}' to {target}")]
    Cast {
        value: String,
        kind: ValueKind,
        target: &'static str,
    },

    /// Formula evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Variable read that is not declared
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// Evaluation was cancelled through its token
    #[error("Evaluation cancelled")]
    Cancelled,
}

impl CalcError {
    pub(crate) fn syntax(message: impl Into<String>, context: impl Into<String>) -> Self {
        CalcError::Syntax {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Binding failure behind this error, if any
    pub fn as_binding(&self) -> Option<&BindingError> {
        match self {
            CalcError::Binding(e) => Some(e),
            _ => None,
        }
    }
}

impl From<calc_engine_core::Error> for CalcError {
    fn from(e: calc_engine_core::Error) -> Self {
        CalcError::Argument(e.to_string())
    }
}

/// What went wrong while walking a binding path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingErrorKind {
    /// An intermediate value in the path is absent
    NullValue,
    /// The member does not exist on the object's type
    UnknownMember,
    /// Associative container lacks the requested key
    MissingKey,
    /// Positional index outside the sequence
    IndexOutOfRange,
    /// The expression needs a data context but none is set
    NoDataContext,
}

/// Failure resolving a binding path against the data context
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Binding error: {message}")]
pub struct BindingError {
    pub kind: BindingErrorKind,
    /// Full path as written, e.g. `a.b(1).c`
    pub path: String,
    /// Step that failed
    pub segment: String,
    pub message: String,
}

impl BindingError {
    pub fn new(
        kind: BindingErrorKind,
        path: impl Into<String>,
        segment: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            segment: segment.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CalcError::syntax("Unexpected token", "1+[)]");
        assert_eq!(err.to_string(), "Syntax error: Unexpected token (at 1+[)])");

        let err = CalcError::from(BindingError::new(
            BindingErrorKind::UnknownMember,
            "a.b",
            "b",
            "'b' is not a valid property of Person in path 'a.b'",
        ));
        assert_eq!(
            err.to_string(),
            "Binding error: 'b' is not a valid property of Person in path 'a.b'"
        );
        assert_eq!(err.as_binding().map(|e| e.kind), Some(BindingErrorKind::UnknownMember));
    }
}
