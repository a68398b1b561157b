//! Expression error types

use thiserror::Error;

/// Result type for expression operations
pub type ExprResult<T> = std::result::Result<T, ExprError>;

/// Errors that can occur during expression parsing or evaluation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    /// Expression parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Expression evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Name not known to the resolver
    #[error("Unknown name: {0}")]
    UnknownName(String),
}

impl From<propsheet_core::Error> for ExprError {
    fn from(err: propsheet_core::Error) -> Self {
        ExprError::Evaluation(err.to_string())
    }
}
