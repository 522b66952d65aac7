//! Error types for expression parsing and evaluation.

/// Errors raised while compiling or evaluating a query expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    /// The expression text is not valid.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("function {name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// An operand had a type the operation cannot handle.
    #[error("type error: {0}")]
    Type(String),

    /// A forced match index did not exist in a multi-match result.
    #[error("match index {index} out of range for {len} matches")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
