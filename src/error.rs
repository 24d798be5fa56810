//! Engine Error Types

use std::io;
use thiserror::Error;

/// Errors produced while parsing, validating or evaluating a Datalog program
#[derive(Error, Debug)]
pub enum DatalogError {
    /// Syntax error in Datalog source text
    #[error("[line {line}] parse error: {message}")]
    Parse { line: usize, message: String },

    /// Fact rejected on insertion (not ground, or negated)
    #[error("invalid fact: {0}")]
    InvalidFact(String),

    /// Rule rejected by the safety validator
    #[error("unsafe rule: {0}")]
    UnsafeRule(String),

    /// Negative recursion detected during stratification
    #[error("program is not stratified - predicate {predicate} has a negative recursion: {route}")]
    NotStratified { predicate: String, route: String },

    /// A built-in was evaluated with operands the validator should have
    /// rejected. Reaching this variant is a defect, not a user error.
    #[error("internal invariant violation: {0}")]
    Internal(String),

    /// I/O error while consulting a file or persisting the EDB
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error from the storage backend
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for engine operations
pub type DatalogResult<T> = Result<T, DatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_includes_line() {
        let err = DatalogError::Parse {
            line: 3,
            message: "expected '.'".to_string(),
        };
        assert_eq!(err.to_string(), "[line 3] parse error: expected '.'");
    }

    #[test]
    fn stratification_error_includes_route() {
        let err = DatalogError::NotStratified {
            predicate: "p".to_string(),
            route: "p <- ~p".to_string(),
        };
        assert!(err.to_string().contains("negative recursion"));
        assert!(err.to_string().contains("p <- ~p"));
    }
}
