use thiserror::Error; // Import the `Error` derive macro from the `thiserror` crate

use crate::parser::ParseError;

// Errors raised while preparing or evaluating conditions.
//
// Only `Helper` and `Config` ever leave the crate: clause-level failures
// (`Parse`, `UnresolvedField`) are swallowed by the evaluator and just mean
// "condition not satisfied".
#[derive(Debug, Error)]
pub enum EvalError {
    // The substituted condition text is not a valid expression
    #[error("parse error: {0}")]
    Parse(String),

    // A `{field}` placeholder survived substitution (no matching control)
    #[error("unresolved field: {0}")]
    UnresolvedField(String),

    // A caller-supplied helper carries a pattern that does not compile
    #[error("invalid helper `{name}`: {source}")]
    Helper {
        name: String,
        #[source]
        source: regex::Error,
    },

    // Settings or document JSON could not be decoded
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl From<ParseError> for EvalError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidSyntax(msg) => EvalError::Parse(msg),
        }
    }
}

// Type alias for results that use `EvalError` as the error type
pub type Result<T> = std::result::Result<T, EvalError>;
