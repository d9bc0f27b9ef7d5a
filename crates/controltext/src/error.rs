use controlplane::{AdaptorError, SchemaError};
use thiserror::Error;

/// Failure of one text protocol line. The session reports it and continues.
#[derive(Debug, Error)]
pub enum TextError {
    #[error("Bad command: {0}")]
    BadCommand(String),

    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    #[error("string parse error: {0}")]
    Unescape(String),

    #[error("bad address pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Adaptor(#[from] AdaptorError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
