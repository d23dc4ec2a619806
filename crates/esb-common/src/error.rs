//! Error taxonomy shared by `esb-common` and `esb-core`.
//!
//! These are *kinds*, not a type hierarchy: every fallible core operation
//! returns one of these variants, optionally chained to an underlying cause.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EsbError {
    /// Malformed/incomplete configuration; raised at load time, never
    /// during mediation.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown sequence / endpoint / artifact reference.
    #[error("not found: {0}")]
    NotFound(String),

    /// Endpoint circuit open, or transport not started.
    #[error("not available: {0}")]
    NotAvailable(String),

    /// Protocol-level validation failure (e.g. missing required field).
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O failure at the wire layer.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid argument to a Message/Context operation (e.g. empty name).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl EsbError {
    pub fn config(msg: impl Into<String>) -> Self {
        EsbError::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        EsbError::NotFound(msg.into())
    }

    pub fn not_available(msg: impl Into<String>) -> Self {
        EsbError::NotAvailable(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        EsbError::Validation(msg.into())
    }

    pub fn transport(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        EsbError::Transport(Box::new(cause))
    }
}

impl From<crate::message::InvalidArgument> for EsbError {
    fn from(e: crate::message::InvalidArgument) -> Self {
        EsbError::InvalidArgument(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EsbError>;
