//! Mediation-level error wrapping.
//!
//! `MediationError` is what a mediator's failure looks like once it
//! surfaces through a `Sequence`: the underlying `EsbError` kind plus the
//! name of the mediator that raised it.

use esb_common::EsbError;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("mediator '{mediator}' failed: {source}")]
pub struct MediationError {
    pub mediator: String,
    #[source]
    pub source: EsbError,
}

impl MediationError {
    pub fn new(mediator: impl Into<String>, source: EsbError) -> Self {
        Self {
            mediator: mediator.into(),
            source,
        }
    }

    /// Wrap an arbitrary error as `EsbError::Config(INTERNAL)`-equivalent —
    /// the base behavior every built-in mediator falls back to when a
    /// collaborator (Builder/Formatter/XPath engine) panics or errors in a
    /// way that doesn't map to one of the named kinds.
    pub fn internal(mediator: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::new(mediator, EsbError::Validation(format!("internal: {detail}")))
    }
}

pub type Result<T> = std::result::Result<T, MediationError>;
