//! Built-in mediators.

mod call;
mod filter;
mod log;
mod property;
mod send;
mod sequence_ref;
mod switch;
mod transform;

pub use call::Call;
pub use filter::{Filter, Predicate, ValueSource};
pub use log::{Log, LogLevel, Severity};
pub use property::{Property, PropertyOp, PropertyScope, PropertySource};
pub use send::Send;
pub use sequence_ref::SequenceRef;
pub use switch::{Case, CaseMatcher, Switch};
pub use transform::{Transform, TransformTarget, XsltTransformer};

use esb_common::{EsbError, Message, PropertyValue};

use crate::registry::Registry;
use std::sync::Arc;

/// Shared endpoint resolution for Send/Call: direct reference, named
/// registry lookup, message property holding an Endpoint, then the
/// `DEFAULT_ENDPOINT` property. Fails `NotFound` if none resolve.
pub(crate) fn resolve_endpoint(
    registry: &Registry,
    direct: Option<&Arc<crate::endpoint::Endpoint>>,
    endpoint_ref: Option<&str>,
    msg: &Message,
) -> Result<Arc<crate::endpoint::Endpoint>, EsbError> {
    if let Some(ep) = direct {
        return Ok(ep.clone());
    }
    if let Some(name) = endpoint_ref {
        if let Some(ep) = registry.get_endpoint(name) {
            return Ok(ep);
        }
        if let Some(PropertyValue::Any(any)) = msg.property(name) {
            if let Some(ep) = any.downcast_ref::<Arc<crate::endpoint::Endpoint>>() {
                return Ok(ep.clone());
            }
        }
    }
    if let Some(PropertyValue::Any(any)) = msg.property(esb_common::DEFAULT_ENDPOINT) {
        if let Some(ep) = any.downcast_ref::<Arc<crate::endpoint::Endpoint>>() {
            return Ok(ep.clone());
        }
    }
    Err(EsbError::not_found(format!(
        "no endpoint resolved (endpointRef={:?})",
        endpoint_ref
    )))
}
