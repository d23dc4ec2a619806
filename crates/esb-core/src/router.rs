//! Routing & Dispatch: a `MessageCallback` that maps inbound messages to a
//! sequence name by pattern, then hands off to the engine.

use std::sync::Arc;

use async_trait::async_trait;
use esb_common::{EsbError, Message, PropertyValue};
use regex::Regex;
use tracing::warn;

use crate::engine::MediationEngine;
use crate::transport::MessageCallback;

/// Ordered `(regex, sequenceName)` rules. First match wins; an empty rule
/// set (or no match) falls back to `default_sequence`.
pub struct Router {
    rules: Vec<(Regex, String)>,
    default_sequence: String,
    engine: Arc<MediationEngine>,
}

impl Router {
    pub fn new(rules: Vec<(Regex, String)>, default_sequence: impl Into<String>, engine: Arc<MediationEngine>) -> Self {
        Self {
            rules,
            default_sequence: default_sequence.into(),
            engine,
        }
    }

    fn route_key(msg: &Message) -> Option<String> {
        msg.property(esb_common::HTTP_URI)
            .and_then(PropertyValue::as_str)
            .map(|s| s.to_string())
            .or_else(|| msg.header(esb_common::HTTP_URI).map(|s| s.to_string()))
    }

    /// The sequence name this message would be routed to, without running
    /// mediation. Exposed so the engine/tests can assert on routing
    /// decisions directly.
    pub fn resolve_sequence_name(&self, msg: &Message) -> String {
        let Some(key) = Self::route_key(msg) else {
            return self.default_sequence.clone();
        };
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(&key))
            .map(|(_, seq)| seq.clone())
            .unwrap_or_else(|| self.default_sequence.clone())
    }

    fn error_reply(msg: &Message, err: &EsbError) -> Message {
        let status = match err {
            EsbError::NotFound(_) => 404,
            EsbError::NotAvailable(_) => 503,
            _ => 500,
        };
        let mut reply = msg.deep_clone();
        let _ = reply.set_property(esb_common::HTTP_STATUS_CODE, PropertyValue::Int(status));
        reply.set_payload(err.to_string().into_bytes());
        reply
    }
}

#[async_trait]
impl MessageCallback for Router {
    async fn on_message(&self, msg: Message) -> Option<Message> {
        let sequence_name = self.resolve_sequence_name(&msg);
        match self.engine.mediate(msg.deep_clone(), &sequence_name).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(sequence = %sequence_name, error = %e, "mediation failed, producing error reply");
                Some(Self::error_reply(&msg, &e.source))
            }
        }
    }
}
