//! The canonical Message envelope.
//!
//! This struct is the neutral representation every transport's Builder
//! converts bytes into, and every transport's Formatter converts back into
//! bytes. It carries no transport-specific behavior; see `esb_core` for the
//! mediator/sequence machinery that operates on it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Reserved property key: truthy value terminates the enclosing sequence
/// after the current mediator returns.
pub const STOP_FLOW: &str = "STOP_FLOW";
/// Reserved property key: retained reference to the message as it stood
/// immediately before a blocking Call mediator dispatched it.
pub const ORIGINAL_MESSAGE: &str = "ORIGINAL_MESSAGE";
/// Reserved property key: fallback endpoint used by Send/Call when no
/// other resolution succeeds.
pub const DEFAULT_ENDPOINT: &str = "DEFAULT_ENDPOINT";
pub const HTTP_STATUS_CODE: &str = "http.status.code";
pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_URI: &str = "http.uri";
pub const MAIL_SUBJECT: &str = "mail.subject";
pub const MAIL_FROM: &str = "mail.from";
pub const MAIL_ATTACHMENTS: &str = "mail.attachments";
pub const JMS_REPLY_TO: &str = "JMS_REPLY_TO";
pub const JMS_CORRELATION_ID: &str = "JMS_CORRELATION_ID";
pub const FIX_SESSION_ID: &str = "FIX_SESSION_ID";

/// Direction a message is flowing in its current leg of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Request,
    Response,
}

/// A property value. Tagged variants replace `instanceof`-style dispatch
/// on configured values.
///
/// `Any` is the escape hatch for values the data model cannot name directly
/// (e.g. an `Arc<dyn Endpoint>` stashed by a mediator under `endpointRef`) —
/// `esb_common` has no dependency on `esb_core`, so this is the only way an
/// opaque collaborator-owned object can travel through the property map.
#[derive(Clone)]
pub enum PropertyValue {
    Literal(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Int(i64),
    EndpointRef(String),
    MessageRef(Box<Message>),
    Any(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Literal(s) => write!(f, "Literal({s:?})"),
            PropertyValue::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            PropertyValue::Bool(b) => write!(f, "Bool({b})"),
            PropertyValue::Int(i) => write!(f, "Int({i})"),
            PropertyValue::EndpointRef(name) => write!(f, "EndpointRef({name:?})"),
            PropertyValue::MessageRef(m) => write!(f, "MessageRef(id={:?})", m.id),
            PropertyValue::Any(_) => write!(f, "Any(..)"),
        }
    }
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::Literal(s) => s.parse::<bool>().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Literal(s) => Some(s.as_str()),
            PropertyValue::EndpointRef(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            PropertyValue::Any(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Literal(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Literal(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

/// Order-preserving, case-insensitive string→string map used for
/// `Message::headers`.
///
/// Backed by `IndexMap` for insertion-order iteration. Lookups are
/// case-insensitive via a linear scan over keys; header counts per message
/// are small enough that this beats maintaining a second index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderMap {
    entries: IndexMap<String, String>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_key(&self, name: &str) -> Option<&String> {
        self.entries
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let key = self.find_key(name)?.clone();
        self.entries.get(&key).map(|s| s.as_str())
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        if let Some(existing_key) = self.find_key(name).cloned() {
            self.entries.insert(existing_key, value.into());
        } else {
            self.entries.insert(name.to_string(), value.into());
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let key = self.find_key(name)?.clone();
        self.entries.shift_remove(&key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find_key(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Error returned by operations that take a name/key and reject empty ones.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvalidArgument {
    #[error("name must not be empty")]
    EmptyName,
}

/// The mutable envelope that flows through a mediation sequence.
///
/// Invariant: `id` is always non-empty.
#[derive(Debug, Clone)]
pub struct Message {
    id: String,
    pub direction: Direction,
    pub content_type: Option<String>,
    pub payload: Vec<u8>,
    headers: HeaderMap,
    properties: std::collections::HashMap<String, PropertyValue>,
}

impl Message {
    /// Construct a new message with a freshly minted id.
    pub fn new(direction: Direction) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            direction,
            content_type: None,
            payload: Vec::new(),
            headers: HeaderMap::new(),
            properties: std::collections::HashMap::new(),
        }
    }

    /// Construct a message with an explicit id (e.g. one assigned by a
    /// transport Builder from protocol metadata).
    pub fn with_id(id: impl Into<String>, direction: Direction) -> Result<Self, InvalidArgument> {
        let id = id.into();
        if id.is_empty() {
            return Err(InvalidArgument::EmptyName);
        }
        let mut msg = Self::new(direction);
        msg.id = id;
        Ok(msg)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> Result<(), InvalidArgument> {
        if name.is_empty() {
            return Err(InvalidArgument::EmptyName);
        }
        self.headers.set(name, value);
        Ok(())
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), InvalidArgument> {
        if name.is_empty() {
            return Err(InvalidArgument::EmptyName);
        }
        self.properties.insert(name.to_string(), value);
        Ok(())
    }

    pub fn remove_property(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.remove(name)
    }

    pub fn properties(&self) -> &std::collections::HashMap<String, PropertyValue> {
        &self.properties
    }

    /// Set `STOP_FLOW=true`, terminating the enclosing sequence after the
    /// current mediator returns.
    pub fn set_stop_flow(&mut self, stop: bool) {
        self.properties
            .insert(STOP_FLOW.to_string(), PropertyValue::Bool(stop));
    }

    pub fn is_stop_flow(&self) -> bool {
        self.properties
            .get(STOP_FLOW)
            .and_then(PropertyValue::as_bool)
            .unwrap_or(false)
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }

    /// Deep copy: byte-exact payload, insertion-order-preserved headers,
    /// full property map. The id is preserved as-is.
    pub fn deep_clone(&self) -> Self {
        self.clone()
    }

    /// Release retained state. `esb_common::Message` holds no external
    /// resources itself; this exists so `esb_core::MessageContext::close`
    /// has a symmetric call to make on every message it owns.
    pub fn close(&mut self) {
        self.properties.clear();
        self.payload.clear();
    }
}
