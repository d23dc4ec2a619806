use async_trait::async_trait;
use esb_common::{EsbError, Message, PropertyValue};
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::mediator::Mediator;
use crate::sequence::{ConfiguredValue, MediatorStep, TemplateAware};

/// Where a `Property` mediator writes or deletes: message properties, or
/// transport headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyScope {
    Default,
    Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyOp {
    Set,
    Remove,
}

/// Where a SET value comes from.
#[derive(Debug, Clone)]
pub enum PropertySource {
    Literal(ConfiguredValue),
    Header(String),
    Property(String),
    /// Delegated to the Transform/XPath collaborator, which this crate
    /// never implements itself — always resolves to `None`.
    XPath(String),
}

/// SET writes `name -> value` into properties or headers; REMOVE deletes
/// the key outright (Open Question decision: delete, not null-write).
pub struct Property {
    name: String,
    op: PropertyOp,
    scope: PropertyScope,
    key: ConfiguredValue,
    source: Option<PropertySource>,
}

impl Property {
    pub fn set(
        name: impl Into<String>,
        scope: PropertyScope,
        key: impl Into<String>,
        source: PropertySource,
    ) -> Self {
        Self {
            name: name.into(),
            op: PropertyOp::Set,
            scope,
            key: ConfiguredValue::parse(&key.into()),
            source: Some(source),
        }
    }

    pub fn remove(name: impl Into<String>, scope: PropertyScope, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: PropertyOp::Remove,
            scope,
            key: ConfiguredValue::parse(&key.into()),
            source: None,
        }
    }

    /// Keys and literal sources are expected to already be instantiated by
    /// the time a sequence runs; an un-instantiated `$param.N` left in
    /// place simply resolves to nothing.
    fn resolve_key(&self) -> Option<String> {
        self.key.resolve(&[]).ok()
    }

    fn resolve_source(&self, msg: &Message) -> Option<String> {
        match self.source.as_ref()? {
            PropertySource::Literal(v) => v.resolve(&[]).ok(),
            PropertySource::Header(name) => msg.header(name).map(|s| s.to_string()),
            PropertySource::Property(name) => {
                msg.property(name).and_then(PropertyValue::as_str).map(|s| s.to_string())
            }
            PropertySource::XPath(expr) => {
                warn!(expr, "XPath source has no configured collaborator, skipping");
                None
            }
        }
    }
}

#[async_trait]
impl Mediator for Property {
    fn name(&self) -> &str {
        &self.name
    }

    async fn mediate(&self, mut msg: Message) -> Result<Message> {
        debug!(mediator = %self.name, op = ?self.op, scope = ?self.scope, "property mediator");
        let Some(key) = self.resolve_key() else {
            trace!(mediator = %self.name, "key did not resolve, skipping");
            return Ok(msg);
        };

        match self.op {
            PropertyOp::Set => {
                let Some(value) = self.resolve_source(&msg) else {
                    trace!(mediator = %self.name, "source resolved to nothing, skipping set");
                    return Ok(msg);
                };
                match self.scope {
                    PropertyScope::Default => msg
                        .set_property(&key, PropertyValue::Literal(value))
                        .map_err(|e| crate::error::MediationError::new(self.name.clone(), e.into()))?,
                    PropertyScope::Transport => msg
                        .set_header(&key, value)
                        .map_err(|e| crate::error::MediationError::new(self.name.clone(), e.into()))?,
                }
            }
            PropertyOp::Remove => match self.scope {
                PropertyScope::Default => {
                    msg.remove_property(&key);
                }
                PropertyScope::Transport => {
                    msg.remove_header(&key);
                }
            },
        }
        Ok(msg)
    }
}

impl TemplateAware for Property {
    fn instantiate(&self, params: &[String]) -> std::result::Result<Box<dyn MediatorStep>, EsbError> {
        let key = ConfiguredValue::Literal(self.key.resolve(params)?);
        let source = match &self.source {
            None => None,
            Some(PropertySource::Literal(v)) => Some(PropertySource::Literal(ConfiguredValue::Literal(v.resolve(params)?))),
            Some(PropertySource::Header(h)) => Some(PropertySource::Header(h.clone())),
            Some(PropertySource::Property(p)) => Some(PropertySource::Property(p.clone())),
            Some(PropertySource::XPath(x)) => Some(PropertySource::XPath(x.clone())),
        };
        Ok(Box::new(Property {
            name: self.name.clone(),
            op: self.op,
            scope: self.scope,
            key,
            source,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esb_common::Direction;

    #[tokio::test]
    async fn set_writes_literal_into_default_scope() {
        let prop = Property::set(
            "p",
            PropertyScope::Default,
            "result",
            PropertySource::Literal(ConfiguredValue::Literal("R".into())),
        );
        let msg = Message::new(Direction::Request);
        let out = prop.mediate(msg).await.unwrap();
        assert_eq!(out.property("result").and_then(PropertyValue::as_str), Some("R"));
    }

    #[tokio::test]
    async fn remove_deletes_key_entirely() {
        let mut msg = Message::new(Direction::Request);
        msg.set_property("x", PropertyValue::Literal("1".into())).unwrap();
        let prop = Property::remove("p", PropertyScope::Default, "x");
        let out = prop.mediate(msg).await.unwrap();
        assert!(out.property("x").is_none());
    }

    #[tokio::test]
    async fn set_from_header_source() {
        let mut msg = Message::new(Direction::Request);
        msg.set_header("X-In", "abc").unwrap();
        let prop = Property::set("p", PropertyScope::Default, "out", PropertySource::Header("X-In".into()));
        let out = prop.mediate(msg).await.unwrap();
        assert_eq!(out.property("out").and_then(PropertyValue::as_str), Some("abc"));
    }

    #[tokio::test]
    async fn template_substitutes_param_in_value() {
        let prop = Property::set(
            "p",
            PropertyScope::Default,
            "out",
            PropertySource::Literal(ConfiguredValue::ParamRef(1)),
        );
        let instantiated = prop.instantiate(&["X".to_string()]).unwrap();
        let msg = Message::new(Direction::Request);
        let out = instantiated.mediate(msg).await.unwrap();
        assert_eq!(out.property("out").and_then(PropertyValue::as_str), Some("X"));
    }
}
