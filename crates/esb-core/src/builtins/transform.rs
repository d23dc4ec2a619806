use std::sync::Arc;

use async_trait::async_trait;
use esb_common::{EsbError, Message, PropertyValue};
use tracing::warn;

use crate::error::Result;
use crate::mediator::Mediator;
use crate::sequence::{MediatorStep, TemplateAware};

/// Where `Transform` delivers its output.
#[derive(Debug, Clone)]
pub enum TransformTarget {
    /// Replace the payload; content-type becomes `application/xml`.
    Payload,
    Property(String),
}

/// The XSLT-like collaborator this mediator delegates byte transforms to.
/// An external collaborator — the core only needs this trait.
pub trait XsltTransformer: Send + Sync {
    fn transform(&self, payload: &[u8]) -> std::result::Result<Vec<u8>, EsbError>;
}

/// Applies a byte-level transform to the payload when the content-type
/// indicates XML; otherwise passes the message through unchanged (with a
/// warning).
pub struct Transform {
    name: String,
    transformer: Option<Arc<dyn XsltTransformer>>,
    target: TransformTarget,
}

impl Transform {
    pub fn new(name: impl Into<String>, transformer: Option<Arc<dyn XsltTransformer>>, target: TransformTarget) -> Self {
        Self {
            name: name.into(),
            transformer,
            target,
        }
    }

    fn is_xml(msg: &Message) -> bool {
        msg.content_type
            .as_deref()
            .map(|ct| ct.contains("xml"))
            .unwrap_or(false)
    }
}

#[async_trait]
impl Mediator for Transform {
    fn name(&self) -> &str {
        &self.name
    }

    async fn mediate(&self, mut msg: Message) -> Result<Message> {
        if !Self::is_xml(&msg) {
            warn!(mediator = %self.name, "non-XML message passed through transform unchanged");
            return Ok(msg);
        }
        let Some(transformer) = &self.transformer else {
            warn!(mediator = %self.name, "no XSLT collaborator configured, passing through");
            return Ok(msg);
        };

        let transformed = transformer
            .transform(&msg.payload)
            .map_err(|e| crate::error::MediationError::new(self.name.clone(), e))?;

        match &self.target {
            TransformTarget::Payload => {
                msg.set_payload(transformed);
                msg.content_type = Some("application/xml".to_string());
            }
            TransformTarget::Property(name) => {
                msg.set_property(name, PropertyValue::Bytes(transformed))
                    .map_err(|e| crate::error::MediationError::new(self.name.clone(), e.into()))?;
            }
        }
        Ok(msg)
    }
}

impl TemplateAware for Transform {
    fn instantiate(&self, _params: &[String]) -> std::result::Result<Box<dyn MediatorStep>, EsbError> {
        Ok(Box::new(Transform {
            name: self.name.clone(),
            transformer: self.transformer.clone(),
            target: self.target.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esb_common::Direction;

    struct Uppercase;
    impl XsltTransformer for Uppercase {
        fn transform(&self, payload: &[u8]) -> std::result::Result<Vec<u8>, EsbError> {
            Ok(String::from_utf8_lossy(payload).to_uppercase().into_bytes())
        }
    }

    #[tokio::test]
    async fn non_xml_passes_through_unchanged() {
        let transform = Transform::new("t", Some(Arc::new(Uppercase)), TransformTarget::Payload);
        let mut msg = Message::new(Direction::Request);
        msg.content_type = Some("text/plain".to_string());
        msg.set_payload(b"hello".to_vec());
        let out = transform.mediate(msg).await.unwrap();
        assert_eq!(out.payload, b"hello");
    }

    #[tokio::test]
    async fn xml_message_is_transformed_into_payload() {
        let transform = Transform::new("t", Some(Arc::new(Uppercase)), TransformTarget::Payload);
        let mut msg = Message::new(Direction::Request);
        msg.content_type = Some("application/xml".to_string());
        msg.set_payload(b"hello".to_vec());
        let out = transform.mediate(msg).await.unwrap();
        assert_eq!(out.payload, b"HELLO");
        assert_eq!(out.content_type.as_deref(), Some("application/xml"));
    }

    #[tokio::test]
    async fn xml_message_can_be_stored_into_named_property() {
        let transform = Transform::new("t", Some(Arc::new(Uppercase)), TransformTarget::Property("xformed".into()));
        let mut msg = Message::new(Direction::Request);
        msg.content_type = Some("text/xml".to_string());
        msg.set_payload(b"hello".to_vec());
        let out = transform.mediate(msg).await.unwrap();
        assert_eq!(out.payload, b"hello");
        assert!(matches!(out.property("xformed"), Some(PropertyValue::Bytes(b)) if b == b"HELLO"));
    }
}
