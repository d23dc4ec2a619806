use std::sync::Arc;

use async_trait::async_trait;
use esb_common::{EsbError, Message, PropertyValue};
use tracing::warn;

use crate::endpoint::Endpoint;
use crate::error::{MediationError, Result};
use crate::mediator::Mediator;
use crate::registry::Registry;
use crate::sequence::{MediatorStep, TemplateAware};

/// Non-terminal send. Blocking mode returns the endpoint's response (after
/// stamping `ORIGINAL_MESSAGE`); non-blocking mode dispatches and returns
/// the original message unchanged. Neither mode sets `STOP_FLOW`.
pub struct Call {
    name: String,
    direct: Option<Arc<Endpoint>>,
    endpoint_ref: Option<String>,
    registry: Arc<Registry>,
    blocking: bool,
}

impl Call {
    pub fn blocking(name: impl Into<String>, direct: Option<Arc<Endpoint>>, endpoint_ref: Option<String>, registry: Arc<Registry>) -> Self {
        Self {
            name: name.into(),
            direct,
            endpoint_ref,
            registry,
            blocking: true,
        }
    }

    pub fn non_blocking(name: impl Into<String>, direct: Option<Arc<Endpoint>>, endpoint_ref: Option<String>, registry: Arc<Registry>) -> Self {
        Self {
            name: name.into(),
            direct,
            endpoint_ref,
            registry,
            blocking: false,
        }
    }
}

#[async_trait]
impl Mediator for Call {
    fn name(&self) -> &str {
        &self.name
    }

    async fn mediate(&self, msg: Message) -> Result<Message> {
        let endpoint = super::resolve_endpoint(&self.registry, self.direct.as_ref(), self.endpoint_ref.as_deref(), &msg)
            .map_err(|e| MediationError::new(self.name.clone(), e))?;

        if !self.blocking {
            let dispatched = msg.deep_clone();
            let endpoint = endpoint.clone();
            let mediator_name = self.name.clone();
            tokio::spawn(async move {
                if let Err(e) = endpoint.send(dispatched).await {
                    warn!(mediator = %mediator_name, error = %e, "non-blocking call failed");
                }
            });
            return Ok(msg);
        }

        let original = msg.deep_clone();
        let mut reply = endpoint
            .send(msg)
            .await
            .map_err(|e| MediationError::new(self.name.clone(), e))?;
        reply
            .set_property(esb_common::ORIGINAL_MESSAGE, PropertyValue::MessageRef(Box::new(original)))
            .map_err(|e| MediationError::new(self.name.clone(), e.into()))?;
        Ok(reply)
    }
}

impl TemplateAware for Call {
    fn instantiate(&self, _params: &[String]) -> std::result::Result<Box<dyn MediatorStep>, EsbError> {
        Ok(Box::new(Call {
            name: self.name.clone(),
            direct: self.direct.clone(),
            endpoint_ref: self.endpoint_ref.clone(),
            registry: self.registry.clone(),
            blocking: self.blocking,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::SendBehavior;
    use esb_common::Direction;

    struct Echo;
    #[async_trait]
    impl SendBehavior for Echo {
        async fn do_send(&self, msg: Message) -> esb_common::Result<Message> {
            Ok(msg)
        }
    }

    #[tokio::test]
    async fn blocking_call_does_not_set_stop_flow_and_records_original() {
        let registry = Arc::new(Registry::new());
        registry.put_endpoint("e", Endpoint::new("e", "http://x", Box::new(Echo)));
        let call = Call::blocking("call", None, Some("e".to_string()), registry);
        let msg = Message::new(Direction::Request);
        let out = call.mediate(msg).await.unwrap();
        assert!(!out.is_stop_flow());
        assert!(matches!(out.property(esb_common::ORIGINAL_MESSAGE), Some(PropertyValue::MessageRef(_))));
    }

    #[tokio::test]
    async fn non_blocking_call_returns_original_message_unchanged() {
        let registry = Arc::new(Registry::new());
        registry.put_endpoint("e", Endpoint::new("e", "http://x", Box::new(Echo)));
        let call = Call::non_blocking("call", None, Some("e".to_string()), registry);
        let msg = Message::new(Direction::Request);
        let id = msg.id().to_string();
        let out = call.mediate(msg).await.unwrap();
        assert_eq!(out.id(), id);
        assert!(out.property(esb_common::ORIGINAL_MESSAGE).is_none());
    }
}
