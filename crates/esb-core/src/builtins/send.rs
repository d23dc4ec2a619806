use std::sync::Arc;

use async_trait::async_trait;
use esb_common::{EsbError, Message};

use crate::error::{MediationError, Result};
use crate::endpoint::Endpoint;
use crate::mediator::Mediator;
use crate::registry::Registry;
use crate::sequence::{MediatorStep, TemplateAware};

/// Terminal mediator: resolves an endpoint, sends the message, and marks
/// the response `STOP_FLOW=true` so no later mediator in the enclosing
/// sequence runs.
pub struct Send {
    name: String,
    direct: Option<Arc<Endpoint>>,
    endpoint_ref: Option<String>,
    registry: Arc<Registry>,
}

impl Send {
    pub fn new(name: impl Into<String>, direct: Option<Arc<Endpoint>>, endpoint_ref: Option<String>, registry: Arc<Registry>) -> Self {
        Self {
            name: name.into(),
            direct,
            endpoint_ref,
            registry,
        }
    }
}

#[async_trait]
impl Mediator for Send {
    fn name(&self) -> &str {
        &self.name
    }

    async fn mediate(&self, msg: Message) -> Result<Message> {
        let endpoint = super::resolve_endpoint(&self.registry, self.direct.as_ref(), self.endpoint_ref.as_deref(), &msg)
            .map_err(|e| MediationError::new(self.name.clone(), e))?;

        let mut reply = endpoint
            .send(msg)
            .await
            .map_err(|e| MediationError::new(self.name.clone(), e))?;
        reply.set_stop_flow(true);
        Ok(reply)
    }
}

impl TemplateAware for Send {
    fn instantiate(&self, _params: &[String]) -> std::result::Result<Box<dyn MediatorStep>, EsbError> {
        Ok(Box::new(Send {
            name: self.name.clone(),
            direct: self.direct.clone(),
            endpoint_ref: self.endpoint_ref.clone(),
            registry: self.registry.clone(),
        }))
    }
}
