use std::sync::Arc;

use async_trait::async_trait;
use esb_common::{EsbError, Message};

use crate::error::{MediationError, Result};
use crate::mediator::Mediator;
use crate::registry::Registry;
use crate::sequence::{MediatorStep, Sequence, TemplateAware};

/// Resolves a sequence by name (or holds a direct reference) and applies
/// it. If the target is a template and `parameters` is non-empty, it is
/// instantiated first.
pub struct SequenceRef {
    name: String,
    target_name: Option<String>,
    direct: Option<Arc<Sequence>>,
    parameters: Vec<String>,
    registry: Arc<Registry>,
}

impl SequenceRef {
    pub fn by_name(name: impl Into<String>, target_name: impl Into<String>, parameters: Vec<String>, registry: Arc<Registry>) -> Self {
        Self {
            name: name.into(),
            target_name: Some(target_name.into()),
            direct: None,
            parameters,
            registry,
        }
    }

    pub fn direct(name: impl Into<String>, target: Arc<Sequence>, parameters: Vec<String>, registry: Arc<Registry>) -> Self {
        Self {
            name: name.into(),
            target_name: None,
            direct: Some(target),
            parameters,
            registry,
        }
    }

    fn resolve(&self) -> std::result::Result<Arc<Sequence>, EsbError> {
        if let Some(seq) = &self.direct {
            return Ok(seq.clone());
        }
        let target_name = self.target_name.as_deref().expect("either direct or target_name is set");
        self.registry
            .get_sequence(target_name)
            .ok_or_else(|| EsbError::not_found(format!("sequence '{target_name}' not found")))
    }
}

#[async_trait]
impl Mediator for SequenceRef {
    fn name(&self) -> &str {
        &self.name
    }

    async fn mediate(&self, msg: Message) -> Result<Message> {
        let target = self
            .resolve()
            .map_err(|e| MediationError::new(self.name.clone(), e))?;

        let resolved = if target.is_template() && !self.parameters.is_empty() {
            Arc::new(
                target
                    .instantiate(&self.parameters)
                    .map_err(|e| MediationError::new(self.name.clone(), e))?,
            )
        } else {
            target
        };

        resolved.apply(msg).await
    }
}

impl TemplateAware for SequenceRef {
    fn instantiate(&self, params: &[String]) -> std::result::Result<Box<dyn MediatorStep>, EsbError> {
        let parameters = self
            .parameters
            .iter()
            .map(|p| crate::sequence::ConfiguredValue::parse(p).resolve(params))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Box::new(SequenceRef {
            name: self.name.clone(),
            target_name: self.target_name.clone(),
            direct: self.direct.clone(),
            parameters,
            registry: self.registry.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esb_common::Direction;

    #[tokio::test]
    async fn missing_reference_is_not_found() {
        let registry = Arc::new(Registry::new());
        let seq_ref = SequenceRef::by_name("ref", "missing", vec![], registry);
        let msg = Message::new(Direction::Request);
        let err = seq_ref.mediate(msg).await.unwrap_err();
        assert!(matches!(err.source, EsbError::NotFound(_)));
    }

    #[tokio::test]
    async fn template_target_is_instantiated_with_parameters() {
        use crate::builtins::{Property, PropertyScope, PropertySource};
        use crate::sequence::ConfiguredValue;

        let registry = Arc::new(Registry::new());
        let template = Sequence::template(
            "t",
            vec![Arc::new(Property::set(
                "set",
                PropertyScope::Default,
                "out",
                PropertySource::Literal(ConfiguredValue::ParamRef(1)),
            ))],
            1,
        );
        registry.put_sequence(template);

        let seq_ref = SequenceRef::by_name("ref", "t", vec!["X".to_string()], registry);
        let msg = Message::new(Direction::Request);
        let out = seq_ref.mediate(msg).await.unwrap();
        assert_eq!(
            out.property("out").and_then(esb_common::PropertyValue::as_str),
            Some("X")
        );
    }
}
