//! Sequence - an ordered list of mediators applied as a unit, plus
//! template instantiation ($param.N substitution).

use std::sync::Arc;

use esb_common::{EsbError, Message};

use crate::error::{MediationError, Result};
use crate::mediator::Mediator;

/// A configured value that may reference a positional template parameter.
/// Anything not of the form `$param.N` is a literal and is left untouched
/// by instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfiguredValue {
    Literal(String),
    ParamRef(usize),
}

impl ConfiguredValue {
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("$param.") {
            if let Ok(n) = rest.parse::<usize>() {
                if n >= 1 {
                    return ConfiguredValue::ParamRef(n);
                }
            }
        }
        ConfiguredValue::Literal(raw.to_string())
    }

    /// Resolve against a parameter list. `n` is 1-based; `n` past the end
    /// of `params` is a `ConfigError`, not a panic.
    pub fn resolve(&self, params: &[String]) -> std::result::Result<String, EsbError> {
        match self {
            ConfiguredValue::Literal(s) => Ok(s.clone()),
            ConfiguredValue::ParamRef(n) => params
                .get(n - 1)
                .cloned()
                .ok_or_else(|| EsbError::config(format!("template parameter ${{param.{n}}} out of range (have {} params)", params.len()))),
        }
    }
}

/// A child step of a `Sequence`. Mirrors `Mediator` but also exposes the
/// template parameter substitution needed during instantiation: built-ins
/// that carry `ConfiguredValue`s implement this so `Sequence::instantiate`
/// can walk them generically.
pub trait TemplateAware {
    /// Replace any `$param.N` reference with the corresponding positional
    /// parameter, producing an independent, instantiated copy.
    fn instantiate(&self, params: &[String]) -> std::result::Result<Box<dyn MediatorStep>, EsbError>;
}

/// The object stored in a `Sequence`'s step list: a `Mediator` that also
/// knows how to instantiate itself for template substitution. Built-in
/// mediators with no configured values implement `instantiate` as a no-op
/// clone; see `builtins` for concrete impls.
#[async_trait::async_trait]
pub trait MediatorStep: Mediator + TemplateAware {}
impl<T: Mediator + TemplateAware> MediatorStep for T {}

/// An ordered list of mediators, optionally a template.
pub struct Sequence {
    pub name: String,
    steps: Vec<Arc<dyn MediatorStep>>,
    is_template: bool,
    parameter_count: usize,
    pub on_error_sequence: Option<String>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, steps: Vec<Arc<dyn MediatorStep>>) -> Self {
        Self {
            name: name.into(),
            steps,
            is_template: false,
            parameter_count: 0,
            on_error_sequence: None,
        }
    }

    pub fn template(name: impl Into<String>, steps: Vec<Arc<dyn MediatorStep>>, parameter_count: usize) -> Self {
        Self {
            name: name.into(),
            steps,
            is_template: true,
            parameter_count,
            on_error_sequence: None,
        }
    }

    pub fn with_on_error(mut self, sequence_name: impl Into<String>) -> Self {
        self.on_error_sequence = Some(sequence_name.into());
        self
    }

    pub fn is_template(&self) -> bool {
        self.is_template
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in registered order; stop early if a step sets
    /// `STOP_FLOW=true` on its output.
    pub async fn apply(&self, msg: Message) -> Result<Message> {
        let mut cur = msg;
        for step in &self.steps {
            cur = step.mediate(cur).await.map_err(|e| {
                MediationError::new(step.name().to_string(), e.source)
            })?;
            if cur.is_stop_flow() {
                return Ok(cur);
            }
        }
        Ok(cur)
    }

    /// Produce a fresh, non-template sequence with every `$param.N` in the
    /// child mediators replaced by `parameters[N-1]`. Fails with
    /// `ConfigError` if any reference exceeds `parameters.len()`.
    ///
    /// Calling this twice with the same `(template, parameters)` pair
    /// produces structurally equal sequences: instantiation only reads
    /// `self.steps` and `parameters`, it mutates neither.
    pub fn instantiate(&self, parameters: &[String]) -> std::result::Result<Sequence, EsbError> {
        if !self.is_template {
            return Err(EsbError::config(format!(
                "sequence '{}' is not a template",
                self.name
            )));
        }
        if parameters.len() < self.parameter_count {
            return Err(EsbError::config(format!(
                "sequence '{}' requires {} parameters, got {}",
                self.name,
                self.parameter_count,
                parameters.len()
            )));
        }
        let instantiated = self
            .steps
            .iter()
            .map(|step| step.instantiate(parameters).map(Arc::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Sequence {
            name: self.name.clone(),
            steps: instantiated,
            is_template: false,
            parameter_count: 0,
            on_error_sequence: self.on_error_sequence.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediator::test_support::Passthrough;
    use esb_common::Direction;

    #[test]
    fn configured_value_parses_param_ref() {
        assert_eq!(ConfiguredValue::parse("$param.1"), ConfiguredValue::ParamRef(1));
        assert_eq!(
            ConfiguredValue::parse("literal text"),
            ConfiguredValue::Literal("literal text".to_string())
        );
    }

    #[test]
    fn configured_value_resolves_in_range() {
        let v = ConfiguredValue::ParamRef(1);
        assert_eq!(v.resolve(&["X".to_string()]).unwrap(), "X");
    }

    #[test]
    fn configured_value_out_of_range_is_config_error() {
        let v = ConfiguredValue::ParamRef(2);
        assert!(v.resolve(&["X".to_string()]).is_err());
    }

    #[tokio::test]
    async fn empty_sequence_returns_input_unchanged() {
        let seq = Sequence::new("empty", vec![]);
        let msg = Message::new(Direction::Request);
        let id = msg.id().to_string();
        let out = seq.apply(msg).await.unwrap();
        assert_eq!(out.id(), id);
    }

    #[tokio::test]
    async fn sequence_preserves_message_id() {
        let seq = Sequence::new(
            "s",
            vec![Arc::new(Passthrough("a")), Arc::new(Passthrough("b"))],
        );
        let msg = Message::new(Direction::Request);
        let id = msg.id().to_string();
        let out = seq.apply(msg).await.unwrap();
        assert_eq!(out.id(), id);
    }
}
