use std::sync::Arc;

use async_trait::async_trait;
use esb_common::{EsbError, Message, PropertyValue};
use regex::Regex;
use tracing::debug;

use crate::error::Result;
use crate::mediator::Mediator;
use crate::sequence::{MediatorStep, TemplateAware};

/// Source value a `Filter`/`Switch` evaluates against.
#[derive(Debug, Clone)]
pub enum ValueSource {
    Header(String),
    Property(String),
}

impl ValueSource {
    fn resolve(&self, msg: &Message) -> Option<String> {
        match self {
            ValueSource::Header(name) => msg.header(name).map(|s| s.to_string()),
            ValueSource::Property(name) => {
                msg.property(name).and_then(PropertyValue::as_str).map(|s| s.to_string())
            }
        }
    }
}

/// How a `Filter` decides which branch to run.
pub enum Predicate {
    /// `source` matches `pattern` as a regex.
    Regex { source: ValueSource, pattern: Regex },
    /// `source` equals `value` exactly.
    Equals { source: ValueSource, value: String },
    /// Delegated to the Transform/XPath collaborator; out of scope for
    /// this crate, so this branch always evaluates to `false` (Open
    /// Question decision).
    XPath(String),
    /// An arbitrary user function, the escape hatch the reference design
    /// calls "user-supplied function".
    Custom(Arc<dyn Fn(&Message) -> bool + Send + Sync>),
}

impl Predicate {
    fn eval(&self, msg: &Message) -> bool {
        match self {
            Predicate::Regex { source, pattern } => source
                .resolve(msg)
                .map(|v| pattern.is_match(&v))
                .unwrap_or(false),
            Predicate::Equals { source, value } => {
                source.resolve(msg).map(|v| v == *value).unwrap_or(false)
            }
            Predicate::XPath(_) => false,
            Predicate::Custom(f) => f(msg),
        }
    }
}

/// Evaluates a predicate and runs either `then` or `else`. An absent
/// predicate is treated as false, so it runs `else`.
pub struct Filter {
    name: String,
    predicate: Option<Predicate>,
    then_branch: Vec<Arc<dyn MediatorStep>>,
    else_branch: Vec<Arc<dyn MediatorStep>>,
}

impl Filter {
    pub fn new(
        name: impl Into<String>,
        predicate: Option<Predicate>,
        then_branch: Vec<Arc<dyn MediatorStep>>,
        else_branch: Vec<Arc<dyn MediatorStep>>,
    ) -> Self {
        Self {
            name: name.into(),
            predicate,
            then_branch,
            else_branch,
        }
    }

    async fn run_branch(&self, branch: &[Arc<dyn MediatorStep>], mut msg: Message) -> Result<Message> {
        for step in branch {
            msg = step.mediate(msg).await?;
            if msg.is_stop_flow() {
                return Ok(msg);
            }
        }
        Ok(msg)
    }
}

#[async_trait]
impl Mediator for Filter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn mediate(&self, msg: Message) -> Result<Message> {
        let taken = self.predicate.as_ref().map(|p| p.eval(&msg)).unwrap_or(false);
        debug!(mediator = %self.name, taken, "filter evaluated");
        if taken {
            self.run_branch(&self.then_branch, msg).await
        } else {
            self.run_branch(&self.else_branch, msg).await
        }
    }
}

impl TemplateAware for Filter {
    fn instantiate(&self, params: &[String]) -> std::result::Result<Box<dyn MediatorStep>, EsbError> {
        let then_branch = self
            .then_branch
            .iter()
            .map(|s| s.instantiate(params).map(Arc::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let else_branch = self
            .else_branch
            .iter()
            .map(|s| s.instantiate(params).map(Arc::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        // Predicates are not themselves parameterized by $param.N in this
        // design; only child mediators are. Custom predicates can't be
        // cloned generically, so a template Filter with a Custom predicate
        // is reused as-is across instantiations.
        let predicate = match &self.predicate {
            None => None,
            Some(Predicate::Regex { source, pattern }) => Some(Predicate::Regex {
                source: source.clone(),
                pattern: pattern.clone(),
            }),
            Some(Predicate::Equals { source, value }) => Some(Predicate::Equals {
                source: source.clone(),
                value: value.clone(),
            }),
            Some(Predicate::XPath(x)) => Some(Predicate::XPath(x.clone())),
            Some(Predicate::Custom(f)) => Some(Predicate::Custom(f.clone())),
        };
        Ok(Box::new(Filter {
            name: self.name.clone(),
            predicate,
            then_branch,
            else_branch,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediator::test_support::Passthrough;
    use esb_common::Direction;

    #[tokio::test]
    async fn no_predicate_runs_else_branch() {
        let filter = Filter::new(
            "f",
            None,
            vec![Arc::new(Passthrough("then"))],
            vec![],
        );
        let msg = Message::new(Direction::Request);
        let out = filter.mediate(msg).await.unwrap();
        assert!(!out.is_stop_flow());
    }

    #[tokio::test]
    async fn equals_predicate_selects_then_branch() {
        let mut msg = Message::new(Direction::Request);
        msg.set_property("x", PropertyValue::Literal("red".into())).unwrap();
        let filter = Filter::new(
            "f",
            Some(Predicate::Equals {
                source: ValueSource::Property("x".into()),
                value: "red".into(),
            }),
            vec![Arc::new(set_stop())],
            vec![],
        );
        let out = filter.mediate(msg).await.unwrap();
        assert!(out.is_stop_flow());
    }

    #[test]
    fn xpath_predicate_always_false() {
        let msg = Message::new(Direction::Request);
        assert!(!Predicate::XPath("//a".into()).eval(&msg));
    }

    struct SetStop;
    #[async_trait]
    impl Mediator for SetStop {
        fn name(&self) -> &str {
            "set-stop"
        }
        async fn mediate(&self, mut msg: Message) -> Result<Message> {
            msg.set_stop_flow(true);
            Ok(msg)
        }
    }
    impl TemplateAware for SetStop {
        fn instantiate(&self, _params: &[String]) -> std::result::Result<Box<dyn MediatorStep>, EsbError> {
            Ok(Box::new(SetStop))
        }
    }
    fn set_stop() -> SetStop {
        SetStop
    }
}
