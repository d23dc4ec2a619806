use std::sync::Arc;

use async_trait::async_trait;
use esb_common::{EsbError, Message};
use regex::Regex;
use tracing::debug;

use crate::error::Result;
use crate::mediator::Mediator;
use crate::sequence::{MediatorStep, TemplateAware};

use super::filter::ValueSource;

/// How one `Case` decides whether it matches the resolved source value.
pub enum CaseMatcher {
    Literal(String),
    Regex(Regex),
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl CaseMatcher {
    fn matches(&self, value: &str) -> bool {
        match self {
            CaseMatcher::Literal(lit) => lit == value,
            CaseMatcher::Regex(re) => re.is_match(value),
            CaseMatcher::Custom(f) => f(value),
        }
    }

    fn clone_shallow(&self) -> CaseMatcher {
        match self {
            CaseMatcher::Literal(s) => CaseMatcher::Literal(s.clone()),
            CaseMatcher::Regex(re) => CaseMatcher::Regex(re.clone()),
            CaseMatcher::Custom(f) => CaseMatcher::Custom(f.clone()),
        }
    }
}

/// One `Switch` branch: a matcher tried in order, first match wins.
pub struct Case {
    pub matcher: CaseMatcher,
    pub steps: Vec<Arc<dyn MediatorStep>>,
}

/// Resolves a source value, linearly scans `cases`; the first whose
/// matcher returns true wins. Case ordering is significant. No match runs
/// `default`.
pub struct Switch {
    name: String,
    source: ValueSource,
    cases: Vec<Case>,
    default: Vec<Arc<dyn MediatorStep>>,
}

impl Switch {
    pub fn new(
        name: impl Into<String>,
        source: ValueSource,
        cases: Vec<Case>,
        default: Vec<Arc<dyn MediatorStep>>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            cases,
            default,
        }
    }
}

#[async_trait]
impl Mediator for Switch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn mediate(&self, mut msg: Message) -> Result<Message> {
        let value = self.source.resolve(&msg).unwrap_or_default();
        let branch = self
            .cases
            .iter()
            .find(|case| case.matcher.matches(&value))
            .map(|case| case.steps.as_slice())
            .unwrap_or_else(|| {
                debug!(mediator = %self.name, value, "no case matched, running default");
                self.default.as_slice()
            });

        for step in branch {
            msg = step.mediate(msg).await?;
            if msg.is_stop_flow() {
                return Ok(msg);
            }
        }
        Ok(msg)
    }
}

impl TemplateAware for Switch {
    fn instantiate(&self, params: &[String]) -> std::result::Result<Box<dyn MediatorStep>, EsbError> {
        let cases = self
            .cases
            .iter()
            .map(|case| -> std::result::Result<Case, EsbError> {
                let steps = case
                    .steps
                    .iter()
                    .map(|s| s.instantiate(params).map(Arc::from))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(Case {
                    matcher: case.matcher.clone_shallow(),
                    steps,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let default = self
            .default
            .iter()
            .map(|s| s.instantiate(params).map(Arc::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Box::new(Switch {
            name: self.name.clone(),
            source: self.source.clone(),
            cases,
            default,
        }))
    }
}
