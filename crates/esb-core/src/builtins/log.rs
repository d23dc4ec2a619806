use async_trait::async_trait;
use esb_common::{EsbError, Message};
use tracing::{debug, error, info, trace, warn};

use crate::error::Result;
use crate::mediator::Mediator;
use crate::sequence::{MediatorStep, TemplateAware};

/// Level a `Log` mediator emits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Debug,
    Warn,
    Error,
    Trace,
}

/// How much of the message the log record includes.
#[derive(Debug, Clone)]
pub enum LogLevel {
    /// id + direction only.
    Simple,
    /// + headers.
    Headers,
    /// + properties + stringified payload.
    Full,
    /// + a named list of properties.
    Custom(Vec<String>),
}

/// Formats and emits a log record. Never mutates the message.
pub struct Log {
    name: String,
    severity: Severity,
    level: LogLevel,
}

impl Log {
    pub fn new(name: impl Into<String>, severity: Severity, level: LogLevel) -> Self {
        Self {
            name: name.into(),
            severity,
            level,
        }
    }

    fn render(&self, msg: &Message) -> String {
        let mut out = format!("id={} direction={:?}", msg.id(), msg.direction);
        match &self.level {
            LogLevel::Simple => {}
            LogLevel::Headers => {
                for (k, v) in msg.headers().iter() {
                    out.push_str(&format!(" {k}={v}"));
                }
            }
            LogLevel::Full => {
                for (k, v) in msg.headers().iter() {
                    out.push_str(&format!(" {k}={v}"));
                }
                for (k, v) in msg.properties() {
                    out.push_str(&format!(" prop.{k}={v:?}"));
                }
                out.push_str(&format!(" payload={}", String::from_utf8_lossy(&msg.payload)));
            }
            LogLevel::Custom(names) => {
                for name in names {
                    if let Some(v) = msg.property(name) {
                        out.push_str(&format!(" prop.{name}={v:?}"));
                    }
                }
            }
        }
        out
    }
}

#[async_trait]
impl Mediator for Log {
    fn name(&self) -> &str {
        &self.name
    }

    async fn mediate(&self, msg: Message) -> Result<Message> {
        let rendered = self.render(&msg);
        match self.severity {
            Severity::Info => info!(mediator = %self.name, "{rendered}"),
            Severity::Debug => debug!(mediator = %self.name, "{rendered}"),
            Severity::Warn => warn!(mediator = %self.name, "{rendered}"),
            Severity::Error => error!(mediator = %self.name, "{rendered}"),
            Severity::Trace => trace!(mediator = %self.name, "{rendered}"),
        }
        Ok(msg)
    }
}

impl TemplateAware for Log {
    fn instantiate(&self, _params: &[String]) -> std::result::Result<Box<dyn MediatorStep>, EsbError> {
        Ok(Box::new(Log::new(self.name.clone(), self.severity, self.level.clone())))
    }
}
