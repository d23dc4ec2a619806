//! Mediator trait and the registration-time tracing wrapper that replaces
//! the old `AbstractMediator` template method.

use async_trait::async_trait;
use esb_common::Message;
use tracing::{debug, field, Instrument};

use crate::error::Result;

/// A named, composable message-processing step.
///
/// `mediate` may return the input unchanged, mutate it, or construct a
/// fresh `Message`. Implementations should not panic; any internal failure
/// is expected to surface as `MediationError` via `crate::error`.
#[async_trait]
pub trait Mediator: Send + Sync {
    fn name(&self) -> &str;

    async fn mediate(&self, msg: Message) -> Result<Message>;
}

/// Wraps a mediator so every invocation is bracketed by a tracing span and
/// a duration histogram, without the mediator itself knowing about either.
///
/// This is the capability-composition replacement for cross-cutting
/// concerns that inheritance used to bolt onto `AbstractMediator`: the
/// `Sequence` applies this wrapper once, at registration time, rather than
/// every mediator re-implementing logging.
pub struct TracedMediator<M> {
    inner: M,
}

impl<M: Mediator> TracedMediator<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<M: Mediator> Mediator for TracedMediator<M> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn mediate(&self, msg: Message) -> Result<Message> {
        let span = tracing::debug_span!(
            "mediate",
            mediator = self.inner.name(),
            message_id = field::Empty,
        );
        span.record("message_id", field::display(msg.id()));

        async move {
            let started = std::time::Instant::now();
            debug!(mediator = self.inner.name(), "entering mediator");
            let result = self.inner.mediate(msg).await;
            crate::metrics::record_mediator_duration(self.inner.name(), started.elapsed());
            if let Err(ref e) = result {
                tracing::warn!(mediator = self.inner.name(), error = %e, "mediator failed");
            }
            result
        }
        .instrument(span)
        .await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Passthrough;
    use super::*;
    use esb_common::Direction;

    #[tokio::test]
    async fn traced_mediator_preserves_name_and_result() {
        let traced = TracedMediator::new(Passthrough("noop"));
        assert_eq!(traced.name(), "noop");
        let msg = Message::new(Direction::Request);
        let id = msg.id().to_string();
        let out = traced.mediate(msg).await.unwrap();
        assert_eq!(out.id(), id);
    }
}
