//! Endpoint - named outbound destination with circuit-breaker semantics.
//!
//! State is a `parking_lot::RwLock<CircuitState>` paired with an
//! `AtomicU32` failure counter: `Closed`/`Open`/`HalfOpen`, with the
//! half-open probe triggered lazily on an availability check rather than
//! by a background timer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use esb_common::{EsbError, Message, Result};
use parking_lot::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    fn label(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Protocol-specific send behavior an endpoint delegates to. Concrete
/// transport adapters (HTTP/JMS/FIX/etc.) implement this; it is the only
/// part of `Endpoint` that varies per protocol.
#[async_trait]
pub trait SendBehavior: Send + Sync {
    async fn do_send(&self, msg: Message) -> Result<Message>;
}

/// Availability + circuit-breaker state for one named endpoint.
///
/// `failure_count`, `last_failure_time`, and `available` are read/written
/// together under `state` so an observer never sees a torn combination.
struct CircuitBreaker {
    state: RwLock<CircuitState>,
    failure_count: AtomicU32,
    last_failure_time: RwLock<Option<Instant>>,
    max_failure_count: u32,
    retry_timeout: Duration,
}

impl CircuitBreaker {
    fn new(max_failure_count: u32, retry_timeout: Duration) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            last_failure_time: RwLock::new(None),
            max_failure_count,
            retry_timeout,
        }
    }

    /// `available=true` iff `failureCount < maxFailureCount` or the retry
    /// window has elapsed. Checking may itself flip `Open` to `HalfOpen`
    /// and reset `failure_count` to 0 — the half-open probe — this is the
    /// only place availability flips from false to true without an
    /// explicit `reset()`.
    fn is_available(&self, name: &str) -> bool {
        let state = *self.state.read();
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self
                    .last_failure_time
                    .read()
                    .map(|t| t.elapsed() >= self.retry_timeout)
                    .unwrap_or(false);
                if elapsed {
                    *self.state.write() = CircuitState::HalfOpen;
                    self.failure_count.store(0, Ordering::SeqCst);
                    crate::metrics::record_circuit_transition(name, "open", "half_open");
                    crate::metrics::set_circuit_state(name, CircuitState::HalfOpen);
                    info!(endpoint = name, "circuit breaker half-open probe");
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self, name: &str) {
        let state = *self.state.read();
        self.failure_count.store(0, Ordering::SeqCst);
        if state == CircuitState::HalfOpen {
            *self.state.write() = CircuitState::Closed;
            crate::metrics::record_circuit_transition(name, "half_open", "closed");
            crate::metrics::set_circuit_state(name, CircuitState::Closed);
            info!(endpoint = name, "circuit breaker closed after successful probe");
        }
    }

    fn record_failure(&self, name: &str) {
        let state = *self.state.read();
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_failure_time.write() = Some(Instant::now());

        if state == CircuitState::HalfOpen {
            *self.state.write() = CircuitState::Open;
            crate::metrics::record_circuit_transition(name, "half_open", "open");
            crate::metrics::set_circuit_state(name, CircuitState::Open);
            warn!(endpoint = name, "circuit breaker re-opened on failed probe");
        } else if count >= self.max_failure_count {
            *self.state.write() = CircuitState::Open;
            crate::metrics::record_circuit_transition(name, "closed", "open");
            crate::metrics::set_circuit_state(name, CircuitState::Open);
            warn!(endpoint = name, failure_count = count, "circuit breaker opened");
        }
    }

    fn reset(&self, name: &str) {
        self.failure_count.store(0, Ordering::SeqCst);
        *self.last_failure_time.write() = None;
        *self.state.write() = CircuitState::Closed;
        crate::metrics::set_circuit_state(name, CircuitState::Closed);
        info!(endpoint = name, "circuit breaker reset");
    }

    fn state(&self) -> CircuitState {
        *self.state.read()
    }

    fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }
}

/// A named outbound destination. `send` applies the availability check,
/// delegates to `SendBehavior::do_send`, and records the success/failure
/// transition — implementations never need to touch the breaker directly.
pub struct Endpoint {
    pub name: String,
    pub url: String,
    behavior: Box<dyn SendBehavior>,
    breaker: CircuitBreaker,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>, behavior: Box<dyn SendBehavior>) -> Self {
        Self::with_limits(name, url, behavior, 3, Duration::from_millis(30_000))
    }

    pub fn with_limits(
        name: impl Into<String>,
        url: impl Into<String>,
        behavior: Box<dyn SendBehavior>,
        max_failure_count: u32,
        retry_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            behavior,
            breaker: CircuitBreaker::new(max_failure_count, retry_timeout),
        }
    }

    pub fn is_available(&self) -> bool {
        self.breaker.is_available(&self.name)
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn failure_count(&self) -> u32 {
        self.breaker.failure_count()
    }

    pub fn reset(&self) {
        self.breaker.reset(&self.name);
    }

    pub async fn send(&self, msg: Message) -> Result<Message> {
        if !self.is_available() {
            return Err(EsbError::not_available(format!("endpoint '{}' circuit open", self.name)));
        }
        match self.behavior.do_send(msg).await {
            Ok(reply) => {
                self.breaker.record_success(&self.name);
                Ok(reply)
            }
            Err(e) => {
                self.breaker.record_failure(&self.name);
                Err(e)
            }
        }
    }
}
