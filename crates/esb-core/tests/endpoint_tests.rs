//! Endpoint / circuit-breaker integration tests.
//!
//! Covers the closed/open/half-open lifecycle, the maxFailureCount=0
//! boundary, and a full close-open-probe-recover run.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use esb_common::{Direction, EsbError, Message};
use esb_core::endpoint::{CircuitState, Endpoint, SendBehavior};

struct CountingFailures(Arc<AtomicU32>);

#[async_trait]
impl SendBehavior for CountingFailures {
    async fn do_send(&self, _msg: Message) -> esb_common::Result<Message> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Err(EsbError::transport(std::io::Error::new(std::io::ErrorKind::Other, "unreachable")))
    }
}

struct Toggle(Arc<AtomicBool>);

#[async_trait]
impl SendBehavior for Toggle {
    async fn do_send(&self, msg: Message) -> esb_common::Result<Message> {
        if self.0.load(Ordering::SeqCst) {
            Ok(msg)
        } else {
            Err(EsbError::transport(std::io::Error::new(std::io::ErrorKind::Other, "down")))
        }
    }
}

/// Endpoint circuit with maxFailureCount=2: after two failures the circuit
/// opens; after the retry window it half-opens, and a successful send
/// resets failureCount to 0.
#[tokio::test]
async fn endpoint_circuit_lifecycle_closes_opens_and_recovers() {
    let attempts = Arc::new(AtomicU32::new(0));
    let succeed = Arc::new(AtomicBool::new(false));

    struct CountThenToggle(Arc<AtomicU32>, Arc<AtomicBool>);
    #[async_trait]
    impl SendBehavior for CountThenToggle {
        async fn do_send(&self, msg: Message) -> esb_common::Result<Message> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if self.1.load(Ordering::SeqCst) {
                Ok(msg)
            } else {
                Err(EsbError::transport(std::io::Error::new(std::io::ErrorKind::Other, "down")))
            }
        }
    }

    let endpoint = Endpoint::with_limits(
        "e",
        "http://x",
        Box::new(CountThenToggle(attempts.clone(), succeed.clone())),
        2,
        Duration::from_millis(120),
    );

    assert!(endpoint.send(Message::new(Direction::Request)).await.is_err());
    assert_eq!(endpoint.circuit_state(), CircuitState::Closed);

    assert!(endpoint.send(Message::new(Direction::Request)).await.is_err());
    assert_eq!(endpoint.circuit_state(), CircuitState::Open);
    assert!(!endpoint.is_available());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!endpoint.is_available(), "retry window has not elapsed yet");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(endpoint.is_available());
    assert_eq!(endpoint.circuit_state(), CircuitState::HalfOpen);

    succeed.store(true, Ordering::SeqCst);
    assert!(endpoint.send(Message::new(Direction::Request)).await.is_ok());
    assert_eq!(endpoint.circuit_state(), CircuitState::Closed);
    assert_eq!(endpoint.failure_count(), 0);
}

#[tokio::test]
async fn boundary_max_failure_count_zero_opens_after_single_failure() {
    let count = Arc::new(AtomicU32::new(0));
    let endpoint = Endpoint::with_limits("e", "http://x", Box::new(CountingFailures(count)), 0, Duration::from_secs(10));
    assert!(endpoint.send(Message::new(Direction::Request)).await.is_err());
    assert!(!endpoint.is_available());
}

#[tokio::test]
async fn reset_restores_closed_state_and_clears_failures() {
    let count = Arc::new(AtomicU32::new(0));
    let endpoint = Endpoint::with_limits("e", "http://x", Box::new(CountingFailures(count)), 1, Duration::from_secs(10));
    assert!(endpoint.send(Message::new(Direction::Request)).await.is_err());
    assert_eq!(endpoint.circuit_state(), CircuitState::Open);

    endpoint.reset();
    assert_eq!(endpoint.circuit_state(), CircuitState::Closed);
    assert_eq!(endpoint.failure_count(), 0);
    assert!(endpoint.is_available());
}

#[tokio::test]
async fn failure_during_half_open_probe_reopens_circuit() {
    let flag = Arc::new(AtomicBool::new(false));
    let endpoint = Endpoint::with_limits("e", "http://x", Box::new(Toggle(flag)), 1, Duration::from_millis(30));
    assert!(endpoint.send(Message::new(Direction::Request)).await.is_err());
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(endpoint.is_available());
    assert!(endpoint.send(Message::new(Direction::Request)).await.is_err());
    assert_eq!(endpoint.circuit_state(), CircuitState::Open);
}
