//! MediationEngine - entry point: resolves target sequence, runs it,
//! applies QoS gates, manages transport lifecycle.
//!
//! The central-orchestrator shape and the idempotent, broadcast-based
//! start/stop pairing follow the same pattern used elsewhere in this crate
//! for managed subsystems (see `transport::TransportManager`).

use std::sync::Arc;
use std::time::Instant;

use esb_common::{EsbError, Message, Result};
use tracing::{info, warn};

use crate::error::MediationError;
use crate::registry::Registry;
use crate::sequence::Sequence;
use crate::transport::{MessageCallback, TransportManager};

/// Consulted before mediation to apply throttling, caching,
/// authentication, or reliable-delivery policy. Concrete algorithms live
/// in a collaborator crate; the engine only needs the gate.
#[async_trait::async_trait]
pub trait QosGate: Send + Sync {
    /// May block (e.g. to wait for rate-limit budget) or reject with
    /// `NotAvailable`/`Validation`.
    async fn acquire(&self, msg: &Message) -> Result<()>;
}

/// A gate that always admits; the default when no QoS policy is wired up.
pub struct AllowAll;

#[async_trait::async_trait]
impl QosGate for AllowAll {
    async fn acquire(&self, _msg: &Message) -> Result<()> {
        Ok(())
    }
}

/// Explicit dependency-injection struct passed at engine construction,
/// replacing global singleton lookups with values wired in by the caller.
pub struct EngineConfig {
    pub registry: Arc<Registry>,
    pub qos_gate: Arc<dyn QosGate>,
    pub transport: Arc<TransportManager>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            qos_gate: Arc::new(AllowAll),
            transport: Arc::new(TransportManager::new()),
        }
    }
}

pub struct MediationEngine {
    registry: Arc<Registry>,
    qos_gate: Arc<dyn QosGate>,
    transport: Arc<TransportManager>,
}

impl MediationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: config.registry,
            qos_gate: config.qos_gate,
            transport: config.transport,
        }
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn register_sequence(&self, seq: Sequence) {
        self.registry.put_sequence(seq);
    }

    pub fn register_endpoint(&self, name: impl Into<String>, endpoint: crate::endpoint::Endpoint) {
        self.registry.put_endpoint(name, endpoint);
    }

    /// Primary entry point. Acquires the QoS gate, resolves and applies
    /// the named sequence, releases the gate. On failure, routes to the
    /// sequence's `onErrorSequence` if configured, otherwise re-raises.
    pub async fn mediate(&self, msg: Message, sequence_name: &str) -> std::result::Result<Message, MediationError> {
        let started = Instant::now();

        self.qos_gate
            .acquire(&msg)
            .await
            .map_err(|e| MediationError::new("qos-gate", e))?;

        let sequence = self
            .registry
            .get_sequence(sequence_name)
            .ok_or_else(|| MediationError::new(sequence_name, EsbError::not_found(format!("sequence '{sequence_name}' not found"))))?;

        let result = sequence.apply(msg.deep_clone()).await;

        crate::metrics::record_mediated(sequence_name, result.is_ok());
        crate::metrics::record_mediation_latency(sequence_name, started.elapsed());

        match result {
            Ok(reply) => Ok(reply),
            Err(e) => {
                if let Some(on_error) = &sequence.on_error_sequence {
                    warn!(sequence = sequence_name, on_error, error = %e, "routing to onErrorSequence");
                    let annotated = Self::annotate_error(msg, &e);
                    return Box::pin(self.mediate(annotated, on_error)).await;
                }
                Err(e)
            }
        }
    }

    fn annotate_error(mut msg: Message, err: &MediationError) -> Message {
        let _ = msg.set_property(
            "mediation.error",
            esb_common::PropertyValue::Literal(err.to_string()),
        );
        msg
    }

    pub async fn start(&self, callback: Arc<dyn MessageCallback>) -> Result<()> {
        self.transport.initialize_listeners().await?;
        self.transport.start_listeners(callback).await?;
        info!("mediation engine started");
        Ok(())
    }

    /// Idempotent: stopping an already-stopped engine is a no-op.
    pub async fn stop(&self) {
        self.transport.stop_listeners().await;
        info!("mediation engine stopped");
    }
}
