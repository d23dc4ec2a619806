//! Mediation runtime for the ESB: Message/MessageContext already live in
//! `esb-common`; this crate is the engine that turns a `Sequence` of
//! `Mediator`s into a running, hot-reloadable pipeline.
//!
//! Module map:
//! - [`context`] — the context arena (scoped properties, parent/child tree)
//! - [`mediator`] / [`sequence`] — the `Mediator` trait and its composition
//! - [`builtins`] — Log, Property, Filter, Switch, Sequence-ref, Transform,
//!   Send, Call
//! - [`endpoint`] — endpoint + circuit breaker
//! - [`registry`] — hot-swappable artifact store
//! - [`transport`] — Listener/Sender contract and lifecycle fan-out
//! - [`router`] — pattern-matching dispatch into the engine
//! - [`engine`] — `MediationEngine`, the crate's entry point
//! - [`config_watcher`] — polling config reload
//! - [`metrics`] — `metrics` crate wrappers
//! - [`collaborator`] — Builder/Formatter seams

pub mod builtins;
pub mod collaborator;
pub mod config_watcher;
pub mod context;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod mediator;
pub mod metrics;
pub mod registry;
pub mod router;
pub mod sequence;
pub mod transport;

pub use collaborator::{Builder, Formatter};
pub use config_watcher::{ConfigLoader, ConfigWatcher, ConfigWatcherConfig};
pub use context::{ContextArena, ContextId, MessageContext, Scope};
pub use endpoint::{CircuitState, Endpoint, SendBehavior};
pub use engine::{AllowAll, EngineConfig, MediationEngine, QosGate};
pub use error::MediationError;
pub use mediator::{Mediator, TracedMediator};
pub use registry::{EndpointArtifact, Registry, RoutingRule, SequenceArtifact};
pub use router::Router;
pub use sequence::{ConfiguredValue, MediatorStep, Sequence, TemplateAware};
pub use transport::{Listener, MessageCallback, Sender, TransportManager};

pub use error::Result;
