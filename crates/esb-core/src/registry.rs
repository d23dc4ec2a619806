//! Registry - named stores for sequences, endpoints, transports, and
//! artifacts, with hot-reload and change notification.
//!
//! Each store is a `DashMap` keyed by name, so a reload replaces one entry
//! under its own shard lock without blocking readers of other keys.

use std::sync::Arc;

use dashmap::DashMap;
use esb_common::{EsbError, Result};
use tracing::warn;

use crate::endpoint::Endpoint;
use crate::sequence::Sequence;

/// A config-parsed artifact the core stores opaquely on behalf of a
/// future config-parsing crate. The core never interprets the bytes; it
/// only stores and serves them by name.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SequenceArtifact {
    pub name: String,
    pub is_template: bool,
    pub parameter_count: usize,
    pub on_error_sequence: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EndpointArtifact {
    pub name: String,
    pub url: String,
    pub max_failure_count: u32,
    pub retry_timeout_ms: u64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RoutingRule {
    pub pattern: String,
    pub sequence_name: String,
}

type ChangeListener = Box<dyn Fn(&str) + Send + Sync>;

/// Named stores for sequences, endpoints, configured transports (by name,
/// opaquely - `esb-core` doesn't own transport instances itself, see
/// `transport::TransportManager`), and generic artifacts.
#[derive(Default)]
pub struct Registry {
    sequences: DashMap<String, Arc<Sequence>>,
    endpoints: DashMap<String, Arc<Endpoint>>,
    artifacts: DashMap<String, Arc<dyn std::any::Any + Send + Sync>>,
    listeners: DashMap<String, ChangeListener>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_sequence(&self, seq: Sequence) {
        let name = seq.name.clone();
        self.sequences.insert(name.clone(), Arc::new(seq));
        self.notify("sequences", &name);
    }

    pub fn get_sequence(&self, name: &str) -> Option<Arc<Sequence>> {
        self.sequences.get(name).map(|e| e.clone())
    }

    pub fn remove_sequence(&self, name: &str) -> Option<Arc<Sequence>> {
        let removed = self.sequences.remove(name).map(|(_, v)| v);
        if removed.is_some() {
            self.notify("sequences", name);
        }
        removed
    }

    pub fn put_endpoint(&self, name: impl Into<String>, endpoint: Endpoint) {
        let name = name.into();
        self.endpoints.insert(name.clone(), Arc::new(endpoint));
        self.notify("endpoints", &name);
    }

    pub fn get_endpoint(&self, name: &str) -> Option<Arc<Endpoint>> {
        self.endpoints.get(name).map(|e| e.clone())
    }

    pub fn remove_endpoint(&self, name: &str) -> Option<Arc<Endpoint>> {
        let removed = self.endpoints.remove(name).map(|(_, v)| v);
        if removed.is_some() {
            self.notify("endpoints", name);
        }
        removed
    }

    pub fn put_artifact(&self, name: impl Into<String>, artifact: Arc<dyn std::any::Any + Send + Sync>) {
        let name = name.into();
        self.artifacts.insert(name.clone(), artifact);
        self.notify("artifacts", &name);
    }

    pub fn get_artifact(&self, name: &str) -> Option<Arc<dyn std::any::Any + Send + Sync>> {
        self.artifacts.get(name).map(|e| e.clone())
    }

    pub fn sequence_names(&self) -> Vec<String> {
        self.sequences.iter().map(|e| e.key().clone()).collect()
    }

    pub fn endpoint_names(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.key().clone()).collect()
    }

    /// Subscribe a named listener. Re-registering the same name replaces
    /// the previous listener.
    pub fn on_change(&self, listener_name: impl Into<String>, f: impl Fn(&str) + Send + Sync + 'static) {
        self.listeners.insert(listener_name.into(), Box::new(f));
    }

    pub fn remove_listener(&self, listener_name: &str) {
        self.listeners.remove(listener_name);
    }

    /// Notify every subscriber that `key` changed in `store`, and record
    /// the reload in the metrics stack. A listener that panics is caught
    /// and logged so it cannot block the others.
    fn notify(&self, store: &str, key: &str) {
        crate::metrics::record_registry_reload(store, key);
        for entry in self.listeners.iter() {
            let name = entry.key().clone();
            let listener = entry.value();
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener(key))).is_err() {
                warn!(listener = %name, key, "registry change listener panicked");
            }
        }
    }

    /// Instantiate `template_name` with `params` and install the result
    /// under its own name, atomically replacing any prior non-template
    /// entry of the same name. Used by template Sequence-reference
    /// mediators and by config reload alike.
    pub fn instantiate_and_register(&self, template_name: &str, params: &[String]) -> Result<Arc<Sequence>> {
        let template = self
            .get_sequence(template_name)
            .ok_or_else(|| EsbError::not_found(format!("sequence '{template_name}' not found")))?;
        let instantiated = template.instantiate(params)?;
        let arc = Arc::new(instantiated);
        self.sequences.insert(template_name.to_string(), arc.clone());
        self.notify("sequences", template_name);
        Ok(arc)
    }
}
