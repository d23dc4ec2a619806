//! Transport contract: Listener (push model), Sender (pull model),
//! TransportManager (lifecycle fan-out).
//!
//! Listener/Sender are object-safe async traits so concrete transport
//! adapters can be registered by name; shutdown is a `broadcast::channel(1)`
//! fan-out so every listener's `stop()` runs even if another fails.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use esb_common::{EsbError, Message, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Callback a Listener invokes for every inbound message. Returning
/// `Some(reply)` means "deliver this as a reply over the same logical
/// channel"; `None` means one-way, no reply.
#[async_trait]
pub trait MessageCallback: Send + Sync {
    async fn on_message(&self, msg: Message) -> Option<Message>;
}

/// Push-model inbound adapter. `init()` is the only place reactor-like
/// resources may be constructed; `start()`/`stop()` are idempotent.
#[async_trait]
pub trait Listener: Send + Sync {
    fn name(&self) -> &str;
    async fn init(&self) -> Result<()>;
    async fn start(&self, callback: Arc<dyn MessageCallback>) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    fn is_running(&self) -> bool;
}

/// Pull-model outbound adapter. Senders are matched to endpoint URIs by
/// `can_handle`; the first registered sender that returns true wins
/// (registration order is the tie-break).
#[async_trait]
pub trait Sender: Send + Sync {
    fn name(&self) -> &str;
    async fn init(&self) -> Result<()>;
    async fn send(&self, msg: Message, endpoint_uri: &str) -> Result<Option<Message>>;
    fn can_handle(&self, endpoint_uri: &str) -> bool;
    async fn close(&self) -> Result<()>;
}

/// Keyed registries of named Listeners and Senders, plus lifecycle
/// fan-out. Stop MUST attempt every listener even if one fails.
#[derive(Default)]
pub struct TransportManager {
    listeners: DashMap<String, Arc<dyn Listener>>,
    listener_order: parking_lot::Mutex<Vec<String>>,
    senders: DashMap<String, Arc<dyn Sender>>,
    sender_order: parking_lot::Mutex<Vec<String>>,
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl TransportManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            listeners: DashMap::new(),
            listener_order: parking_lot::Mutex::new(Vec::new()),
            senders: DashMap::new(),
            sender_order: parking_lot::Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    pub fn register_listener(&self, listener: Arc<dyn Listener>) {
        let name = listener.name().to_string();
        if self.listeners.insert(name.clone(), listener).is_none() {
            self.listener_order.lock().push(name);
        }
    }

    pub fn register_sender(&self, sender: Arc<dyn Sender>) {
        let name = sender.name().to_string();
        if self.senders.insert(name.clone(), sender).is_none() {
            self.sender_order.lock().push(name);
        }
    }

    /// First registered sender whose `can_handle` matches `endpoint_uri`.
    pub fn sender_for(&self, endpoint_uri: &str) -> Option<Arc<dyn Sender>> {
        let order = self.sender_order.lock().clone();
        for name in order {
            if let Some(sender) = self.senders.get(&name) {
                if sender.can_handle(endpoint_uri) {
                    return Some(sender.clone());
                }
            }
        }
        None
    }

    pub async fn initialize_listeners(&self) -> Result<()> {
        let order = self.listener_order.lock().clone();
        for name in order {
            if let Some(listener) = self.listeners.get(&name) {
                listener.init().await?;
            }
        }
        Ok(())
    }

    pub async fn start_listeners(&self, callback: Arc<dyn MessageCallback>) -> Result<()> {
        let order = self.listener_order.lock().clone();
        for name in order {
            if let Some(listener) = self.listeners.get(&name) {
                listener.start(callback.clone()).await?;
                info!(listener = %name, "listener started");
            }
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop every listener in insertion order, attempting all of them even
    /// if one fails. Idempotent: calling twice is a no-op the second time.
    pub async fn stop_listeners(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
        let order = self.listener_order.lock().clone();
        for name in order {
            if let Some(listener) = self.listeners.get(&name) {
                if let Err(e) = listener.stop().await {
                    error!(listener = %name, error = %e, "listener failed to stop cleanly");
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub async fn send(&self, msg: Message, endpoint_uri: &str) -> Result<Option<Message>> {
        let sender = self
            .sender_for(endpoint_uri)
            .ok_or_else(|| EsbError::not_found(format!("no sender handles '{endpoint_uri}'")))?;
        sender.send(msg, endpoint_uri).await
    }
}
