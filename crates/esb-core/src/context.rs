//! MessageContext - per-request envelope around a Message
//!
//! Holds the four property scopes, attachments, fault state, and the
//! parent/children relation. The parent/child relation once meant raw
//! `Arc<MessageContext>` pointers held in both directions; here it is an
//! arena of contexts addressed by index, so closing the root can walk and
//! release children without fighting reference cycles.

use std::collections::HashMap;

use esb_common::Message;
use parking_lot::RwLock;

/// Index into a `ContextArena`. Not meaningful outside the arena that
/// produced it.
pub type ContextId = usize;

/// One of the four scopes a property may be set in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Default,
    Transport,
    Axis2,
    Operation,
}

/// Fault state recorded on a context when mediation fails mid-flight.
#[derive(Debug, Clone, Default)]
pub struct FaultState {
    pub is_fault: bool,
    pub code: Option<String>,
    pub reason: Option<String>,
    pub cause: Option<String>,
}

impl FaultState {
    pub fn set(&mut self, code: impl Into<String>, reason: impl Into<String>, cause: Option<String>) {
        self.is_fault = true;
        self.code = Some(code.into());
        self.reason = Some(reason.into());
        self.cause = cause;
    }
}

/// Per-request context wrapping a `Message`.
pub struct MessageContext {
    pub message: Message,
    scopes: HashMap<Scope, HashMap<String, String>>,
    attachments: HashMap<String, Vec<u8>>,
    fault: RwLock<FaultState>,
    parent: Option<ContextId>,
    children: RwLock<Vec<ContextId>>,
    created_at: std::time::Instant,
}

impl MessageContext {
    fn new(message: Message, parent: Option<ContextId>) -> Self {
        let mut scopes = HashMap::new();
        scopes.insert(Scope::Default, HashMap::new());
        scopes.insert(Scope::Transport, HashMap::new());
        scopes.insert(Scope::Axis2, HashMap::new());
        scopes.insert(Scope::Operation, HashMap::new());
        Self {
            message,
            scopes,
            attachments: HashMap::new(),
            fault: RwLock::new(FaultState::default()),
            parent,
            children: RwLock::new(Vec::new()),
            created_at: std::time::Instant::now(),
        }
    }

    pub fn get_property(&self, scope: Scope, name: &str) -> Option<&str> {
        self.scopes.get(&scope).and_then(|m| m.get(name)).map(|s| s.as_str())
    }

    pub fn set_property(&mut self, scope: Scope, name: impl Into<String>, value: impl Into<String>) {
        self.scopes.entry(scope).or_default().insert(name.into(), value.into());
    }

    pub fn remove_property(&mut self, scope: Scope, name: &str) -> Option<String> {
        self.scopes.get_mut(&scope).and_then(|m| m.remove(name))
    }

    pub fn set_attachment(&mut self, content_id: impl Into<String>, bytes: Vec<u8>) {
        self.attachments.insert(content_id.into(), bytes);
    }

    pub fn attachment(&self, content_id: &str) -> Option<&[u8]> {
        self.attachments.get(content_id).map(|v| v.as_slice())
    }

    pub fn fault(&self) -> FaultState {
        self.fault.read().clone()
    }

    pub fn set_fault(&self, code: impl Into<String>, reason: impl Into<String>, cause: Option<String>) {
        self.fault.write().set(code, reason, cause);
    }

    pub fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    pub fn children(&self) -> Vec<ContextId> {
        self.children.read().clone()
    }

    pub fn created_at(&self) -> std::time::Instant {
        self.created_at
    }

    /// Release attachments and clear scoped properties. Does not recurse
    /// into children; the arena's `close` does that.
    fn close_self(&mut self) {
        self.attachments.clear();
        for scope_map in self.scopes.values_mut() {
            scope_map.clear();
        }
        self.message.close();
    }
}

/// Owns every `MessageContext` created for one logical request tree.
///
/// Contexts are addressed by `ContextId` rather than shared pointers, so a
/// child never needs to reach back into its parent through an `Arc` — it
/// just records the index and the arena mediates lookups.
#[derive(Default)]
pub struct ContextArena {
    contexts: Vec<Option<MessageContext>>,
}

impl ContextArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the root context for a fresh inbound message.
    pub fn create_root(&mut self, message: Message) -> ContextId {
        let id = self.contexts.len();
        self.contexts.push(Some(MessageContext::new(message, None)));
        id
    }

    /// Fan out a child context from `parent`, e.g. for a branch that needs
    /// its own fault/attachment state.
    pub fn create_child(&mut self, parent: ContextId, message: Message) -> ContextId {
        let id = self.contexts.len();
        self.contexts.push(Some(MessageContext::new(message, Some(parent))));
        if let Some(Some(parent_ctx)) = self.contexts.get(parent) {
            parent_ctx.children.write().push(id);
        }
        id
    }

    pub fn get(&self, id: ContextId) -> Option<&MessageContext> {
        self.contexts.get(id).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: ContextId) -> Option<&mut MessageContext> {
        self.contexts.get_mut(id).and_then(|slot| slot.as_mut())
    }

    /// Close `id` and every descendant, releasing attachments and clearing
    /// scoped properties. Closing a context that was already closed (or an
    /// id that was never created) is a no-op.
    pub fn close(&mut self, id: ContextId) {
        let children = self.get(id).map(|c| c.children()).unwrap_or_default();
        for child in children {
            self.close(child);
        }
        if let Some(ctx) = self.get_mut(id) {
            ctx.close_self();
        }
        if let Some(slot) = self.contexts.get_mut(id) {
            *slot = None;
        }
    }
}
