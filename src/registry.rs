//! List registry: out-of-band refresh of mounted lists.
//!
//! A host sometimes needs to refresh a list from code that has no reference
//! to its controller — after a mutation elsewhere in the application, for
//! example. The [`ListRegistry`] maps list identifiers to refresh channels:
//! controllers register at mount and deregister at unmount, and anything
//! holding a registry handle can call [`ListRegistry::refresh_list`].
//!
//! The registry is an explicit service, not a process global: the
//! [`ListRuntime`](crate::ListRuntime) that owns it decides its lifetime,
//! and handles are cheap clones over shared interior state.
//!
//! Refreshes are queued, not executed in place — a registry callback cannot
//! borrow a controller the host already owns mutably. Each controller
//! drains its queue with
//! [`apply_external_refresh`](crate::controller::ListController::apply_external_refresh).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Options carried by one refresh request.
///
/// The `extra` map is merged into the per-call context the request port
/// receives, alongside the implicit `is_refresh` flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshOptions {
    /// Per-call context forwarded to the request port.
    pub extra: Map<String, Value>,
}

impl RefreshOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one key to the per-call context.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Shared mapping from list identifier to refresh channel.
///
/// Cloning produces another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct ListRegistry {
    inner: Arc<Mutex<HashMap<String, UnboundedSender<RefreshOptions>>>>,
}

impl ListRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a list and returns the receiving end of its refresh queue.
    ///
    /// Registering an identifier that is already present replaces the
    /// previous entry; the displaced receiver simply stops receiving.
    pub fn register(&self, list_id: impl Into<String>) -> UnboundedReceiver<RefreshOptions> {
        let list_id = list_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut lists) = self.inner.lock() {
            tracing::debug!(list_id = %list_id, "list registered");
            lists.insert(list_id, tx);
        }
        rx
    }

    /// Removes a list's entry. Unknown identifiers are a no-op.
    pub fn deregister(&self, list_id: &str) {
        if let Ok(mut lists) = self.inner.lock() {
            if lists.remove(list_id).is_some() {
                tracing::debug!(list_id = %list_id, "list deregistered");
            }
        }
    }

    /// Queues a refresh for one list, or for every registered list when
    /// `list_id` is `None`.
    ///
    /// Returns the number of lists notified. A lookup miss is silent — the
    /// list may have unmounted between the external trigger and this call.
    pub fn refresh_list(&self, list_id: Option<&str>, options: RefreshOptions) -> usize {
        let Ok(mut lists) = self.inner.lock() else {
            return 0;
        };

        let mut notified = 0;
        let mut dead = Vec::new();

        match list_id {
            Some(id) => {
                if let Some(tx) = lists.get(id) {
                    if tx.send(options).is_ok() {
                        notified = 1;
                    } else {
                        dead.push(id.to_owned());
                    }
                }
            }
            None => {
                for (id, tx) in lists.iter() {
                    if tx.send(options.clone()).is_ok() {
                        notified += 1;
                    } else {
                        dead.push(id.clone());
                    }
                }
            }
        }

        // A closed channel means the controller dropped without
        // deregistering; prune the entry.
        for id in dead {
            lists.remove(&id);
        }

        tracing::debug!(target = ?list_id, notified, "refresh queued");
        notified
    }

    /// Identifiers of all currently registered lists.
    #[must_use]
    pub fn registered_lists(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|lists| lists.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of registered lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|lists| lists.len()).unwrap_or(0)
    }

    /// True when no list is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
