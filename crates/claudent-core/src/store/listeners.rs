//! Realtime listener bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::paths::CollectionPath;
use super::QuerySnapshot;

/// Callback invoked with every snapshot of a watched collection.
pub type Listener = Arc<dyn Fn(&QuerySnapshot) + Send + Sync>;

struct Entry {
    id: u64,
    collection: CollectionPath,
    listener: Listener,
}

/// Registered listeners, shared between a store and its subscriptions.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry>>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a listener; it stays active until the returned handle is dropped.
    pub fn register(self: &Arc<Self>, collection: CollectionPath, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                id,
                collection: collection.clone(),
                listener,
            });
        tracing::debug!(subscription = id, %collection, "listener registered");
        Subscription {
            id,
            collection,
            registry: Arc::downgrade(self),
        }
    }

    /// Listeners watching `collection`, cloned out so they can run unlocked.
    pub fn listeners_for(&self, collection: &CollectionPath) -> Vec<Listener> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| &entry.collection == collection)
            .map(|entry| Arc::clone(&entry.listener))
            .collect()
    }

    /// Number of active listeners.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|entry| entry.id != id);
        tracing::debug!(subscription = id, "listener removed");
    }
}

/// Handle to an active subscription. Dropping it stops delivery.
pub struct Subscription {
    id: u64,
    collection: CollectionPath,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    /// Stop delivery now.
    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("collection", &self.collection)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
