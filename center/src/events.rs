//! Event fan-out for committed ledger events.
//!
//! Listeners are invoked inline on the committing thread, in commit order,
//! while the center's writer lock is held. Keep handlers fast and never call
//! a mutating center operation from inside one.
//!
//! The bus also feeds a tokio broadcast channel for async consumers; slow
//! receivers observe `RecvError::Lagged` rather than stalling commits.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use sharecenter_types::{EventName, EventRecord};
use tokio::sync::broadcast;

pub type Listener = Arc<dyn Fn(&EventRecord) + Send + Sync>;

/// Routes events to handlers by name, plus handlers that see everything.
#[derive(Clone, Default)]
pub struct ListenerMap {
    named: BTreeMap<EventName, Vec<Listener>>,
    any: Vec<Listener>,
}

impl ListenerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle events named `name`.
    pub fn on(mut self, name: EventName, f: impl Fn(&EventRecord) + Send + Sync + 'static) -> Self {
        self.named.entry(name).or_default().push(Arc::new(f));
        self
    }

    /// Handle every event.
    pub fn on_any(mut self, f: impl Fn(&EventRecord) + Send + Sync + 'static) -> Self {
        self.any.push(Arc::new(f));
        self
    }

    pub fn dispatch(&self, record: &EventRecord) {
        if let Some(listeners) = self.named.get(&record.event.name()) {
            for listener in listeners {
                listener(record);
            }
        }
        for listener in &self.any {
            listener(record);
        }
    }
}

/// Synchronous fan-out bus with cancellable subscriptions.
pub struct EventBus {
    subscribers: Mutex<BTreeMap<u64, Arc<ListenerMap>>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<EventRecord>,
}

impl EventBus {
    pub fn new(channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            subscribers: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            sender,
        }
    }

    pub fn subscribe(self: &Arc<Self>, listeners: ListenerMap) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(listeners));
        tracing::debug!(subscription = id, "event subscription registered");
        Subscription {
            id,
            bus: Arc::downgrade(self),
            active: true,
        }
    }

    pub fn emit(&self, record: &EventRecord) {
        // Snapshot first so a listener may subscribe or cancel without deadlocking.
        let subscribers: Vec<Arc<ListenerMap>> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for listeners in subscribers {
            listeners.dispatch(record);
        }
        // No receivers is not an error.
        let _ = self.sender.send(record.clone());
    }

    /// A receiver for events committed from now on.
    pub fn stream(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        tracing::debug!(subscription = id, "event subscription cancelled");
    }
}

/// Handle to a live subscription. Dropping it unsubscribes.
#[must_use = "dropping a subscription cancels it"]
pub struct Subscription {
    id: u64,
    bus: Weak<EventBus>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active && self.bus.strong_count() > 0
    }

    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.active) {
            if let Some(bus) = self.bus.upgrade() {
                bus.unsubscribe(self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
