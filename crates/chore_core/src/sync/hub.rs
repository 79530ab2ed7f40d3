//! In-process change broadcast between state store instances.
//!
//! # Responsibility
//! - Deliver "state updated" notices to every subscribed consumer.
//! - Never echo a notice back to the origin that published it.
//!
//! # Invariants
//! - Listeners are invoked outside the registry lock, so a listener may
//!   subscribe or unsubscribe without deadlocking.
//! - Subscription ids are never reused within one hub.

use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Identity of a publishing/consuming store instance.
pub type OriginId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEventKind {
    StateUpdated,
}

/// Notice that the persisted snapshot under `key` changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    pub kind: SyncEventKind,
    pub origin: OriginId,
    pub key: String,
    pub revision: i64,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    UnknownSubscription(SubscriptionId),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSubscription(id) => write!(f, "unknown sync subscription: {}", id.0),
        }
    }
}

impl Error for SyncError {}

/// Consumer of sync events.
pub trait SyncListener: Send + Sync {
    fn on_event(&self, event: &SyncEvent);
}

impl<F> SyncListener for F
where
    F: Fn(&SyncEvent) + Send + Sync,
{
    fn on_event(&self, event: &SyncEvent) {
        self(event)
    }
}

/// Listener that only records that a rehydrate is due.
///
/// Consumers poll `take()` before their next query and call
/// `AppStore::rehydrate` when it returns `true`.
#[derive(Debug, Default)]
pub struct RehydrateSignal {
    pending: AtomicBool,
}

impl RehydrateSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a notice arrived since the last call, and resets it.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl SyncListener for RehydrateSignal {
    fn on_event(&self, _event: &SyncEvent) {
        self.pending.store(true, Ordering::Release);
    }
}

struct Subscription {
    origin: OriginId,
    listener: Arc<dyn SyncListener>,
}

/// Broadcast hub shared between store instances.
#[derive(Default)]
pub struct SyncHub {
    subscriptions: Mutex<BTreeMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
}

impl SyncHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` on behalf of `origin`.
    ///
    /// Events published by the same `origin` are not delivered to it.
    pub fn subscribe(&self, origin: OriginId, listener: Arc<dyn SyncListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, Subscription { origin, listener });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), SyncError> {
        match self.lock().remove(&id) {
            Some(_) => Ok(()),
            None => Err(SyncError::UnknownSubscription(id)),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Delivers `event` to every subscriber except its origin.
    ///
    /// Returns the number of listeners notified.
    pub fn broadcast(&self, event: &SyncEvent) -> usize {
        let targets: Vec<Arc<dyn SyncListener>> = self
            .lock()
            .values()
            .filter(|subscription| subscription.origin != event.origin)
            .map(|subscription| Arc::clone(&subscription.listener))
            .collect();

        for listener in &targets {
            listener.on_event(event);
        }
        debug!(
            "event=sync_broadcast module=sync status=ok revision={} delivered={}",
            event.revision,
            targets.len()
        );
        targets.len()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<SubscriptionId, Subscription>> {
        // Listeners never run under this lock.
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::{RehydrateSignal, SyncError, SyncEvent, SyncEventKind, SyncHub};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    fn event(origin: Uuid) -> SyncEvent {
        SyncEvent {
            kind: SyncEventKind::StateUpdated,
            origin,
            key: "chore-app-storage".to_string(),
            revision: 3,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn broadcast_skips_publishing_origin() {
        let hub = SyncHub::new();
        let (tab_a, tab_b) = (Uuid::now_v7(), Uuid::now_v7());
        let signal_a = Arc::new(RehydrateSignal::new());
        let signal_b = Arc::new(RehydrateSignal::new());
        hub.subscribe(tab_a, signal_a.clone());
        hub.subscribe(tab_b, signal_b.clone());

        assert_eq!(hub.broadcast(&event(tab_a)), 1);
        assert!(!signal_a.take());
        assert!(signal_b.take());
        assert!(!signal_b.take());
    }

    #[test]
    fn closures_can_listen_and_unsubscribe() {
        let hub = SyncHub::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let id = hub.subscribe(
            Uuid::now_v7(),
            Arc::new(move |_: &SyncEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        hub.broadcast(&event(Uuid::now_v7()));
        hub.unsubscribe(id).unwrap();
        hub.broadcast(&event(Uuid::now_v7()));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(
            hub.unsubscribe(id).unwrap_err(),
            SyncError::UnknownSubscription(id)
        );
    }
}
