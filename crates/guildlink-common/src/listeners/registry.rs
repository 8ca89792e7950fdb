//! Listener registry
//!
//! An ordered set of callbacks owned by id. Delivery is synchronous and in
//! registration order. A listener that returns an error or panics is logged
//! and skipped; the remaining listeners still run.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Identifier handed out for every registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Callback<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// Outcome of one notification round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

struct RegistryInner<T> {
    name: &'static str,
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Callback<T>)>>,
}

trait Detach: Send + Sync {
    fn detach(&self, id: ListenerId) -> bool;
}

impl<T> Detach for RegistryInner<T>
where
    T: 'static,
{
    fn detach(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        before != listeners.len()
    }
}

/// Ordered, failure-isolated callback registry
pub struct ListenerRegistry<T> {
    inner: Arc<RegistryInner<T>>,
}

impl<T> Clone for ListenerRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ListenerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("name", &self.inner.name)
            .field("listeners", &self.inner.listeners.read().len())
            .finish()
    }
}

impl<T> ListenerRegistry<T>
where
    T: 'static,
{
    /// Create an empty registry; `name` labels log lines
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                name,
                next_id: AtomicU64::new(1),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a listener and get its unsubscribe handle
    pub fn register<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, Arc::new(listener)));

        tracing::trace!(registry = self.inner.name, listener = %id, "Listener registered");

        let weak: Weak<dyn Detach> = Arc::downgrade(&self.inner) as Weak<dyn Detach>;
        Subscription {
            id,
            registry: weak,
        }
    }

    /// Remove a listener by id; returns whether it was present
    pub fn unregister(&self, id: ListenerId) -> bool {
        self.inner.detach(id)
    }

    /// Deliver `value` to every listener in registration order
    ///
    /// The listener list is snapshotted first, so listeners may register or
    /// unregister from inside a callback.
    pub fn notify(&self, value: &T) -> DeliveryReport {
        let listeners: Vec<(ListenerId, Callback<T>)> = self.inner.listeners.read().clone();
        let mut report = DeliveryReport::default();

        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(value))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(
                        registry = self.inner.name,
                        listener = %id,
                        error = %e,
                        "Listener failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(
                        registry = self.inner.name,
                        listener = %id,
                        "Listener panicked"
                    );
                }
            }
        }

        report
    }

    pub fn len(&self) -> usize {
        self.inner.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.listeners.read().is_empty()
    }
}

/// Unsubscribe handle for one listener
///
/// Holds only a weak reference; the registry may be dropped first.
pub struct Subscription {
    id: ListenerId,
    registry: Weak<dyn Detach>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    #[inline]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener; returns whether it was still registered
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.detach(self.id))
    }
}

/// Subscriptions owned by one component, torn down together
///
/// Dropping the scope tears it down as well.
#[derive(Debug, Default)]
pub struct ScopedListeners {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl ScopedListeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a subscription
    pub fn add(&self, subscription: Subscription) {
        self.subscriptions.lock().push(subscription);
    }

    /// Unsubscribe everything; returns how many listeners were removed
    pub fn teardown(&self) -> usize {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        subscriptions
            .into_iter()
            .map(Subscription::unsubscribe)
            .filter(|removed| *removed)
            .count()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.lock().is_empty()
    }
}

impl Drop for ScopedListeners {
    fn drop(&mut self) {
        self.teardown();
    }
}
