//! Publish/subscribe bus for hub events.
//!
//! [`EventBus`] keeps a table of callback subscribers and, alongside it, a
//! [`tokio::sync::broadcast`] channel for tasks that would rather await
//! events than register a callback. The hub runs two instances: one for
//! [`super::MessageEnvelope`]s, one for [`super::RemovalEvent`]s.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::diagnostics::Diagnostics;

/// Subscriber callback. An `Err` return counts as a subscriber fault.
pub type Callback<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Inner<T> {
    name: &'static str,
    subscribers: RwLock<HashMap<SubscriptionId, Callback<T>>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<T>,
    diagnostics: Diagnostics,
}

/// Synchronous fan-out of `T` to every current subscriber.
///
/// # Delivery
///
/// - [`Self::publish`] snapshots the subscriber table and releases the lock
///   before invoking anything, so callbacks may subscribe or unsubscribe
///   (on this or any other bus) while being invoked.
/// - Each callback runs isolated: an `Err` or a panic is reported to
///   [`Diagnostics`] and delivery continues with the next subscriber.
/// - There is no history. A subscriber only sees events published after it
///   subscribed.
pub struct EventBus<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("name", &self.inner.name)
            .field("subscribers", &self.inner.subscribers.read().len())
            .field("streams", &self.inner.sender.receiver_count())
            .finish()
    }
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Creates a bus. `capacity` bounds the channel tap; lagging stream
    /// receivers lose the oldest events.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize, diagnostics: Diagnostics) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                name,
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                sender,
                diagnostics,
            }),
        }
    }

    /// Registers `callback` for all future events.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.write().insert(id, Arc::new(callback));
        id
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.write().remove(&id).is_some()
    }

    /// Invokes every current subscriber with `event`, then forwards it to
    /// the channel tap.
    ///
    /// Returns the number of callbacks that completed without fault.
    pub fn publish(&self, event: T) -> usize {
        let callbacks: Vec<(SubscriptionId, Callback<T>)> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    let fault: &(dyn std::error::Error + 'static) = err.as_ref();
                    self.inner.diagnostics.warn(
                        &format!("{} subscriber {id} failed", self.inner.name),
                        Some(fault),
                    );
                }
                Err(payload) => {
                    self.inner.diagnostics.error(
                        &format!(
                            "{} subscriber {id} panicked: {}",
                            self.inner.name,
                            panic_message(payload.as_ref())
                        ),
                        None,
                    );
                }
            }
        }

        // No stream receivers is the common case.
        let _ = self.inner.sender.send(event);
        delivered
    }

    /// Returns a receiver for all future events.
    #[must_use]
    pub fn stream(&self) -> broadcast::Receiver<T> {
        self.inner.sender.subscribe()
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
