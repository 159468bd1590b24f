//! Live-view plumbing: the subscriber registry the store broadcasts through,
//! the cancellable subscription handle, and the two synchronizers built on
//! top of them.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod chat_list;
pub mod message_stream;

pub use chat_list::{filter_chats, ChatListEntry, ChatListStream, ChatListSynchronizer};
pub use message_stream::{MessageStream, MessageStreamSynchronizer};

/// Unique identifier for one live subscription.
///
/// Allows precise cleanup when a view is torn down, so a leaked entry never
/// keeps receiving updates meant for someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

struct Subscriber<T> {
    id: SubscriberId,
    sender: UnboundedSender<T>,
}

/// Registry of live subscribers, keyed by the record they watch
/// (conversation id for message feeds, user id for chat-list feeds).
///
/// Dead senders are reaped on broadcast; explicit removal happens through
/// [`Subscription::unsubscribe`].
pub struct Registry<K, T> {
    inner: Arc<RwLock<HashMap<K, Vec<Subscriber<T>>>>>,
}

impl<K, T> Clone for Registry<K, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, T> Default for Registry<K, T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<K, T> Registry<K, T>
where
    K: Eq + Hash + Copy + Debug,
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber under `key` and hand back its feed as a
    /// cancellable [`Subscription`].
    pub async fn add_subscriber(&self, key: K) -> Subscription<K, T> {
        let (tx, rx) = unbounded_channel();
        let id = SubscriberId::new();

        let mut guard = self.inner.write().await;
        guard
            .entry(key)
            .or_default()
            .push(Subscriber { id, sender: tx });

        tracing::debug!(
            ?key,
            ?id,
            total = guard.get(&key).map(|v| v.len()).unwrap_or(0),
            "added subscriber"
        );

        Subscription {
            key,
            id,
            registry: self.clone(),
            rx,
            cancelled: false,
        }
    }

    async fn remove_subscriber(&self, key: K, id: SubscriberId) {
        let mut guard = self.inner.write().await;

        if let Some(subscribers) = guard.get_mut(&key) {
            let before = subscribers.len();
            subscribers.retain(|s| s.id != id);

            if subscribers.len() != before {
                tracing::debug!(?key, ?id, remaining = subscribers.len(), "removed subscriber");
            }

            if subscribers.is_empty() {
                guard.remove(&key);
            }
        }
    }

    /// Deliver a snapshot to every subscriber of `key`, reaping the ones
    /// whose receiving side is gone.
    pub async fn broadcast(&self, key: K, payload: T) {
        let mut guard = self.inner.write().await;
        if let Some(subscribers) = guard.get_mut(&key) {
            let before = subscribers.len();
            subscribers.retain(|subscriber| subscriber.sender.send(payload.clone()).is_ok());

            if subscribers.len() != before {
                tracing::debug!(
                    ?key,
                    reaped = before - subscribers.len(),
                    active = subscribers.len(),
                    "broadcast cleaned up dead subscribers"
                );
            }

            if subscribers.is_empty() {
                guard.remove(&key);
            }
        }
    }

    /// Deliver a snapshot to a single subscriber (used for the initial
    /// snapshot right after registration).
    pub async fn send_to(&self, key: K, id: SubscriberId, payload: T) {
        let guard = self.inner.read().await;
        if let Some(subscriber) = guard
            .get(&key)
            .and_then(|subs| subs.iter().find(|s| s.id == id))
        {
            let _ = subscriber.sender.send(payload);
        }
    }

    pub async fn subscriber_count(&self, key: K) -> usize {
        let guard = self.inner.read().await;
        guard.get(&key).map(|v| v.len()).unwrap_or(0)
    }
}

/// A live feed of snapshots with guaranteed cleanup.
///
/// After [`Subscription::unsubscribe`] returns, no further snapshot is
/// observable: the registry entry is gone and anything already buffered is
/// drained. Dropping the handle without unsubscribing is safe too; the
/// registry reaps the dead sender on the next broadcast.
pub struct Subscription<K, T>
where
    K: Eq + Hash + Copy + Debug,
    T: Clone,
{
    key: K,
    id: SubscriberId,
    registry: Registry<K, T>,
    rx: UnboundedReceiver<T>,
    cancelled: bool,
}

impl<K, T> Subscription<K, T>
where
    K: Eq + Hash + Copy + Debug,
    T: Clone,
{
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next snapshot, or `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<T> {
        if self.cancelled {
            return None;
        }
        self.rx.recv().await
    }

    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.cancelled {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }

    /// Release the live view. Idempotent.
    pub async fn unsubscribe(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.registry.remove_subscriber(self.key, self.id).await;
        self.rx.close();
        // Drop anything delivered before removal took effect.
        while self.rx.try_recv().is_ok() {}
    }
}
