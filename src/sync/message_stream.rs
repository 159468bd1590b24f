//! Message Stream Synchronizer
//!
//! Maintains a live, ordered view of one conversation's messages. Each
//! update carries the full current set, re-sorted by the store-assigned
//! timestamp (pending timestamps last, arrival order preserved) — append
//! order is never trusted, since the server may commit two near-
//! simultaneous writes in either order.

use crate::error::{AppError, AppResult};
use crate::models::Message;
use crate::store::{ChatStore, MessageFeed};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use uuid::Uuid;

pub struct MessageStreamSynchronizer;

impl MessageStreamSynchronizer {
    /// Establish a live view of a conversation's messages.
    ///
    /// The access check happens before the subscription exists, so a denied
    /// caller never receives an update: a missing conversation is
    /// `NotFound`, a viewer outside `members` is `NotAParticipant`.
    pub async fn subscribe(
        store: &dyn ChatStore,
        conversation_id: Uuid,
        viewer_id: Uuid,
    ) -> AppResult<MessageStream> {
        let conversation = store
            .get_conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !conversation.is_member(viewer_id) {
            return Err(AppError::NotAParticipant);
        }

        let feed = store.subscribe_messages(conversation_id).await?;
        tracing::debug!(%conversation_id, %viewer_id, "message stream opened");
        Ok(MessageStream { feed })
    }
}

/// Live, ordered message view. The first item is the initial snapshot.
///
/// Also usable as a `futures::Stream` of snapshots. After
/// [`MessageStream::unsubscribe`] returns, no further snapshot is yielded.
pub struct MessageStream {
    feed: MessageFeed,
}

impl MessageStream {
    /// Next full snapshot in view order, or `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<Vec<Message>> {
        self.feed.recv().await.map(sort_for_view)
    }

    pub async fn unsubscribe(&mut self) {
        self.feed.unsubscribe().await;
    }
}

impl Stream for MessageStream {
    type Item = Vec<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.feed.poll_recv(cx).map(|item| item.map(sort_for_view))
    }
}

fn sort_for_view(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by_key(Message::sort_key);
    messages
}
