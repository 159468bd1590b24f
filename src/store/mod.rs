//! Conversation Store adapter surface.
//!
//! The store is an external collaborator: a subscribable document store that
//! assigns commit timestamps on write. The core consumes it through
//! [`ChatStore`]; [`memory::MemoryStore`] is the embeddable reference
//! backend used by the test suite.

use crate::error::AppResult;
use crate::models::{Conversation, Message};
use crate::sync::Subscription;
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;

pub use memory::MemoryStore;

/// Live feed of full message snapshots for one conversation.
pub type MessageFeed = Subscription<Uuid, Vec<Message>>;

/// Live feed of full conversation snapshots for one user.
pub type ConversationFeed = Subscription<Uuid, Vec<Conversation>>;

/// Outcome of a create-if-absent conversation write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Uuid),
    /// A record with this id already existed; nothing was written.
    AlreadyExists(Uuid),
}

impl CreateOutcome {
    pub fn conversation_id(&self) -> Uuid {
        match *self {
            CreateOutcome::Created(id) | CreateOutcome::AlreadyExists(id) => id,
        }
    }
}

/// A message as submitted by the composer; the store assigns id, commit
/// timestamp and sequence number at write time.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub text: Option<String>,
    pub attachment_ref: Option<String>,
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn get_conversation(&self, conversation_id: Uuid) -> AppResult<Option<Conversation>>;

    /// All conversations whose members contain `user_id`.
    async fn conversations_for_user(&self, user_id: Uuid) -> AppResult<Vec<Conversation>>;

    /// Create-if-absent: writes a conversation under the caller-supplied id
    /// with a store-assigned `created_at` and an empty preview. Reports the
    /// existing record instead of overwriting when the id is taken.
    async fn create_conversation(
        &self,
        conversation_id: Uuid,
        members: [Uuid; 2],
    ) -> AppResult<CreateOutcome>;

    async fn update_last_message_preview(
        &self,
        conversation_id: Uuid,
        preview: &str,
    ) -> AppResult<()>;

    /// Append a message; the store stamps `created_at` and the
    /// per-conversation sequence number.
    async fn append_message(&self, draft: MessageDraft) -> AppResult<Message>;

    async fn messages_for_conversation(
        &self,
        conversation_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<Message>>;

    /// Subscribe to a conversation's messages. The initial snapshot is
    /// delivered as the feed's first item; every subsequent change delivers
    /// the full current set in arrival order (callers re-sort).
    async fn subscribe_messages(&self, conversation_id: Uuid) -> AppResult<MessageFeed>;

    /// Subscribe to the set of conversations containing `user_id`, full
    /// snapshot per change, initial snapshot first.
    async fn subscribe_conversations(&self, user_id: Uuid) -> AppResult<ConversationFeed>;
}
