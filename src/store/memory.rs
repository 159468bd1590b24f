//! In-memory subscribable store.
//!
//! Mirrors the external document store closely enough to exercise every
//! core behavior: server-assigned commit timestamps, per-conversation
//! sequence numbers, full-snapshot push on every change, and (optionally)
//! latency-compensated timestamps that surface as `Pending` until resolved.

use crate::error::{AppError, AppResult};
use crate::models::{Conversation, Message, ServerTimestamp};
use crate::store::{ChatStore, ConversationFeed, CreateOutcome, MessageDraft, MessageFeed};
use crate::sync::Registry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    conversations: HashMap<Uuid, Conversation>,
    /// Messages per conversation, in arrival order.
    messages: HashMap<Uuid, Vec<Message>>,
    sequence: HashMap<Uuid, i64>,
}

impl Inner {
    fn conversations_for(&self, user_id: Uuid) -> Vec<Conversation> {
        self.conversations
            .values()
            .filter(|c| c.is_member(user_id))
            .cloned()
            .collect()
    }

    fn messages_for(&self, conversation_id: Uuid) -> Vec<Message> {
        self.messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    fn next_sequence(&mut self, conversation_id: Uuid) -> i64 {
        let counter = self.sequence.entry(conversation_id).or_insert(0);
        *counter += 1;
        *counter
    }
}

pub struct MemoryStore {
    inner: RwLock<Inner>,
    message_registry: Registry<Uuid, Vec<Message>>,
    conversation_registry: Registry<Uuid, Vec<Conversation>>,
    defer_timestamps: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            message_registry: Registry::new(),
            conversation_registry: Registry::new(),
            defer_timestamps: false,
        }
    }

    /// Leave appended messages with a `Pending` timestamp until
    /// [`MemoryStore::resolve_timestamps`] is called, reproducing the
    /// document store's latency-compensated server timestamps.
    pub fn with_pending_timestamps(mut self) -> Self {
        self.defer_timestamps = true;
        self
    }

    /// Stamp every pending message of a conversation with the current
    /// server time (arrival order preserved) and push the updated snapshot.
    /// Returns how many timestamps were resolved.
    pub async fn resolve_timestamps(&self, conversation_id: Uuid) -> usize {
        let snapshot;
        let mut resolved = 0;
        {
            let mut inner = self.inner.write().await;
            let now = Utc::now();
            for message in inner.messages.entry(conversation_id).or_default() {
                if message.created_at.is_pending() {
                    message.created_at = ServerTimestamp::Resolved(now);
                    resolved += 1;
                }
            }
            snapshot = inner.messages_for(conversation_id);
        }

        if resolved > 0 {
            self.message_registry.broadcast(conversation_id, snapshot).await;
        }
        resolved
    }

    /// Append a message with an explicit, already-resolved server
    /// timestamp. Lets tests reproduce the store committing two
    /// near-simultaneous writes in an order that differs from arrival.
    pub async fn append_message_at(
        &self,
        draft: MessageDraft,
        at: DateTime<Utc>,
    ) -> AppResult<Message> {
        self.append_with_timestamp(draft, ServerTimestamp::Resolved(at))
            .await
    }

    async fn append_with_timestamp(
        &self,
        draft: MessageDraft,
        created_at: ServerTimestamp,
    ) -> AppResult<Message> {
        let message;
        let snapshot;
        {
            let mut inner = self.inner.write().await;
            if !inner.conversations.contains_key(&draft.conversation_id) {
                return Err(AppError::NotFound);
            }

            let sequence_number = inner.next_sequence(draft.conversation_id);
            message = Message {
                id: Uuid::new_v4(),
                conversation_id: draft.conversation_id,
                sender_id: draft.sender_id,
                text: draft.text,
                attachment_ref: draft.attachment_ref,
                sequence_number,
                created_at,
            };
            inner
                .messages
                .entry(draft.conversation_id)
                .or_default()
                .push(message.clone());
            snapshot = inner.messages_for(draft.conversation_id);
        }

        self.message_registry
            .broadcast(message.conversation_id, snapshot)
            .await;
        Ok(message)
    }

    async fn broadcast_conversations(&self, members: [Uuid; 2]) {
        let snapshots: Vec<(Uuid, Vec<Conversation>)> = {
            let inner = self.inner.read().await;
            members
                .iter()
                .map(|&member| (member, inner.conversations_for(member)))
                .collect()
        };

        for (member, snapshot) in snapshots {
            self.conversation_registry.broadcast(member, snapshot).await;
        }
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn get_conversation(&self, conversation_id: Uuid) -> AppResult<Option<Conversation>> {
        Ok(self.inner.read().await.conversations.get(&conversation_id).cloned())
    }

    async fn conversations_for_user(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        Ok(self.inner.read().await.conversations_for(user_id))
    }

    async fn create_conversation(
        &self,
        conversation_id: Uuid,
        members: [Uuid; 2],
    ) -> AppResult<CreateOutcome> {
        if members[0] == members[1] {
            return Err(AppError::SelfChat);
        }

        {
            let mut inner = self.inner.write().await;
            if inner.conversations.contains_key(&conversation_id) {
                return Ok(CreateOutcome::AlreadyExists(conversation_id));
            }

            inner.conversations.insert(
                conversation_id,
                Conversation {
                    id: conversation_id,
                    members,
                    created_at: ServerTimestamp::Resolved(Utc::now()),
                    last_message_preview: String::new(),
                },
            );
        }

        self.broadcast_conversations(members).await;
        Ok(CreateOutcome::Created(conversation_id))
    }

    async fn update_last_message_preview(
        &self,
        conversation_id: Uuid,
        preview: &str,
    ) -> AppResult<()> {
        let members = {
            let mut inner = self.inner.write().await;
            let conversation = inner
                .conversations
                .get_mut(&conversation_id)
                .ok_or(AppError::NotFound)?;
            conversation.last_message_preview = preview.to_string();
            conversation.members
        };

        self.broadcast_conversations(members).await;
        Ok(())
    }

    async fn append_message(&self, draft: MessageDraft) -> AppResult<Message> {
        let created_at = if self.defer_timestamps {
            ServerTimestamp::Pending
        } else {
            ServerTimestamp::Resolved(Utc::now())
        };
        self.append_with_timestamp(draft, created_at).await
    }

    async fn messages_for_conversation(
        &self,
        conversation_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<Message>> {
        let inner = self.inner.read().await;
        let mut messages = inner.messages_for(conversation_id);
        messages.truncate(limit);
        Ok(messages)
    }

    async fn subscribe_messages(&self, conversation_id: Uuid) -> AppResult<MessageFeed> {
        // Hold the state lock across registration and the initial snapshot
        // so no concurrent write can slip an older snapshot in after a
        // newer broadcast.
        let inner = self.inner.read().await;
        if !inner.conversations.contains_key(&conversation_id) {
            return Err(AppError::NotFound);
        }

        let subscription = self.message_registry.add_subscriber(conversation_id).await;
        self.message_registry
            .send_to(conversation_id, subscription.id(), inner.messages_for(conversation_id))
            .await;
        Ok(subscription)
    }

    async fn subscribe_conversations(&self, user_id: Uuid) -> AppResult<ConversationFeed> {
        let inner = self.inner.read().await;
        let subscription = self.conversation_registry.add_subscriber(user_id).await;
        self.conversation_registry
            .send_to(user_id, subscription.id(), inner.conversations_for(user_id))
            .await;
        Ok(subscription)
    }
}
