//! UI-facing event surface.
//!
//! `AppState` bundles the external collaborators (store, identity, config)
//! and is the one place the current-user lookup happens; every core
//! operation below it takes explicit user ids.

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::identity::IdentityProvider;
use crate::models::Message;
use crate::services::{
    ConversationService, MessageService, OutgoingMessage, StartConversation,
};
use crate::store::ChatStore;
use crate::sync::{
    filter_chats, ChatListEntry, ChatListStream, ChatListSynchronizer, MessageStream,
    MessageStreamSynchronizer,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ChatStore>,
        identity: Arc<dyn IdentityProvider>,
        config: Config,
    ) -> Self {
        Self {
            store,
            identity,
            config: Arc::new(config),
        }
    }

    async fn require_current_user(&self) -> AppResult<Uuid> {
        self.identity
            .current_user_id()
            .await
            .ok_or(AppError::NotAuthenticated)
    }

    /// Resolve (or create) the direct conversation with `target_user`.
    pub async fn start_conversation(&self, target_user: Uuid) -> AppResult<StartConversation> {
        let current_user = self.require_current_user().await?;
        ConversationService::start_conversation(self.store.as_ref(), current_user, target_user)
            .await
    }

    /// Submit a message as the current user.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        outgoing: OutgoingMessage,
    ) -> AppResult<Message> {
        let sender_id = self.require_current_user().await?;
        MessageService::send_message(
            self.store.as_ref(),
            &self.config,
            conversation_id,
            sender_id,
            outgoing,
        )
        .await
    }

    /// Open the live, ordered message view for one conversation.
    pub async fn open_messages(&self, conversation_id: Uuid) -> AppResult<MessageStream> {
        let viewer_id = self.require_current_user().await?;
        MessageStreamSynchronizer::subscribe(self.store.as_ref(), conversation_id, viewer_id).await
    }

    /// Open the live, enriched chat list for the current user.
    pub async fn open_chat_list(&self) -> AppResult<ChatListStream> {
        let user_id = self.require_current_user().await?;
        ChatListSynchronizer::subscribe(
            self.store.as_ref(),
            Arc::clone(&self.identity),
            Arc::clone(&self.config),
            user_id,
        )
        .await
    }

    /// Client-side chat search over an already-enriched list.
    pub fn search_chats(entries: &[ChatListEntry], term: &str) -> Vec<ChatListEntry> {
        filter_chats(entries, term)
    }

    /// One-shot ordered history fetch for the current user.
    pub async fn message_history(&self, conversation_id: Uuid) -> AppResult<Vec<Message>> {
        let viewer_id = self.require_current_user().await?;
        MessageService::message_history(
            self.store.as_ref(),
            &self.config,
            conversation_id,
            viewer_id,
        )
        .await
    }
}
