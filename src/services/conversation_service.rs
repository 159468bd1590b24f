use crate::error::{AppError, AppResult};
use crate::models::Conversation;
use crate::store::{ChatStore, CreateOutcome};
use uuid::Uuid;

/// Result of resolving a direct conversation between two users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartConversation {
    Created(Uuid),
    /// A thread between this pair already existed; no record was written.
    Existing(Uuid),
}

impl StartConversation {
    pub fn conversation_id(&self) -> Uuid {
        match *self {
            StartConversation::Created(id) | StartConversation::Existing(id) => id,
        }
    }
}

pub struct ConversationService;

impl ConversationService {
    /// Resolve the direct (1:1) conversation between two users, creating it
    /// when no thread exists yet.
    ///
    /// Duplicate prevention is two-layered: a scan of the caller's existing
    /// conversations (covers threads created under legacy random ids), then
    /// a create keyed on the deterministic sorted-pair id, so two racing
    /// creators collide in the store instead of producing parallel threads.
    pub async fn start_conversation(
        store: &dyn ChatStore,
        current_user: Uuid,
        target_user: Uuid,
    ) -> AppResult<StartConversation> {
        if current_user == target_user {
            return Err(AppError::SelfChat);
        }

        if let Some(existing) =
            Self::find_existing_direct_conversation(store, current_user, target_user).await?
        {
            return Ok(StartConversation::Existing(existing));
        }

        let conversation_id = Conversation::direct_id(current_user, target_user);
        match store
            .create_conversation(conversation_id, [current_user, target_user])
            .await?
        {
            CreateOutcome::Created(id) => {
                tracing::info!(conversation_id = %id, "created direct conversation");
                Ok(StartConversation::Created(id))
            }
            CreateOutcome::AlreadyExists(id) => Ok(StartConversation::Existing(id)),
        }
    }

    /// Find an existing direct conversation between two users.
    async fn find_existing_direct_conversation(
        store: &dyn ChatStore,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<Option<Uuid>> {
        let conversations = store.conversations_for_user(user_a).await?;
        Ok(conversations
            .into_iter()
            .find(|c| c.is_member(user_b))
            .map(|c| c.id))
    }

    pub async fn is_member(
        store: &dyn ChatStore,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        Ok(store
            .get_conversation(conversation_id)
            .await?
            .map(|c| c.is_member(user_id))
            .unwrap_or(false))
    }
}
