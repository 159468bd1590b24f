use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::Message;
use crate::store::{ChatStore, MessageDraft};
use uuid::Uuid;

/// A message as composed by the UI layer. `attachment_ref` is an
/// already-resolved blob-store reference; waiting for the upload to finish
/// before calling [`MessageService::send_message`] is the caller's job.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub text: Option<String>,
    pub attachment_ref: Option<String>,
}

pub struct MessageService;

impl MessageService {
    /// Validate and submit a message.
    ///
    /// All validation happens before any store call: a payload must carry
    /// trimmed-non-empty text or an attachment reference, and the sender
    /// must be a member of the conversation. The store assigns the commit
    /// timestamp and sequence number; afterwards the parent conversation's
    /// preview is updated to a truncation of the text (or the attachment
    /// marker).
    pub async fn send_message(
        store: &dyn ChatStore,
        config: &Config,
        conversation_id: Uuid,
        sender_id: Uuid,
        outgoing: OutgoingMessage,
    ) -> AppResult<Message> {
        let text = outgoing
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let attachment_ref = outgoing
            .attachment_ref
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());

        if text.is_none() && attachment_ref.is_none() {
            return Err(AppError::EmptyPayload);
        }

        let conversation = store
            .get_conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !conversation.is_member(sender_id) {
            return Err(AppError::NotAParticipant);
        }

        let message = store
            .append_message(MessageDraft {
                conversation_id,
                sender_id,
                text: text.map(str::to_string),
                attachment_ref: attachment_ref.map(str::to_string),
            })
            .await?;

        let preview = match text {
            Some(t) => truncate_preview(t, config.preview_max_chars),
            None => config.attachment_marker.clone(),
        };
        store
            .update_last_message_preview(conversation_id, &preview)
            .await?;

        tracing::debug!(
            message_id = %message.id,
            conversation_id = %conversation_id,
            sequence_number = message.sequence_number,
            "message stored"
        );
        Ok(message)
    }

    /// One-shot ordered history fetch, capped at the configured page size.
    pub async fn message_history(
        store: &dyn ChatStore,
        config: &Config,
        conversation_id: Uuid,
        viewer_id: Uuid,
    ) -> AppResult<Vec<Message>> {
        let conversation = store
            .get_conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !conversation.is_member(viewer_id) {
            return Err(AppError::NotAParticipant);
        }

        let mut messages = store
            .messages_for_conversation(conversation_id, config.history_limit)
            .await?;
        messages.sort_by_key(Message::sort_key);
        Ok(messages)
    }
}

/// Char-boundary-safe preview truncation.
fn truncate_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut preview: String = text.chars().take(max_chars).collect();
    preview.push('\u{2026}');
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conversation_service::ConversationService;
    use crate::store::MemoryStore;

    async fn seeded_conversation(store: &MemoryStore) -> (Uuid, Uuid, Uuid) {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let outcome = ConversationService::start_conversation(store, a, b)
            .await
            .unwrap();
        (outcome.conversation_id(), a, b)
    }

    #[tokio::test]
    async fn empty_payload_is_rejected_without_mutation() {
        let store = MemoryStore::new();
        let config = Config::default();
        let (conversation_id, a, _) = seeded_conversation(&store).await;

        let err = MessageService::send_message(
            &store,
            &config,
            conversation_id,
            a,
            OutgoingMessage {
                text: Some("   ".to_string()),
                attachment_ref: Some(String::new()),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err, AppError::EmptyPayload);
        assert!(store
            .messages_for_conversation(conversation_id, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn non_participant_cannot_send() {
        let store = MemoryStore::new();
        let config = Config::default();
        let (conversation_id, _, _) = seeded_conversation(&store).await;

        let err = MessageService::send_message(
            &store,
            &config,
            conversation_id,
            Uuid::new_v4(),
            OutgoingMessage {
                text: Some("x".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err, AppError::NotAParticipant);
        assert!(store
            .messages_for_conversation(conversation_id, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn attachment_only_message_updates_preview_with_marker() {
        let store = MemoryStore::new();
        let config = Config::default();
        let (conversation_id, a, _) = seeded_conversation(&store).await;

        let message = MessageService::send_message(
            &store,
            &config,
            conversation_id,
            a,
            OutgoingMessage {
                text: None,
                attachment_ref: Some("blob://abc123".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(message.attachment_ref.as_deref(), Some("blob://abc123"));
        let conversation = store
            .get_conversation(conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.last_message_preview, config.attachment_marker);
    }

    #[tokio::test]
    async fn long_text_is_truncated_in_preview() {
        let store = MemoryStore::new();
        let config = Config::default();
        let (conversation_id, a, _) = seeded_conversation(&store).await;

        let long = "à".repeat(config.preview_max_chars + 20);
        MessageService::send_message(
            &store,
            &config,
            conversation_id,
            a,
            OutgoingMessage {
                text: Some(long),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let conversation = store
            .get_conversation(conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            conversation.last_message_preview.chars().count(),
            config.preview_max_chars + 1
        );
        assert!(conversation.last_message_preview.ends_with('\u{2026}'));
    }
}
