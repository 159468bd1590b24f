//! Conversation List Synchronizer
//!
//! Maintains the live list of the current user's conversations, each
//! enriched with the counterpart's display identity. Enrichment is a full
//! re-resolve on every change (conversation counts per user are small) and
//! fails soft per item: an unresolvable counterpart gets the placeholder
//! name instead of dropping the entry or tearing down the list.

use crate::config::Config;
use crate::error::AppResult;
use crate::identity::IdentityProvider;
use crate::models::Conversation;
use crate::store::{ChatStore, ConversationFeed};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// One conversation as rendered in the chat list: the raw record plus the
/// counterpart's resolved display identity.
#[derive(Debug, Clone)]
pub struct ChatListEntry {
    pub conversation: Conversation,
    pub name: String,
    pub avatar_ref: String,
}

pub struct ChatListSynchronizer;

impl ChatListSynchronizer {
    pub async fn subscribe(
        store: &dyn ChatStore,
        identity: Arc<dyn IdentityProvider>,
        config: Arc<Config>,
        user_id: Uuid,
    ) -> AppResult<ChatListStream> {
        let feed = store.subscribe_conversations(user_id).await?;
        tracing::debug!(%user_id, "chat list stream opened");
        Ok(ChatListStream {
            feed,
            identity,
            config,
            user_id,
        })
    }
}

/// Live, enriched chat list. The first item is the initial snapshot.
pub struct ChatListStream {
    feed: ConversationFeed,
    identity: Arc<dyn IdentityProvider>,
    config: Arc<Config>,
    user_id: Uuid,
}

impl ChatListStream {
    /// Next enriched snapshot, or `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<Vec<ChatListEntry>> {
        let conversations = self.feed.recv().await?;
        Some(self.enrich(conversations).await)
    }

    pub async fn unsubscribe(&mut self) {
        self.feed.unsubscribe().await;
    }

    /// Batch enrichment: one profile fetch per distinct counterpart, then a
    /// lookup per conversation. A failed fetch degrades that entry to the
    /// placeholder identity.
    async fn enrich(&self, conversations: Vec<Conversation>) -> Vec<ChatListEntry> {
        let mut profiles = HashMap::new();
        for conversation in &conversations {
            if let Some(counterpart) = conversation.counterpart_of(self.user_id) {
                if !profiles.contains_key(&counterpart) {
                    let profile = match self.identity.fetch_user(counterpart).await {
                        Ok(profile) => Some(profile),
                        Err(e) => {
                            tracing::warn!(
                                counterpart = %counterpart,
                                error = %e,
                                "counterpart lookup failed, using placeholder"
                            );
                            None
                        }
                    };
                    profiles.insert(counterpart, profile);
                }
            }
        }

        conversations
            .into_iter()
            .map(|conversation| {
                let profile = conversation
                    .counterpart_of(self.user_id)
                    .and_then(|counterpart| profiles.get(&counterpart))
                    .and_then(|p| p.as_ref());

                let (name, avatar_ref) = match profile {
                    Some(p) => (
                        p.display_name.clone(),
                        p.avatar_ref
                            .clone()
                            .unwrap_or_else(|| self.config.default_avatar_ref.clone()),
                    ),
                    None => (
                        self.config.placeholder_display_name.clone(),
                        self.config.default_avatar_ref.clone(),
                    ),
                };

                ChatListEntry {
                    conversation,
                    name,
                    avatar_ref,
                }
            })
            .collect()
    }
}

/// Pure, synchronous chat-list filtering: case-insensitive substring match
/// against the enriched name. An empty term returns the list unchanged;
/// otherwise entries with an empty name are excluded.
pub fn filter_chats(entries: &[ChatListEntry], term: &str) -> Vec<ChatListEntry> {
    if term.is_empty() {
        return entries.to_vec();
    }

    let needle = term.to_lowercase();
    entries
        .iter()
        .filter(|entry| !entry.name.is_empty() && entry.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServerTimestamp;

    fn entry(name: &str) -> ChatListEntry {
        ChatListEntry {
            conversation: Conversation {
                id: Uuid::new_v4(),
                members: [Uuid::new_v4(), Uuid::new_v4()],
                created_at: ServerTimestamp::Pending,
                last_message_preview: String::new(),
            },
            name: name.to_string(),
            avatar_ref: "/profile-user.svg".to_string(),
        }
    }

    #[test]
    fn empty_term_returns_list_unchanged() {
        let entries = vec![entry("Ada"), entry(""), entry("Grace")];
        assert_eq!(filter_chats(&entries, "").len(), 3);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let entries = vec![entry("Ada Lovelace"), entry("Grace Hopper"), entry("")];

        let hits = filter_chats(&entries, "LOVE");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Ada Lovelace");

        // Entries without a name never match a non-empty term.
        assert!(filter_chats(&entries, "x").is_empty());
    }
}
