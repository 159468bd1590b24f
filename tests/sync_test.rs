// Synchronizer properties: re-sorting against server timestamps, pending
// timestamp resolution, guaranteed silence after unsubscribe, and soft-fail
// enrichment.

use chat_sync_core::config::Config;
use chat_sync_core::identity::{StaticIdentityProvider, UserProfile};
use chat_sync_core::services::ConversationService;
use chat_sync_core::store::{ChatStore, MemoryStore, MessageDraft};
use chat_sync_core::sync::{ChatListSynchronizer, MessageStreamSynchronizer};
use chrono::{Duration, Utc};
use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

fn draft(conversation_id: Uuid, sender_id: Uuid, text: &str) -> MessageDraft {
    MessageDraft {
        conversation_id,
        sender_id,
        text: Some(text.to_string()),
        attachment_ref: None,
    }
}

async fn seeded(store: &MemoryStore) -> (Uuid, Uuid, Uuid) {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let id = ConversationService::start_conversation(store, a, b)
        .await
        .unwrap()
        .conversation_id();
    (id, a, b)
}

#[tokio::test]
async fn view_is_sorted_by_server_timestamp_not_arrival_order() {
    let store = MemoryStore::new();
    let (conversation_id, a, b) = seeded(&store).await;

    let mut stream = MessageStreamSynchronizer::subscribe(&store, conversation_id, a)
        .await
        .unwrap();
    assert!(stream.recv().await.unwrap().is_empty());

    // The server committed Bob's write with the earlier timestamp even
    // though it arrived second.
    let now = Utc::now();
    store
        .append_message_at(draft(conversation_id, a, "second"), now)
        .await
        .unwrap();
    store
        .append_message_at(
            draft(conversation_id, b, "first"),
            now - Duration::seconds(5),
        )
        .await
        .unwrap();

    stream.recv().await.unwrap();
    let view = stream.recv().await.unwrap();
    let texts: Vec<_> = view.iter().map(|m| m.text.as_deref().unwrap()).collect();
    assert_eq!(texts, ["first", "second"]);
}

#[tokio::test]
async fn pending_timestamps_sort_last_until_resolved() {
    let store = MemoryStore::new().with_pending_timestamps();
    let (conversation_id, a, b) = seeded(&store).await;

    let mut stream = MessageStreamSynchronizer::subscribe(&store, conversation_id, a)
        .await
        .unwrap();
    assert!(stream.recv().await.unwrap().is_empty());

    // One resolved message, then two still awaiting their server timestamp.
    store
        .append_message_at(draft(conversation_id, b, "settled"), Utc::now())
        .await
        .unwrap();
    store
        .append_message(draft(conversation_id, a, "optimistic-1"))
        .await
        .unwrap();
    store
        .append_message(draft(conversation_id, a, "optimistic-2"))
        .await
        .unwrap();

    stream.recv().await.unwrap();
    stream.recv().await.unwrap();
    let view = stream.recv().await.unwrap();
    let texts: Vec<_> = view.iter().map(|m| m.text.as_deref().unwrap()).collect();
    // Pending after resolved, relative arrival order kept.
    assert_eq!(texts, ["settled", "optimistic-1", "optimistic-2"]);
    assert!(view[1].created_at.is_pending());

    // Resolution triggers exactly one re-sorted emission.
    assert_eq!(store.resolve_timestamps(conversation_id).await, 2);
    let view = stream.recv().await.unwrap();
    let texts: Vec<_> = view.iter().map(|m| m.text.as_deref().unwrap()).collect();
    assert_eq!(texts, ["settled", "optimistic-1", "optimistic-2"]);
    assert!(view.iter().all(|m| !m.created_at.is_pending()));
}

#[tokio::test]
async fn no_update_fires_after_unsubscribe() {
    let store = MemoryStore::new();
    let (conversation_id, a, _) = seeded(&store).await;

    let mut stream = MessageStreamSynchronizer::subscribe(&store, conversation_id, a)
        .await
        .unwrap();
    assert!(stream.recv().await.unwrap().is_empty());

    stream.unsubscribe().await;
    store
        .append_message(draft(conversation_id, a, "late"))
        .await
        .unwrap();

    assert!(stream.recv().await.is_none());
}

#[tokio::test]
async fn denied_subscription_never_yields_updates() {
    let store = MemoryStore::new();
    let (conversation_id, _, _) = seeded(&store).await;

    let outsider = Uuid::new_v4();
    assert!(
        MessageStreamSynchronizer::subscribe(&store, conversation_id, outsider)
            .await
            .is_err()
    );
    assert!(
        MessageStreamSynchronizer::subscribe(&store, Uuid::new_v4(), outsider)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn message_stream_works_as_a_futures_stream() {
    let store = MemoryStore::new();
    let (conversation_id, a, _) = seeded(&store).await;

    let mut stream = MessageStreamSynchronizer::subscribe(&store, conversation_id, a)
        .await
        .unwrap();

    assert!(stream.next().await.unwrap().is_empty());
    store
        .append_message(draft(conversation_id, a, "streamed"))
        .await
        .unwrap();
    let view = stream.next().await.unwrap();
    assert_eq!(view[0].text.as_deref(), Some("streamed"));
}

#[tokio::test]
async fn unresolvable_counterpart_degrades_to_placeholder() {
    let store = MemoryStore::new();
    let identity = StaticIdentityProvider::new();
    let config = Arc::new(Config::default());

    let (_, a, b) = seeded(&store).await;
    // Only one counterpart is known to the identity provider.
    let c = Uuid::new_v4();
    ConversationService::start_conversation(&store, a, c)
        .await
        .unwrap();
    identity
        .insert_user(
            b,
            UserProfile {
                display_name: "Known".to_string(),
                avatar_ref: None,
            },
        )
        .await;

    let mut list = ChatListSynchronizer::subscribe(&store, identity, config, a)
        .await
        .unwrap();

    let mut entries = list.recv().await.unwrap();
    entries.sort_by(|x, y| x.name.cmp(&y.name));
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "Known");
    assert_eq!(entries[1].name, "Unknown User");
    assert_eq!(entries[1].avatar_ref, "/profile-user.svg");
}

#[tokio::test]
async fn chat_list_unsubscribe_is_final() {
    let store = MemoryStore::new();
    let identity = StaticIdentityProvider::new();
    let config = Arc::new(Config::default());
    let (_, a, _) = seeded(&store).await;

    let mut list = ChatListSynchronizer::subscribe(&store, identity, config, a)
        .await
        .unwrap();
    assert_eq!(list.recv().await.unwrap().len(), 1);

    list.unsubscribe().await;
    ConversationService::start_conversation(&store, a, Uuid::new_v4())
        .await
        .unwrap();
    assert!(list.recv().await.is_none());
}
