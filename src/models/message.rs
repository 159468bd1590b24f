use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// A store-assigned commit timestamp.
///
/// `Pending` models a just-written message whose server timestamp has not
/// been resolved yet (the store's latency compensation). Pending values sort
/// after every resolved value; relative order among pending messages is
/// carried by the per-conversation sequence number.
///
/// On the wire this is a nullable RFC 3339 timestamp, null meaning pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "Option<DateTime<Utc>>",
    into = "Option<DateTime<Utc>>"
)]
pub enum ServerTimestamp {
    Resolved(DateTime<Utc>),
    Pending,
}

impl ServerTimestamp {
    pub fn is_pending(&self) -> bool {
        matches!(self, ServerTimestamp::Pending)
    }

    pub fn resolved(&self) -> Option<DateTime<Utc>> {
        match self {
            ServerTimestamp::Resolved(at) => Some(*at),
            ServerTimestamp::Pending => None,
        }
    }
}

impl From<Option<DateTime<Utc>>> for ServerTimestamp {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        match value {
            Some(at) => ServerTimestamp::Resolved(at),
            None => ServerTimestamp::Pending,
        }
    }
}

impl From<ServerTimestamp> for Option<DateTime<Utc>> {
    fn from(value: ServerTimestamp) -> Self {
        value.resolved()
    }
}

impl Ord for ServerTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ServerTimestamp::Resolved(a), ServerTimestamp::Resolved(b)) => a.cmp(b),
            (ServerTimestamp::Resolved(_), ServerTimestamp::Pending) => Ordering::Less,
            (ServerTimestamp::Pending, ServerTimestamp::Resolved(_)) => Ordering::Greater,
            (ServerTimestamp::Pending, ServerTimestamp::Pending) => Ordering::Equal,
        }
    }
}

impl PartialOrd for ServerTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Message record. Immutable once written; at least one of `text` /
/// `attachment_ref` is present (enforced by the composer before the write).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub text: Option<String>,
    pub attachment_ref: Option<String>,
    /// Store-assigned per-conversation arrival counter. Breaks timestamp
    /// ties and orders messages whose timestamp is still pending.
    pub sequence_number: i64,
    pub created_at: ServerTimestamp,
}

impl Message {
    /// Ordering key for the live view: server timestamp first (pending
    /// last), arrival order second.
    pub fn sort_key(&self) -> (ServerTimestamp, i64) {
        (self.created_at, self.sequence_number)
    }
}
