use crate::models::message::ServerTimestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A two-party conversation.
///
/// Invariant: `members` holds exactly two distinct user ids, and at most one
/// conversation exists per unordered member pair (see
/// [`Conversation::direct_id`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub members: [Uuid; 2],
    pub created_at: ServerTimestamp,
    pub last_message_preview: String,
}

impl Conversation {
    /// Deterministic id for the direct conversation between two users:
    /// a UUIDv5 over the sorted member pair. Two clients racing to create
    /// the same thread derive the same id and collide in the store instead
    /// of producing parallel threads.
    pub fn direct_id(a: Uuid, b: Uuid) -> Uuid {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let mut name = [0u8; 32];
        name[..16].copy_from_slice(lo.as_bytes());
        name[16..].copy_from_slice(hi.as_bytes());
        Uuid::new_v5(&Uuid::NAMESPACE_OID, &name)
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    /// The other member relative to `user_id`, if `user_id` is a member.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        match self.members {
            [a, b] if a == user_id => Some(b),
            [a, b] if b == user_id => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_id_ignores_member_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(Conversation::direct_id(a, b), Conversation::direct_id(b, a));
        assert_ne!(
            Conversation::direct_id(a, b),
            Conversation::direct_id(a, Uuid::new_v4())
        );
    }

    #[test]
    fn counterpart_resolution() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let conversation = Conversation {
            id: Conversation::direct_id(a, b),
            members: [a, b],
            created_at: ServerTimestamp::Pending,
            last_message_preview: String::new(),
        };

        assert_eq!(conversation.counterpart_of(a), Some(b));
        assert_eq!(conversation.counterpart_of(b), Some(a));
        assert_eq!(conversation.counterpart_of(Uuid::new_v4()), None);
    }
}
