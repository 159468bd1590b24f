//! Identity Provider Adapter
//!
//! The chat core never owns user records; it reads the current user id and
//! display profiles through this seam. Core operations take explicit user
//! ids so they stay testable without a live provider; only the
//! [`crate::state::AppState`] facade consults `current_user_id`.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Display profile for one user, as served by the identity provider.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authenticated user, if any.
    async fn current_user_id(&self) -> Option<Uuid>;

    /// Fetch a user's current display profile. `Err(NotFound)` when the id
    /// has no matching record.
    async fn fetch_user(&self, user_id: Uuid) -> AppResult<UserProfile>;
}

/// In-memory identity provider for tests and embedding.
#[derive(Default)]
pub struct StaticIdentityProvider {
    current: RwLock<Option<Uuid>>,
    users: RwLock<HashMap<Uuid, UserProfile>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn set_current_user(&self, user_id: Option<Uuid>) {
        *self.current.write().await = user_id;
    }

    pub async fn insert_user(&self, user_id: Uuid, profile: UserProfile) {
        self.users.write().await.insert(user_id, profile);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn current_user_id(&self) -> Option<Uuid> {
        *self.current.read().await
    }

    async fn fetch_user(&self, user_id: Uuid) -> AppResult<UserProfile> {
        self.users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }
}
