use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User record as issued by the identity provider.
///
/// The core never writes these; identity is stable, display fields are not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub avatar_ref: Option<String>,
}
