pub mod conversation_service;
pub mod message_service;

pub use conversation_service::{ConversationService, StartConversation};
pub use message_service::{MessageService, OutgoingMessage};
