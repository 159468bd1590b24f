use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Stable, inspectable error kinds for the chat core.
///
/// Validation variants (`EmptyPayload`, `SelfChat`, `NotAParticipant`) are
/// always returned before any store mutation. `Transient` is the only
/// retryable kind; the retry decision belongs to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("not found")]
    NotFound,

    #[error("sender is not a participant of this conversation")]
    NotAParticipant,

    #[error("message has neither text nor attachment")]
    EmptyPayload,

    #[error("cannot start a conversation with yourself")]
    SelfChat,

    #[error("transient store error: {0}")]
    Transient(String),
}

impl AppError {
    /// Returns whether this error is retryable (e.g., a failed store round trip)
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }
}
