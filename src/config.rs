use dotenvy::dotenv;
use std::env;

/// Runtime configuration for the chat core.
///
/// Everything is read from the environment with in-code defaults, so an
/// embedding application can tune behavior without recompiling.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of characters kept in a conversation's
    /// last-message preview.
    pub preview_max_chars: usize,
    /// Preview text used when a message carries only an attachment.
    pub attachment_marker: String,
    /// Display name attached to a conversation whose counterpart
    /// could not be resolved.
    pub placeholder_display_name: String,
    /// Avatar reference used when the counterpart has none.
    pub default_avatar_ref: String,
    /// Cap on the number of messages returned by a history fetch.
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preview_max_chars: 80,
            attachment_marker: "[attachment]".to_string(),
            placeholder_display_name: "Unknown User".to_string(),
            default_avatar_ref: "/profile-user.svg".to_string(),
            history_limit: 200,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let defaults = Config::default();

        Self {
            preview_max_chars: read_usize("CHAT_PREVIEW_MAX_CHARS", defaults.preview_max_chars),
            attachment_marker: env::var("CHAT_ATTACHMENT_MARKER")
                .unwrap_or(defaults.attachment_marker),
            placeholder_display_name: env::var("CHAT_PLACEHOLDER_DISPLAY_NAME")
                .unwrap_or(defaults.placeholder_display_name),
            default_avatar_ref: env::var("CHAT_DEFAULT_AVATAR_REF")
                .unwrap_or(defaults.default_avatar_ref),
            history_limit: read_usize("CHAT_HISTORY_LIMIT", defaults.history_limit),
        }
    }
}

fn read_usize(key: &str, default: usize) -> usize {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(%key, value = %raw, "invalid numeric config value, using default");
            default
        }),
        Err(_) => default,
    }
}
