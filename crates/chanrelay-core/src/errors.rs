use std::path::PathBuf;

use crate::domain::ChatId;

/// Core error type for the relay.
///
/// Adapter crates should map their specific errors into this type so the core
/// can tell user-facing failures (denials, bad input) from transport failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to persist routing config to {path}: {reason}")]
    Persist { path: PathBuf, reason: String },

    #[error("delivery to {chat_id} failed: {reason}")]
    Delivery { chat_id: ChatId, reason: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
