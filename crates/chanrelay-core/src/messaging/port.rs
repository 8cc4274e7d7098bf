use async_trait::async_trait;

use crate::{domain::ChatId, Result};

/// Cross-messenger port consumed by the relay core.
///
/// Telegram is the only implementation; the core never talks to the Bot API
/// directly, which keeps the routing engine testable with a fake bus.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Look up a chat's title. `Ok(None)` means the chat exists but has no title.
    async fn resolve_display_name(&self, chat_id: ChatId) -> Result<Option<String>>;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;
}

/// Best-effort display name with a stable `Channel <id>` fallback.
pub async fn display_name(bus: &dyn MessageBus, chat_id: ChatId) -> String {
    match bus.resolve_display_name(chat_id).await {
        Ok(Some(title)) if !title.trim().is_empty() => title,
        Ok(_) => fallback_name(chat_id),
        Err(e) => {
            tracing::error!(chat_id = chat_id.0, error = %e, "failed to resolve chat name");
            fallback_name(chat_id)
        }
    }
}

pub fn fallback_name(chat_id: ChatId) -> String {
    format!("Channel {chat_id}")
}
