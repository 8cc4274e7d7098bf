use chanrelay_core::{
    domain::{Actor, ChatId},
    messaging::types::{IncomingUpdate, TextMessage},
};

use crate::router::AppState;

/// Plain text is only meaningful as the reply to a pending dialog; the core
/// ignores it otherwise.
pub async fn handle_text(state: &AppState, chat_id: ChatId, actor: Actor, text: &str) {
    if text.trim().is_empty() {
        return;
    }

    state
        .relay
        .dispatch(IncomingUpdate::Text(TextMessage {
            chat_id,
            actor,
            text: text.to_string(),
        }))
        .await;
}
