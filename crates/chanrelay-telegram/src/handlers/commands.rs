use chanrelay_core::{
    domain::{Actor, ChatId},
    messaging::types::{CommandMessage, IncomingUpdate},
};

use crate::router::AppState;

pub async fn handle_command(
    state: &AppState,
    chat_id: ChatId,
    actor: Actor,
    name: String,
    args: String,
) {
    tracing::debug!(actor = %actor.label(), command = %name, "command received");
    state
        .relay
        .dispatch(IncomingUpdate::Command(CommandMessage {
            chat_id,
            actor,
            name,
            args,
        }))
        .await;
}
