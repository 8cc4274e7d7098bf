//! Telegram update handlers.
//!
//! Each handler is a thin adapter that turns a teloxide `Message` into a core
//! `IncomingUpdate` and hands it to the relay.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use chanrelay_core::{
    domain::{Actor, ChatId},
    messaging::types::{parse_command, ChannelPost, IncomingUpdate},
};

use crate::router::AppState;

mod commands;
mod text;

/// Messages from users (private chats and groups): admin commands and dialog replies.
pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(body) = msg.text() else {
        return Ok(());
    };
    let Some(user) = msg.from() else {
        return Ok(());
    };

    let actor = Actor::new(user.id.0 as i64, user.username.as_deref());
    let chat_id = ChatId(msg.chat.id.0);

    // Keep each actor's commands in arrival order.
    let _guard = state.actor_locks.lock_actor(actor.user_id.0).await;

    match parse_command(body) {
        Some((name, args)) => commands::handle_command(&state, chat_id, actor, name, args).await,
        None => text::handle_text(&state, chat_id, actor, body).await,
    }
    Ok(())
}

/// Posts published in channels the bot is a member of.
pub async fn handle_channel_post(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(body) = msg.text() else {
        return Ok(());
    };
    if parse_command(body).is_some() {
        return Ok(());
    }

    state
        .relay
        .dispatch(IncomingUpdate::ChannelPost(ChannelPost {
            chat_id: ChatId(msg.chat.id.0),
            text: body.to_string(),
        }))
        .await;
    Ok(())
}
