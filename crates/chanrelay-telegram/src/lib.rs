//! Telegram adapter (teloxide).
//!
//! This crate implements the `chanrelay-core` MessageBus over the Telegram Bot API
//! and feeds updates into the core relay.

use async_trait::async_trait;

use teloxide::prelude::*;

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use chanrelay_core::{domain::ChatId, errors::Error, messaging::port::MessageBus, Result};

#[derive(Clone)]
pub struct TelegramBus {
    bot: Bot,
}

impl TelegramBus {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }
}

/// Flood-control retries for chat lookups. Sends are never retried: a failed
/// delivery is reported to the caller and not repeated.
const LOOKUP_RETRIES: usize = 1;
const SEND_RETRIES: usize = 0;

/// Run `op`, honouring up to `max_retries` Telegram `RetryAfter` responses.
async fn with_retry<T, Fut>(max_retries: usize, mut op: impl FnMut() -> Fut) -> Result<T>
where
    Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
    Fut::IntoFuture: Send,
{
    let mut attempts = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => match e {
                teloxide::RequestError::RetryAfter(d) if attempts < max_retries => {
                    attempts += 1;
                    sleep(d).await;
                    continue;
                }
                other => return Err(TelegramBus::map_err(other)),
            },
        }
    }
}

#[async_trait]
impl MessageBus for TelegramBus {
    async fn resolve_display_name(&self, chat_id: ChatId) -> Result<Option<String>> {
        let chat =
            with_retry(LOOKUP_RETRIES, || self.bot.get_chat(Self::tg_chat(chat_id))).await?;
        Ok(chat.title().map(|t| t.to_string()))
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        with_retry(SEND_RETRIES, || {
            self.bot.send_message(Self::tg_chat(chat_id), text.to_string())
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    fn flood_then_ok(
        calls: &AtomicUsize,
    ) -> std::future::Ready<std::result::Result<u8, teloxide::RequestError>> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(if n == 0 {
            Err(teloxide::RequestError::RetryAfter(Duration::ZERO))
        } else {
            Ok(7)
        })
    }

    #[tokio::test]
    async fn sends_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let res = with_retry(SEND_RETRIES, || flood_then_ok(&calls)).await;
        assert!(matches!(res, Err(Error::External(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookups_retry_once_after_flood_control() {
        let calls = AtomicUsize::new(0);
        let res = with_retry(LOOKUP_RETRIES, || flood_then_ok(&calls)).await;
        assert_eq!(res.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
