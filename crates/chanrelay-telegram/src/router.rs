use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};

use chanrelay_core::{config::Config, messaging::port::MessageBus, relay::Relay};

use crate::handlers;
use crate::TelegramBus;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub actor_locks: Arc<ActorLocks>,
}

/// Serialises each user's own updates so their commands apply in order.
#[derive(Default)]
pub struct ActorLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ActorLocks {
    pub async fn lock_actor(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    let bot_name = match bot.get_me().await {
        Ok(me) => {
            tracing::info!("chanrelay started: @{}", me.username());
            Some(me.username().to_string())
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not fetch bot identity");
            None
        }
    };

    let bus: Arc<dyn MessageBus> = Arc::new(TelegramBus::new(bot.clone()));
    let relay = Arc::new(Relay::from_config(&cfg, bus, bot_name));

    let snapshot = relay.routing().snapshot().await;
    tracing::info!(
        origins = snapshot.origins.len(),
        destinations = snapshot.destinations.len(),
        admins = snapshot.admins.len(),
        config = %relay.routing().store().path().display(),
        "routing config loaded"
    );

    // Abandoned dialogs are also dropped lazily; this just bounds the map.
    if let Some(every) = cfg.dialog_timeout {
        let relay = relay.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                let purged = relay.admin().dialogs().purge_expired().await;
                if purged > 0 {
                    tracing::info!(purged, "expired dialogs dropped");
                }
            }
        });
    }

    let state = Arc::new(AppState {
        relay,
        actor_locks: Arc::new(ActorLocks::default()),
    });

    let handler = dptree::entry()
        .branch(Update::filter_channel_post().endpoint(handlers::handle_channel_post))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    tracing::info!("bot polling started");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
