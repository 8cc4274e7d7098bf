use std::sync::Arc;

use crate::{
    admin::AdminService,
    config::Config,
    dialog::DialogRegistry,
    domain::ChatId,
    forwarder::{ForwardOutcome, Forwarder},
    messaging::{port::MessageBus, types::IncomingUpdate},
    roles::RoleAuthority,
    routing::RoutingTable,
    store::ConfigStore,
    transform::TransformEngine,
};

/// Wires the routing table, admin surface and forwarder to one `MessageBus`.
pub struct Relay {
    routing: Arc<RoutingTable>,
    admin: AdminService,
    forwarder: Forwarder,
    bus: Arc<dyn MessageBus>,
}

impl Relay {
    pub fn new(
        routing: Arc<RoutingTable>,
        admin: AdminService,
        forwarder: Forwarder,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self {
            routing,
            admin,
            forwarder,
            bus,
        }
    }

    /// Build everything from process config, loading the persisted routing record.
    pub fn from_config(cfg: &Config, bus: Arc<dyn MessageBus>, bot_name: Option<String>) -> Self {
        let routing = Arc::new(RoutingTable::load(
            ConfigStore::new(cfg.routing_file.clone()),
            &cfg.super_admins,
        ));

        let mut admin = AdminService::new(
            routing.clone(),
            RoleAuthority::new(cfg.super_admins.iter().cloned()),
            DialogRegistry::new(cfg.dialog_timeout),
            bus.clone(),
        );
        if let Some(name) = bot_name {
            admin = admin.with_bot_name(name);
        }

        let forwarder = Forwarder::new(
            routing.clone(),
            TransformEngine::with_default_rules(cfg.transform_mode),
            bus.clone(),
            cfg.delivery_timeout,
        );

        Self::new(routing, admin, forwarder, bus)
    }

    pub fn routing(&self) -> &Arc<RoutingTable> {
        &self.routing
    }

    pub fn admin(&self) -> &AdminService {
        &self.admin
    }

    /// Handle one inbound update end to end (including the reply, if any).
    pub async fn dispatch(&self, update: IncomingUpdate) {
        match update {
            IncomingUpdate::Command(cmd) => {
                let reply = self
                    .admin
                    .handle_command(cmd.chat_id, &cmd.actor, &cmd.name, &cmd.args)
                    .await;
                self.reply(cmd.chat_id, &reply).await;
            }
            IncomingUpdate::Text(msg) => {
                if let Some(reply) = self
                    .admin
                    .handle_text(msg.chat_id, &msg.actor, &msg.text)
                    .await
                {
                    self.reply(msg.chat_id, &reply).await;
                }
            }
            IncomingUpdate::ChannelPost(post) => {
                let outcome = self.forwarder.handle_inbound(post.chat_id, &post.text).await;
                if let ForwardOutcome::Relayed(report) = outcome {
                    tracing::debug!(
                        origin = post.chat_id.0,
                        delivered = report.delivered.len(),
                        failed = report.failed.len(),
                        "channel post relayed"
                    );
                }
            }
        }
    }

    async fn reply(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.bus.send_text(chat_id, text).await {
            tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Actor,
        messaging::types::{ChannelPost, CommandMessage, TextMessage},
        transform::TransformMode,
        Result,
    };
    use async_trait::async_trait;
    use std::{sync::Mutex, time::Duration};

    #[derive(Default)]
    struct SpyBus {
        sends: Mutex<Vec<(ChatId, String)>>,
    }

    impl SpyBus {
        fn take(&self) -> Vec<(ChatId, String)> {
            std::mem::take(&mut *self.sends.lock().unwrap())
        }
    }

    #[async_trait]
    impl MessageBus for SpyBus {
        async fn resolve_display_name(&self, _chat_id: ChatId) -> Result<Option<String>> {
            Ok(None)
        }

        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
            self.sends.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    fn command(actor: &Actor, name: &str, args: &str) -> IncomingUpdate {
        IncomingUpdate::Command(CommandMessage {
            chat_id: ChatId(actor.user_id.0),
            actor: actor.clone(),
            name: name.to_string(),
            args: args.to_string(),
        })
    }

    fn text(actor: &Actor, text: &str) -> IncomingUpdate {
        IncomingUpdate::Text(TextMessage {
            chat_id: ChatId(actor.user_id.0),
            actor: actor.clone(),
            text: text.to_string(),
        })
    }

    fn post(chat_id: i64, text: &str) -> IncomingUpdate {
        IncomingUpdate::ChannelPost(ChannelPost {
            chat_id: ChatId(chat_id),
            text: text.to_string(),
        })
    }

    #[tokio::test]
    async fn configure_then_relay() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            bot_token: "t".to_string(),
            super_admins: vec!["root".to_string()],
            routing_file: dir.path().join("config.json"),
            delivery_timeout: Duration::from_secs(1),
            dialog_timeout: None,
            transform_mode: TransformMode::Replace,
            log_file: None,
        };
        let bus = Arc::new(SpyBus::default());
        let relay = Relay::from_config(&cfg, bus.clone(), Some("relay_bot".to_string()));
        let root = Actor::new(1, Some("root"));

        relay.dispatch(command(&root, "set_origin", "")).await;
        relay.dispatch(text(&root, "-100")).await;
        relay.dispatch(command(&root, "set_destination", "-200")).await;
        let replies = bus.take();
        assert_eq!(replies.len(), 3);
        assert!(replies.iter().all(|(chat, _)| *chat == ChatId(1)));
        assert_eq!(replies[1].1, "Origin channels set: Channel -100");

        // Plain text outside a dialog gets no reply.
        relay.dispatch(text(&root, "hello")).await;
        assert!(bus.take().is_empty());

        relay.dispatch(post(-100, "[Alpha] 引用了推文 x")).await;
        assert_eq!(
            bus.take(),
            vec![(ChatId(-200), "[Alpha] quoted a tweet x".to_string())]
        );

        relay.dispatch(post(-999, "[Alpha] 引用了推文 x")).await;
        relay.dispatch(command(&root, "pause", "")).await;
        relay.dispatch(post(-100, "[Alpha] 引用了推文 x")).await;
        assert_eq!(
            bus.take(),
            vec![(ChatId(1), "Message forwarding paused.".to_string())]
        );

        // Survives a restart (pause does not).
        let reloaded = Relay::from_config(&cfg, bus.clone(), None);
        let snap = reloaded.routing().snapshot().await;
        assert!(snap.origins.contains(&ChatId(-100)));
        assert!(snap.destinations.contains(&ChatId(-200)));
        assert!(!snap.paused);
    }
}
