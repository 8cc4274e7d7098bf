use std::{sync::Arc, time::Duration};

use tokio::time::timeout;

use crate::{
    domain::ChatId, errors::Error, messaging::port::MessageBus, routing::RoutingTable,
    transform::TransformEngine,
};

/// Why a post was (or was not) relayed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForwardOutcome {
    Paused,
    UnknownOrigin,
    NoDestinations,
    /// Missing marker, or no rule applied.
    NotEligible,
    Relayed(DeliveryReport),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<ChatId>,
    pub failed: Vec<(ChatId, String)>,
}

/// Routing gate + fan-out delivery for channel posts.
pub struct Forwarder {
    routing: Arc<RoutingTable>,
    engine: TransformEngine,
    bus: Arc<dyn MessageBus>,
    delivery_timeout: Duration,
}

impl Forwarder {
    pub fn new(
        routing: Arc<RoutingTable>,
        engine: TransformEngine,
        bus: Arc<dyn MessageBus>,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            routing,
            engine,
            bus,
            delivery_timeout,
        }
    }

    pub async fn handle_inbound(&self, origin: ChatId, text: &str) -> ForwardOutcome {
        let snapshot = self.routing.snapshot().await;
        if snapshot.paused {
            return ForwardOutcome::Paused;
        }
        if !snapshot.origins.contains(&origin) {
            return ForwardOutcome::UnknownOrigin;
        }
        if snapshot.destinations.is_empty() {
            return ForwardOutcome::NoDestinations;
        }
        let Some(out) = self.engine.transform(text) else {
            return ForwardOutcome::NotEligible;
        };

        let text: Arc<str> = Arc::from(out);
        let mut pending = Vec::with_capacity(snapshot.destinations.len());
        for dest in snapshot.destinations {
            let bus = self.bus.clone();
            let text = text.clone();
            let limit = self.delivery_timeout;
            let handle = tokio::spawn(async move {
                match timeout(limit, bus.send_text(dest, &text)).await {
                    Ok(res) => res,
                    Err(_) => Err(Error::Delivery {
                        chat_id: dest,
                        reason: format!("timed out after {}ms", limit.as_millis()),
                    }),
                }
            });
            pending.push((dest, handle));
        }

        let mut report = DeliveryReport::default();
        for (dest, handle) in pending {
            let reason = match handle.await {
                Ok(Ok(())) => {
                    tracing::info!(origin = origin.0, destination = dest.0, "forwarded message");
                    report.delivered.push(dest);
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) => format!("delivery task failed: {e}"),
            };
            tracing::error!(
                origin = origin.0,
                destination = dest.0,
                error = %reason,
                "failed to forward message"
            );
            report.failed.push((dest, reason));
        }

        ForwardOutcome::Relayed(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        routing::RoutingConfig,
        store::ConfigStore,
        transform::TransformMode,
        Result,
    };
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SpyBus {
        sends: Mutex<Vec<(ChatId, String)>>,
        failing: HashSet<ChatId>,
        stalled: HashSet<ChatId>,
    }

    impl SpyBus {
        fn sent(&self) -> Vec<(ChatId, String)> {
            self.sends.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageBus for SpyBus {
        async fn resolve_display_name(&self, _chat_id: ChatId) -> Result<Option<String>> {
            Ok(None)
        }

        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
            if self.stalled.contains(&chat_id) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.failing.contains(&chat_id) {
                return Err(Error::External("chat not found".to_string()));
            }
            self.sends.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    fn routing(origins: &[i64], destinations: &[i64]) -> (tempfile::TempDir, Arc<RoutingTable>) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RoutingConfig {
            origins: origins.iter().copied().map(ChatId).collect(),
            destinations: destinations.iter().copied().map(ChatId).collect(),
            ..RoutingConfig::default()
        };
        let table = RoutingTable::new(cfg, ConfigStore::new(dir.path().join("c.json")), Vec::new());
        (dir, Arc::new(table))
    }

    fn forwarder(table: Arc<RoutingTable>, bus: Arc<SpyBus>) -> Forwarder {
        Forwarder::new(
            table,
            TransformEngine::with_default_rules(TransformMode::Replace),
            bus,
            Duration::from_millis(200),
        )
    }

    const POST: &str = "[Alpha] 发布新推文 hello";

    #[tokio::test]
    async fn relays_to_every_destination() {
        let (_dir, table) = routing(&[-1], &[-10, -20]);
        let bus = Arc::new(SpyBus::default());
        let fwd = forwarder(table, bus.clone());

        let report = match fwd.handle_inbound(ChatId(-1), POST).await {
            ForwardOutcome::Relayed(report) => report,
            other => panic!("expected relay, got {other:?}"),
        };
        assert_eq!(report.delivered, vec![ChatId(-20), ChatId(-10)]);
        assert!(report.failed.is_empty());

        let sent = bus.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent
            .iter()
            .all(|(_, text)| text == "[Alpha] posted a new tweet hello"));
    }

    #[tokio::test]
    async fn gates_never_reach_the_bus() {
        let bus = Arc::new(SpyBus::default());

        let (_d1, table) = routing(&[-1], &[-10]);
        let fwd = forwarder(table.clone(), bus.clone());
        assert_eq!(
            fwd.handle_inbound(ChatId(-2), POST).await,
            ForwardOutcome::UnknownOrigin
        );
        assert_eq!(
            fwd.handle_inbound(ChatId(-1), "no marker").await,
            ForwardOutcome::NotEligible
        );
        table.set_paused(true, |_| Ok(())).await.unwrap();
        assert_eq!(fwd.handle_inbound(ChatId(-1), POST).await, ForwardOutcome::Paused);

        let (_d2, empty) = routing(&[-1], &[]);
        let fwd = forwarder(empty, bus.clone());
        assert_eq!(
            fwd.handle_inbound(ChatId(-1), POST).await,
            ForwardOutcome::NoDestinations
        );

        assert!(bus.sent().is_empty());
    }

    #[tokio::test]
    async fn one_failing_destination_does_not_block_the_others() {
        let (_dir, table) = routing(&[-1], &[-10, -20, -30]);
        let bus = Arc::new(SpyBus {
            failing: [ChatId(-20)].into_iter().collect(),
            ..SpyBus::default()
        });
        let fwd = forwarder(table, bus.clone());

        let ForwardOutcome::Relayed(report) = fwd.handle_inbound(ChatId(-1), POST).await else {
            panic!("expected relay");
        };
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, ChatId(-20));

        let mut targets: Vec<ChatId> = bus.sent().into_iter().map(|(c, _)| c).collect();
        targets.sort();
        assert_eq!(targets, vec![ChatId(-30), ChatId(-10)]);
    }

    #[tokio::test]
    async fn stalled_destination_times_out_independently() {
        let (_dir, table) = routing(&[-1], &[-10, -20]);
        let bus = Arc::new(SpyBus {
            stalled: [ChatId(-10)].into_iter().collect(),
            ..SpyBus::default()
        });
        let fwd = forwarder(table, bus.clone());

        let ForwardOutcome::Relayed(report) = fwd.handle_inbound(ChatId(-1), POST).await else {
            panic!("expected relay");
        };
        assert_eq!(report.delivered, vec![ChatId(-20)]);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("timed out"));
    }
}
