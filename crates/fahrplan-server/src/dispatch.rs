//! Best-effort delivery fan-out.
//!
//! Every announcement and change notice for a session goes to the broadcast
//! destination and to every live target of every account subscribed to that
//! session. Deliveries run concurrently and fail independently.

use std::collections::HashSet;
use std::sync::Arc;

use fahrplan_core::{Message, SessionId};
use futures_util::future::join_all;
use tracing::{debug, trace, warn};

use crate::sink::{Destination, NotificationSink};
use crate::subscriptions::{Presence, SubscriptionStore};

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Resolves destinations for a session and delivers to all of them.
pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
    subscriptions: Arc<dyn SubscriptionStore>,
    presence: Arc<dyn Presence>,
    broadcast: String,
}

impl Dispatcher {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        subscriptions: Arc<dyn SubscriptionStore>,
        presence: Arc<dyn Presence>,
        broadcast: impl Into<String>,
    ) -> Self {
        Self {
            sink,
            subscriptions,
            presence,
            broadcast: broadcast.into(),
        }
    }

    /// Name of the broadcast destination.
    pub fn broadcast(&self) -> &str {
        &self.broadcast
    }

    /// Broadcast first, then each live target of each subscriber.
    ///
    /// A failing subscription lookup counts as no subscribers. A target
    /// shared by several accounts is listed once.
    pub async fn destinations_for(&self, session_id: SessionId) -> Vec<Destination> {
        let mut destinations = vec![Destination::Broadcast(self.broadcast.clone())];

        let accounts = match self.subscriptions.accounts_subscribed_to(session_id).await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(session_id, error = %e, "Subscription lookup failed, treating as no subscribers");
                return destinations;
            }
        };

        let mut seen = HashSet::new();
        for account in accounts {
            let targets = self.presence.targets_for(&account);
            if targets.is_empty() {
                trace!(session_id, account = %account, "Subscriber has no live targets");
                continue;
            }
            for target in targets {
                if seen.insert(target.clone()) {
                    destinations.push(Destination::Target(target));
                }
            }
        }

        destinations
    }

    /// Delivers `message` for `session_id` to every destination.
    pub async fn deliver(&self, session_id: SessionId, message: &Message) -> DeliveryReport {
        let destinations = self.destinations_for(session_id).await;

        let results = join_all(
            destinations
                .iter()
                .map(|destination| self.sink.deliver(destination, message)),
        )
        .await;

        let mut report = DeliveryReport::default();
        for result in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        session_id,
                        sink = self.sink.name(),
                        destination = %e.destination,
                        error = %e.message,
                        "Delivery failed"
                    );
                    report.failed += 1;
                }
            }
        }

        debug!(
            session_id,
            kind = message.kind.as_str(),
            delivered = report.delivered,
            failed = report.failed,
            "Fan-out finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::testing::RecordingSink;
    use crate::subscriptions::testing::BrokenStore;
    use crate::subscriptions::{MemorySubscriptions, StaticPresence};
    use fahrplan_core::{MessageKind, Urgency};

    const CHANNEL: &str = "#33c3-schedule";

    fn message() -> Message {
        Message {
            kind: MessageKind::Start,
            urgency: Urgency::Critical,
            text: "NOW lol".to_string(),
        }
    }

    fn setup(sink: Arc<RecordingSink>) -> Dispatcher {
        let subscriptions = Arc::new(MemorySubscriptions::new());
        subscriptions.subscribe("ada", 123);
        subscriptions.subscribe("grace", 123);
        subscriptions.subscribe("linus", 123);

        let presence = Arc::new(StaticPresence::new());
        presence.connect("ada", "ada");
        presence.connect("ada", "ada_phone");
        presence.connect("grace", "grace");
        // linus is subscribed but not connected

        Dispatcher::new(sink, subscriptions, presence, CHANNEL)
    }

    #[tokio::test]
    async fn fans_out_to_broadcast_and_live_targets() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = setup(sink.clone());

        let report = dispatcher.deliver(123, &message()).await;
        assert_eq!(report, DeliveryReport { delivered: 4, failed: 0 });

        let destinations: Vec<_> = sink.delivered().into_iter().map(|(d, _)| d).collect();
        assert_eq!(
            destinations,
            vec![
                Destination::Broadcast(CHANNEL.into()),
                Destination::Target("ada".into()),
                Destination::Target("ada_phone".into()),
                Destination::Target("grace".into()),
            ]
        );
    }

    #[tokio::test]
    async fn unsubscribed_session_only_broadcasts() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = setup(sink.clone());

        let report = dispatcher.deliver(999, &message()).await;
        assert_eq!(report.attempted(), 1);
        assert_eq!(sink.texts_for(&Destination::Broadcast(CHANNEL.into())), vec!["NOW lol"]);
    }

    #[tokio::test]
    async fn failing_target_does_not_stop_others() {
        let sink = Arc::new(RecordingSink::failing(&["ada_phone"]));
        let dispatcher = setup(sink.clone());

        let report = dispatcher.deliver(123, &message()).await;
        assert_eq!(report, DeliveryReport { delivered: 3, failed: 1 });
        assert_eq!(sink.texts_for(&Destination::Target("grace".into())).len(), 1);
    }

    #[tokio::test]
    async fn broken_store_means_no_subscribers() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(
            sink.clone(),
            Arc::new(BrokenStore),
            Arc::new(StaticPresence::new()),
            CHANNEL,
        );

        let report = dispatcher.deliver(123, &message()).await;
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 0 });
    }

    #[tokio::test]
    async fn shared_target_is_delivered_once() {
        let subscriptions = Arc::new(MemorySubscriptions::new());
        subscriptions.subscribe("ada", 1);
        subscriptions.subscribe("ada-alt", 1);
        let presence = Arc::new(StaticPresence::new());
        presence.connect("ada", "ada");
        presence.connect("ada-alt", "ada");

        let dispatcher = Dispatcher::new(
            Arc::new(RecordingSink::default()),
            subscriptions,
            presence,
            CHANNEL,
        );
        assert_eq!(dispatcher.destinations_for(1).await.len(), 2);
    }
}
