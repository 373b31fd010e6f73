use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, trace};

use firetest_types::DbPath;

use crate::event::ChangeEvent;

/// How long a single subscriber may take to accept an event.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_millis(250);

/// Rule for deciding whether a subscription prefix covers a changed path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixMatch {
    /// Compare whole segments: `foo` covers `foo` and `foo/bar`, not `foobar`.
    #[default]
    Segment,
    /// Plain string prefix: `foo` also covers `foobar/baz`.
    Raw,
}

impl PrefixMatch {
    /// Returns `true` if `prefix` covers `path`. The empty prefix covers
    /// every path.
    pub fn matches(&self, prefix: &str, path: &str) -> bool {
        match self {
            Self::Raw => path.starts_with(prefix),
            Self::Segment => {
                let mut path_segments = path.split('/').filter(|s| !s.is_empty());
                prefix
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .all(|want| path_segments.next() == Some(want))
            }
        }
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

/// Configuration for the [`ChangeNotifier`].
#[derive(Clone, Debug)]
pub struct NotifierConfig {
    /// Per-subscriber bound on a single delivery.
    pub delivery_timeout: Duration,
    /// Capacity of each subscriber channel (at least 1).
    pub channel_capacity: usize,
    /// Prefix matching rule.
    pub prefix_match: PrefixMatch,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            channel_capacity: 1,
            prefix_match: PrefixMatch::Segment,
        }
    }
}

/// A live registration: the receiving end of one delivery channel.
///
/// Hand it back to [`ChangeNotifier::unwatch`] to close it. Dropping it
/// also closes the channel; the notifier notices on the next delivery and
/// discards the registration.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    prefix: DbPath,
    receiver: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn prefix(&self) -> &DbPath {
        &self.prefix
    }

    /// Wait for the next event. `None` once the channel is closed and drained.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    /// Take an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Outcome counts for one broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub timed_out: usize,
    pub closed: usize,
}

impl DeliveryReport {
    /// Subscribers whose prefix covered the event.
    pub fn matched(&self) -> usize {
        self.delivered + self.timed_out + self.closed
    }

    fn record(&mut self, outcome: Delivery) {
        match outcome {
            Delivery::Delivered => self.delivered += 1,
            Delivery::TimedOut => self.timed_out += 1,
            Delivery::Closed => self.closed += 1,
        }
    }
}

enum Delivery {
    Delivered,
    TimedOut,
    Closed,
}

/// Internal subscriber: an id paired with the sending end of its channel.
struct Subscriber {
    id: SubscriptionId,
    sender: mpsc::Sender<ChangeEvent>,
}

type Registry = HashMap<String, Vec<Subscriber>>;

/// Fan-out of change events to prefix subscriptions.
///
/// The registry sits behind one reader/writer lock. Broadcasts hold the read
/// side for the whole delivery, so concurrent broadcasts interleave while
/// `watch` and `unwatch` wait for them. Delivery is at most once: each
/// matching subscriber gets `delivery_timeout` to accept the event, all in
/// parallel, and a subscriber that misses the window simply misses the event.
pub struct ChangeNotifier {
    registry: RwLock<Registry>,
    config: NotifierConfig,
    next_id: AtomicU64,
    /// Runtime captured by the first `watch`; detached broadcasts run here.
    runtime: OnceLock<Handle>,
}

impl ChangeNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
            config,
            next_id: AtomicU64::new(1),
            runtime: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    /// Register a new subscription under `prefix`.
    pub async fn watch(&self, prefix: DbPath) -> Subscription {
        if self.runtime.get().is_none() {
            if let Ok(handle) = Handle::try_current() {
                let _ = self.runtime.set(handle);
            }
        }

        let (sender, receiver) = mpsc::channel(self.config.channel_capacity.max(1));
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut registry = self.registry.write().await;
        prune_closed(&mut registry);
        registry
            .entry(prefix.as_str().to_string())
            .or_default()
            .push(Subscriber { id, sender });

        debug!(%id, prefix = %prefix, "subscription registered");
        Subscription {
            id,
            prefix,
            receiver,
        }
    }

    /// Remove a subscription and close its channel.
    ///
    /// Both happen under the write lock, so no broadcast can be mid-delivery
    /// to it. Returns `false` if it was already gone.
    pub async fn unwatch(&self, subscription: Subscription) -> bool {
        let Subscription {
            id,
            prefix,
            mut receiver,
        } = subscription;

        let mut registry = self.registry.write().await;
        let mut removed = false;
        if let Some(subscribers) = registry.get_mut(prefix.as_str()) {
            let before = subscribers.len();
            subscribers.retain(|s| s.id != id);
            removed = subscribers.len() != before;
        }
        registry.retain(|_, subscribers| !subscribers.is_empty());
        receiver.close();
        drop(registry);

        debug!(%id, prefix = %prefix, removed, "subscription removed");
        removed
    }

    /// Broadcast `event` on a detached task and return immediately.
    ///
    /// Nothing is spawned until some subscription has been registered.
    pub fn notify(self: &Arc<Self>, event: ChangeEvent) {
        let Some(runtime) = self.runtime.get() else {
            trace!(path = %event.path, "no subscriptions yet; change not broadcast");
            return;
        };
        let notifier = Arc::clone(self);
        runtime.spawn(async move {
            notifier.broadcast(&event).await;
        });
    }

    /// Deliver `event` to every subscriber whose prefix covers its path and
    /// wait for all deliveries to finish or time out.
    pub async fn broadcast(&self, event: &ChangeEvent) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        {
            let registry = self.registry.read().await;
            let deliveries = registry
                .iter()
                .filter(|(prefix, _)| self.config.prefix_match.matches(prefix, event.path.as_str()))
                .flat_map(|(_, subscribers)| subscribers.iter())
                .map(|subscriber| self.deliver(subscriber, event.clone()));
            for outcome in join_all(deliveries).await {
                report.record(outcome);
            }
        }

        if report.closed > 0 {
            prune_closed(&mut *self.registry.write().await);
        }

        debug!(
            kind = %event.kind,
            path = %event.path,
            delivered = report.delivered,
            timed_out = report.timed_out,
            closed = report.closed,
            "change broadcast"
        );
        report
    }

    async fn deliver(&self, subscriber: &Subscriber, event: ChangeEvent) -> Delivery {
        match subscriber
            .sender
            .send_timeout(event, self.config.delivery_timeout)
            .await
        {
            Ok(()) => Delivery::Delivered,
            Err(SendTimeoutError::Timeout(_)) => {
                debug!(id = %subscriber.id, "delivery abandoned after timeout");
                Delivery::TimedOut
            }
            Err(SendTimeoutError::Closed(_)) => {
                trace!(id = %subscriber.id, "subscriber channel closed");
                Delivery::Closed
            }
        }
    }

    /// Number of registered subscriptions across all prefixes.
    pub async fn subscriber_count(&self) -> usize {
        self.registry.read().await.values().map(Vec::len).sum()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(NotifierConfig::default())
    }
}

fn prune_closed(registry: &mut Registry) {
    for subscribers in registry.values_mut() {
        subscribers.retain(|s| !s.sender.is_closed());
    }
    registry.retain(|_, subscribers| !subscribers.is_empty());
}
