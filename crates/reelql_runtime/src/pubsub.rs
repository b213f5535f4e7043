//! In-process publish/subscribe channel feeding subscriptions.
//!
//! Each subscriber owns an unbounded FIFO queue. Delivery within one topic
//! is in subscriber registration order, and strictly FIFO per subscriber.
//! A publish with no subscribers is a no-op; nothing is buffered or
//! replayed for later subscribers.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

struct SubscriberHandle {
    id: u64,
    sender: mpsc::UnboundedSender<Value>,
    cancelled: Arc<AtomicBool>,
}

impl SubscriberHandle {
    fn is_live(&self) -> bool {
        !self.cancelled.load(Ordering::Acquire) && !self.sender.is_closed()
    }
}

/// A topic-keyed event channel.
#[derive(Clone)]
pub struct EventChannel {
    topics: Arc<RwLock<HashMap<String, Vec<SubscriberHandle>>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventChannel {
    /// Creates a new channel with no topics.
    pub fn new() -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Delivers `payload` to every live subscriber of `topic`, in
    /// registration order. Returns the number of subscribers reached.
    pub async fn publish(&self, topic: impl AsRef<str>, payload: Value) -> usize {
        let topic = topic.as_ref();
        let mut topics = self.topics.write().await;
        let Some(subscribers) = topics.get_mut(topic) else {
            return 0;
        };

        subscribers.retain(SubscriberHandle::is_live);

        let mut delivered = 0;
        for subscriber in subscribers.iter() {
            if subscriber.sender.send(payload.clone()).is_ok() {
                delivered += 1;
            }
        }

        if subscribers.is_empty() {
            topics.remove(topic);
        }
        debug!(topic, delivered, "published event");
        delivered
    }

    /// Registers a new subscriber on `topic`.
    pub async fn subscribe(&self, topic: impl Into<String>) -> Subscriber {
        let topic = topic.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut topics = self.topics.write().await;
        topics.entry(topic.clone()).or_default().push(SubscriberHandle {
            id,
            sender,
            cancelled: Arc::clone(&cancelled),
        });
        debug!(topic = %topic, id, "subscriber registered");

        Subscriber {
            id,
            topic,
            receiver,
            cancelled,
        }
    }

    /// Returns the number of live subscribers on `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        let topics = self.topics.read().await;
        topics
            .get(topic)
            .map_or(0, |subs| subs.iter().filter(|s| s.is_live()).count())
    }

    /// Returns the number of topics holding at least one handle.
    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel").finish_non_exhaustive()
    }
}

/// One subscriber's end of the channel: an ordered queue of payloads.
///
/// Dropping the subscriber cancels it; a cancelled subscriber never yields
/// another payload, including ones already queued.
pub struct Subscriber {
    id: u64,
    topic: String,
    receiver: mpsc::UnboundedReceiver<Value>,
    cancelled: Arc<AtomicBool>,
}

impl Subscriber {
    /// Receives the next payload, or `None` once cancelled.
    pub async fn recv(&mut self) -> Option<Value> {
        if self.cancelled.load(Ordering::Acquire) {
            return None;
        }
        self.receiver.recv().await
    }

    /// Cancels the subscription. Publishes from this point on skip this
    /// subscriber, and queued payloads are discarded.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.receiver.close();
    }

    /// The topic this subscriber is registered on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The channel-unique subscriber id, in registration order.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fifo_within_topic() {
        let channel = EventChannel::new();
        let mut sub = channel.subscribe("movieAdded").await;

        for i in 0..3 {
            channel.publish("movieAdded", json!({"seq": i})).await;
        }

        for i in 0..3 {
            assert_eq!(sub.recv().await, Some(json!({"seq": i})));
        }
    }

    #[tokio::test]
    async fn test_fan_out_in_registration_order() {
        let channel = EventChannel::new();
        let mut first = channel.subscribe("movieAdded").await;
        let mut second = channel.subscribe("movieAdded").await;
        assert!(first.id() < second.id());

        let delivered = channel.publish("movieAdded", json!("event")).await;
        assert_eq!(delivered, 2);

        assert_eq!(first.recv().await, Some(json!("event")));
        assert_eq!(second.recv().await, Some(json!("event")));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let channel = EventChannel::new();
        assert_eq!(channel.publish("movieAdded", json!("lost")).await, 0);

        // A later subscriber must not see the earlier publish.
        let mut sub = channel.subscribe("movieAdded").await;
        channel.publish("movieAdded", json!("fresh")).await;
        assert_eq!(sub.recv().await, Some(json!("fresh")));
    }

    #[tokio::test]
    async fn test_cancelled_subscriber_receives_nothing() {
        let channel = EventChannel::new();
        let mut sub = channel.subscribe("movieAdded").await;
        sub.cancel();

        assert_eq!(channel.publish("movieAdded", json!("event")).await, 0);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_cancel_discards_queued_payloads() {
        let channel = EventChannel::new();
        let mut sub = channel.subscribe("movieAdded").await;

        channel.publish("movieAdded", json!("queued")).await;
        sub.cancel();
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let channel = EventChannel::new();
        let mut movies = channel.subscribe("movieAdded").await;
        let mut actors = channel.subscribe("actorAdded").await;

        channel.publish("movieAdded", json!("venom")).await;
        channel.publish("actorAdded", json!("bruce")).await;

        assert_eq!(movies.recv().await, Some(json!("venom")));
        assert_eq!(actors.recv().await, Some(json!("bruce")));
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let channel = EventChannel::new();
        let sub = channel.subscribe("movieAdded").await;
        assert_eq!(channel.subscriber_count("movieAdded").await, 1);

        drop(sub);
        assert_eq!(channel.subscriber_count("movieAdded").await, 0);

        // The publish prunes the dead handle and drops the empty topic.
        channel.publish("movieAdded", json!("event")).await;
        assert_eq!(channel.topic_count().await, 0);
    }
}
