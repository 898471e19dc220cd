//! # Transport Port and In-Memory Broker
//!
//! Defines the publishing side of the transport and a broker that routes
//! messages between in-process endpoints.

use crate::events::{InboundMessage, TopicFilter, TransportEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, warn};

/// Errors from transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The endpoint was closed and will never reconnect.
    #[error("Transport closed")]
    Closed,

    /// The endpoint is currently disconnected.
    #[error("Transport not connected")]
    NotConnected,

    /// The broker refused the publish.
    #[error("Publish failed: {0}")]
    Publish(String),
}

/// The narrow pub/sub interface the session layer depends on.
///
/// Implementations deliver inbound items through `next_event` only; the
/// caller drains it from a single task so messages are handled in order.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Subscribe to a (scoped) topic for the current connection.
    async fn subscribe(&self, topic: &str) -> Result<(), TransportError>;

    /// Publish a payload on a (scoped) topic.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Wait for the next transport event.
    ///
    /// Returns `None` once the transport is closed for good.
    async fn next_event(&self) -> Option<TransportEvent>;
}

/// Per-client routing state.
struct ClientSlot {
    inbox: mpsc::UnboundedSender<TransportEvent>,
    topics: HashSet<String>,
    connected: bool,
}

/// In-memory topic broker.
///
/// Routes each published message to every connected endpoint subscribed to
/// the exact topic, and to every observer whose filter matches. Endpoints
/// lose their subscriptions on disconnect, as with a clean broker session.
pub struct InMemoryBroker {
    /// Fan-out to observers.
    observers: broadcast::Sender<InboundMessage>,

    /// Connected endpoints by client id.
    clients: RwLock<HashMap<String, ClientSlot>>,

    /// Total messages routed.
    messages_published: AtomicU64,

    /// Observer channel capacity.
    capacity: usize,
}

impl InMemoryBroker {
    /// Create a broker with default observer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a broker with the given observer capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (observers, _) = broadcast::channel(capacity);
        Self {
            observers,
            clients: RwLock::new(HashMap::new()),
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Attach a new endpoint for `client_id`.
    ///
    /// The endpoint's first event is `Connected`. Attaching an id that is
    /// already attached replaces the previous endpoint.
    #[must_use]
    pub fn connect(self: &Arc<Self>, client_id: &str) -> InMemoryTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(TransportEvent::Connected);

        if let Ok(mut clients) = self.clients.write() {
            clients.insert(
                client_id.to_string(),
                ClientSlot {
                    inbox: tx,
                    topics: HashSet::new(),
                    connected: true,
                },
            );
        }
        debug!(client = client_id, "Endpoint attached");

        InMemoryTransport {
            client_id: client_id.to_string(),
            broker: Arc::clone(self),
            inbox: Mutex::new(rx),
        }
    }

    /// Route a message to subscribers and observers.
    ///
    /// Returns the number of endpoints and observers that received it.
    pub fn route(&self, topic: &str, payload: Vec<u8>) -> usize {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        let message = InboundMessage::new(topic, payload);

        let mut delivered = 0;
        if let Ok(clients) = self.clients.read() {
            for slot in clients.values() {
                if slot.connected
                    && slot.topics.contains(topic)
                    && slot
                        .inbox
                        .send(TransportEvent::Message(message.clone()))
                        .is_ok()
                {
                    delivered += 1;
                }
            }
        }

        let observed = self.observers.send(message).unwrap_or(0);
        if delivered == 0 && observed == 0 {
            warn!(topic = topic, "Message dropped (no receivers)");
        } else {
            debug!(topic = topic, delivered, observed, "Message routed");
        }
        delivered + observed
    }

    /// Publish on behalf of a remote counterpart.
    pub fn inject(&self, topic: &str, payload: Vec<u8>) -> usize {
        self.route(topic, payload)
    }

    /// Observe routed messages matching a filter.
    #[must_use]
    pub fn observe(&self, filter: TopicFilter) -> Subscription {
        Subscription::new(self.observers.subscribe(), filter)
    }

    /// Drop the connection of `client_id`, clearing its subscriptions.
    ///
    /// Returns `false` if the client is unknown.
    pub fn disconnect(&self, client_id: &str, reason: &str) -> bool {
        let Ok(mut clients) = self.clients.write() else {
            return false;
        };
        let Some(slot) = clients.get_mut(client_id) else {
            return false;
        };
        slot.connected = false;
        slot.topics.clear();
        let _ = slot.inbox.send(TransportEvent::Disconnected {
            reason: reason.to_string(),
        });
        debug!(client = client_id, reason, "Endpoint disconnected");
        true
    }

    /// Restore the connection of `client_id`.
    pub fn reconnect(&self, client_id: &str) -> bool {
        let Ok(mut clients) = self.clients.write() else {
            return false;
        };
        let Some(slot) = clients.get_mut(client_id) else {
            return false;
        };
        slot.connected = true;
        let _ = slot.inbox.send(TransportEvent::Connected);
        debug!(client = client_id, "Endpoint reconnected");
        true
    }

    /// Detach `client_id` for good. Its `next_event` then yields `None`.
    pub fn close(&self, client_id: &str) -> bool {
        self.clients
            .write()
            .map(|mut clients| clients.remove(client_id).is_some())
            .unwrap_or(false)
    }

    /// Current subscriptions of a client, sorted.
    #[must_use]
    pub fn subscriptions(&self, client_id: &str) -> Vec<String> {
        let mut topics: Vec<String> = self
            .clients
            .read()
            .ok()
            .and_then(|clients| clients.get(client_id).map(|s| s.topics.iter().cloned().collect()))
            .unwrap_or_default();
        topics.sort();
        topics
    }

    /// Total messages routed through this broker.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    /// Observer channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn subscribe_client(&self, client_id: &str, topic: &str) -> Result<(), TransportError> {
        let mut clients = self
            .clients
            .write()
            .map_err(|_| TransportError::Publish("broker lock poisoned".to_string()))?;
        let slot = clients.get_mut(client_id).ok_or(TransportError::Closed)?;
        if !slot.connected {
            return Err(TransportError::NotConnected);
        }
        slot.topics.insert(topic.to_string());
        Ok(())
    }

    fn client_state(&self, client_id: &str) -> Result<(), TransportError> {
        let clients = self
            .clients
            .read()
            .map_err(|_| TransportError::Publish("broker lock poisoned".to_string()))?;
        match clients.get(client_id) {
            None => Err(TransportError::Closed),
            Some(slot) if !slot.connected => Err(TransportError::NotConnected),
            Some(_) => Ok(()),
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// One client's endpoint on an [`InMemoryBroker`].
pub struct InMemoryTransport {
    client_id: String,
    broker: Arc<InMemoryBroker>,
    inbox: Mutex<mpsc::UnboundedReceiver<TransportEvent>>,
}

impl InMemoryTransport {
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn broker(&self) -> &Arc<InMemoryBroker> {
        &self.broker
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.broker.subscribe_client(&self.client_id, topic)?;
        debug!(client = %self.client_id, topic, "Subscribed");
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.broker.client_state(&self.client_id)?;
        self.broker.route(topic, payload);
        Ok(())
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        self.inbox.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn next(t: &InMemoryTransport) -> TransportEvent {
        timeout(Duration::from_millis(100), t.next_event())
            .await
            .expect("timeout")
            .expect("closed")
    }

    #[tokio::test]
    async fn test_connect_emits_connected() {
        let broker = Arc::new(InMemoryBroker::new());
        let t = broker.connect("c1");
        assert_eq!(next(&t).await, TransportEvent::Connected);
    }

    #[tokio::test]
    async fn test_route_to_subscriber() {
        let broker = Arc::new(InMemoryBroker::new());
        let t = broker.connect("c1");
        let _ = next(&t).await;
        t.subscribe("c1/vls").await.unwrap();

        let receivers = broker.inject("c1/vls", vec![1, 2]);
        assert_eq!(receivers, 1);
        assert_eq!(
            next(&t).await,
            TransportEvent::Message(InboundMessage::new("c1/vls", vec![1, 2]))
        );
    }

    #[tokio::test]
    async fn test_unsubscribed_topic_not_delivered() {
        let broker = Arc::new(InMemoryBroker::new());
        let t = broker.connect("c1");
        let _ = next(&t).await;
        t.subscribe("c1/vls").await.unwrap();

        assert_eq!(broker.inject("c1/lss-msg", vec![]), 0);
        assert_eq!(broker.messages_published(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_clears_subscriptions() {
        let broker = Arc::new(InMemoryBroker::new());
        let t = broker.connect("c1");
        let _ = next(&t).await;
        t.subscribe("c1/vls").await.unwrap();

        assert!(broker.disconnect("c1", "network down"));
        assert!(matches!(next(&t).await, TransportEvent::Disconnected { .. }));
        assert!(broker.subscriptions("c1").is_empty());
        assert_eq!(
            t.publish("c1/hello", vec![]).await,
            Err(TransportError::NotConnected)
        );
        assert_eq!(t.subscribe("c1/vls").await, Err(TransportError::NotConnected));

        assert!(broker.reconnect("c1"));
        assert_eq!(next(&t).await, TransportEvent::Connected);
        t.subscribe("c1/vls").await.unwrap();
        assert_eq!(broker.subscriptions("c1"), vec!["c1/vls".to_string()]);
    }

    #[tokio::test]
    async fn test_close_ends_event_stream() {
        let broker = Arc::new(InMemoryBroker::new());
        let t = broker.connect("c1");
        let _ = next(&t).await;
        assert!(broker.close("c1"));
        assert_eq!(t.next_event().await, None);
        assert_eq!(t.publish("c1/bye", vec![]).await, Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn test_observer_sees_published() {
        let broker = Arc::new(InMemoryBroker::new());
        let mut obs = broker.observe(TopicFilter::suffixes(["hello"]));
        let t = broker.connect("c1");
        t.publish("c1/hello", vec![]).await.unwrap();

        let seen = timeout(Duration::from_millis(100), obs.recv())
            .await
            .expect("timeout")
            .expect("closed");
        assert_eq!(seen.topic, "c1/hello");
    }

    #[test]
    fn test_default_broker() {
        let broker = InMemoryBroker::default();
        assert_eq!(broker.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(broker.messages_published(), 0);
    }
}
