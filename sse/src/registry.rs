use crate::client::Client;
use crate::message::Message;
use dashmap::DashMap;
use futures::future::join_all;
use log::*;
use std::collections::HashSet;
use std::sync::Arc;

/// Topic every connection is registered under unless it asks for another.
pub const BROADCAST_TOPIC: &str = "broadcast";

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection information (no redundant connection_id)
#[derive(Clone)]
struct ConnectionInfo {
    topic: String,
    client: Client,
}

/// Registry of live clients with dual indices for O(1) lookups
#[derive(Default)]
pub struct Registry {
    /// Primary storage: lookup by connection_id for registration/cleanup - O(1)
    connections: DashMap<ConnectionId, ConnectionInfo>,

    /// Secondary index: fast lookup by topic for message routing - O(1)
    topic_index: DashMap<String, HashSet<ConnectionId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under `topic`. The client is removed again as soon as
    /// its stream closes.
    pub fn register(self: &Arc<Self>, topic: impl Into<String>, client: Client) -> ConnectionId {
        let topic = topic.into();
        let connection_id = ConnectionId::new();
        let done = client.done();

        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo {
                topic: topic.clone(),
                client,
            },
        );
        self.topic_index
            .entry(topic)
            .or_default()
            .insert(connection_id.clone());
        info!("Registered event stream connection {}", connection_id.as_str());

        let registry = Arc::downgrade(self);
        let id = connection_id.clone();
        tokio::spawn(async move {
            done.wait().await;
            if let Some(registry) = registry.upgrade() {
                registry.unregister(&id);
            }
        });

        connection_id
    }

    /// Unregister a connection - O(1)
    pub fn unregister(&self, connection_id: &ConnectionId) {
        if let Some((_, info)) = self.connections.remove(connection_id) {
            info!(
                "Unregistering event stream connection {}",
                connection_id.as_str()
            );

            if let Some(mut entry) = self.topic_index.get_mut(&info.topic) {
                entry.remove(connection_id);

                // Clean up empty topic entries
                if entry.is_empty() {
                    drop(entry); // Release lock before removal
                    self.topic_index.remove(&info.topic);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Send a message to every client of `topic`. Returns how many accepted it.
    pub async fn send_to_topic(&self, topic: &str, message: Message) -> usize {
        let targets: Vec<(ConnectionId, Client)> = match self.topic_index.get(topic) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| {
                    self.connections
                        .get(id)
                        .map(|info| (id.clone(), info.client.clone()))
                })
                .collect(),
            None => Vec::new(),
        };

        Self::deliver(targets, message).await
    }

    /// Send a message to every registered client. Returns how many accepted it.
    pub async fn broadcast(&self, message: Message) -> usize {
        let targets: Vec<(ConnectionId, Client)> = self
            .connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().client.clone()))
            .collect();

        Self::deliver(targets, message).await
    }

    // Index guards are released before any send is awaited.
    async fn deliver(targets: Vec<(ConnectionId, Client)>, message: Message) -> usize {
        let sends = targets.into_iter().map(|(id, client)| {
            let message = message.clone();
            async move {
                match client.send(message).await {
                    Ok(()) => true,
                    Err(e) => {
                        debug!("Skipping connection {}: {}", id.as_str(), e);
                        false
                    }
                }
            }
        });

        join_all(sends).await.into_iter().filter(|sent| *sent).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{CloseReason, StreamOptions};
    use crate::mock::MockTransport;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    const WAIT: Duration = Duration::from_secs(5);

    fn open_client() -> (MockTransport, Client, JoinHandle<CloseReason>) {
        let transport = MockTransport::new();
        let (client, writer) = Client::init(transport.clone(), StreamOptions::new()).unwrap();
        let handle = tokio::spawn(writer.run(CancellationToken::new()));
        (transport, client, handle)
    }

    #[tokio::test]
    async fn test_send_to_topic_reaches_only_that_topic() {
        let registry = Arc::new(Registry::new());
        let (news, news_client, _h1) = open_client();
        let (sports, sports_client, _h2) = open_client();
        registry.register("news", news_client);
        registry.register("sports", sports_client);

        let sent = registry
            .send_to_topic("news", Message::named("headline").data("hello"))
            .await;

        assert_eq!(sent, 1);
        assert!(news.output().contains("event: headline\ndata: hello\n\n"));
        assert!(!sports.output().contains("headline"));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_client() {
        let registry = Arc::new(Registry::new());
        let (a, a_client, _h1) = open_client();
        let (b, b_client, _h2) = open_client();
        registry.register("a", a_client);
        registry.register(BROADCAST_TOPIC, b_client);

        let sent = registry.broadcast(Message::named("tick")).await;

        assert_eq!(sent, 2);
        assert!(a.output().contains("event: tick\n\n"));
        assert!(b.output().contains("event: tick\n\n"));
    }

    #[tokio::test]
    async fn test_unknown_topic_sends_nothing() {
        let registry = Arc::new(Registry::new());

        assert_eq!(registry.send_to_topic("nobody", Message::named("x")).await, 0);
    }

    #[tokio::test]
    async fn test_closed_client_unregisters_itself() {
        let registry = Arc::new(Registry::new());
        let (_transport, client, handle) = open_client();
        registry.register("news", client.clone());
        assert_eq!(registry.len(), 1);

        client.close().await;
        handle.await.unwrap();

        timeout(WAIT, async {
            while !registry.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(registry.send_to_topic("news", Message::named("x")).await, 0);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = Arc::new(Registry::new());
        let (_transport, client, _handle) = open_client();
        let id = registry.register("news", client);

        registry.unregister(&id);
        registry.unregister(&id);

        assert!(registry.is_empty());
    }
}
