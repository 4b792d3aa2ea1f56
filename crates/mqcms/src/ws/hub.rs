//! The broadcast hub: one actor per logical channel.
//!
//! All registry mutation happens on the actor task, one command at a time, so
//! the order in which commands are queued is the order in which every
//! connection observes their effects.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mqcms_protocol::{BroadcastMessage, ClientFrame, Envelope};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::connection::{Connection, ConnectionId, ConnectionState, Payload, SendFailure};
use super::error::{HubError, RegistryError};
use super::registry::{ConnectionRegistry, Visit};
use crate::config::HubConfig;

// ============================================================================
// Public types
// ============================================================================

/// How a connection's transport ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The peer closed the socket or the stream ended cleanly.
    Closed { code: Option<u16>, reason: String },
    /// The transport failed, or the hub dropped the connection.
    Errored(String),
}

impl Departure {
    pub fn closed() -> Self {
        Departure::Closed {
            code: None,
            reason: String::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Departure::Errored(_))
    }

    fn cause(&self) -> Option<String> {
        match self {
            Departure::Closed { .. } => None,
            Departure::Errored(cause) => Some(cause.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubPhase {
    /// No connection or publish has reached the hub yet.
    Idle,
    Active,
}

/// Snapshot returned by the stats endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    pub active_connections: usize,
    #[serde(with = "mqcms_protocol::timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub phase: HubPhase,
}

/// Result of a trusted publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishAck {
    /// Registry size after the fan-out.
    pub connection_count: usize,
    /// Connections the message was queued for.
    pub delivered: usize,
}

enum HubCommand {
    Connect {
        outbound: mpsc::Sender<Payload>,
        reply: oneshot::Sender<Result<ConnectionId, RegistryError>>,
    },
    Frame {
        id: ConnectionId,
        frame: ClientFrame,
    },
    Disconnect {
        id: ConnectionId,
        departure: Departure,
    },
    Publish {
        message: BroadcastMessage,
        reply: oneshot::Sender<PublishAck>,
    },
    PublishData {
        data: Value,
        reply: oneshot::Sender<PublishAck>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

// ============================================================================
// Hub state
// ============================================================================

/// State owned by a hub actor.
///
/// The methods are synchronous and usable directly; [`BroadcastHub::spawn`]
/// moves the hub onto its own task and hands back a [`HubHandle`].
pub struct BroadcastHub {
    name: Arc<str>,
    registry: ConnectionRegistry,
    phase: HubPhase,
    max_message_bytes: usize,
    /// Connections dropped by the hub whose transport has not yet reported
    /// its departure. Their departure is announced once, when it arrives.
    pending_departures: HashSet<ConnectionId>,
}

impl BroadcastHub {
    pub fn new(name: &str, max_message_bytes: usize) -> Self {
        Self {
            name: Arc::from(name),
            registry: ConnectionRegistry::new(),
            phase: HubPhase::Idle,
            max_message_bytes,
            pending_departures: HashSet::new(),
        }
    }

    /// Start the hub actor and return a handle to it.
    pub fn spawn(name: &str, config: &HubConfig) -> HubHandle {
        let (commands, inbox) = mpsc::channel(config.command_buffer.max(1));
        let hub = Self::new(name, config.max_message_bytes);
        let handle = HubHandle {
            name: Arc::clone(&hub.name),
            commands,
        };
        tokio::spawn(hub.run(inbox));
        handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> HubPhase {
        self.phase
    }

    pub fn connection_count(&self) -> usize {
        self.registry.size()
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<HubCommand>) {
        debug!("Hub '{}' started", self.name);
        while let Some(command) = inbox.recv().await {
            self.dispatch(command);
        }
        info!(
            "Hub '{}' stopped with {} connections",
            self.name,
            self.registry.size()
        );
    }

    fn dispatch(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect { outbound, reply } => {
                let accepted = self.accept(outbound);
                // The transport gave up before learning its id; nobody will
                // report this connection's departure, so do it here.
                if let Err(Ok(id)) = reply.send(accepted) {
                    self.depart(id, Departure::Errored("connect abandoned".to_string()));
                }
            }
            HubCommand::Frame { id, frame } => self.receive(id, frame),
            HubCommand::Disconnect { id, departure } => self.depart(id, departure),
            HubCommand::Publish { message, reply } => {
                let _ = reply.send(self.publish(message));
            }
            HubCommand::PublishData { data, reply } => {
                let _ = reply.send(self.publish_data(data));
            }
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    // ===== Operations =====

    /// Register a new connection. It receives a private welcome first, then
    /// every other connection is told it joined.
    pub fn accept(
        &mut self,
        outbound: mpsc::Sender<Payload>,
    ) -> Result<ConnectionId, RegistryError> {
        let mut conn = Connection::new(outbound);
        conn.mark_open();
        let id = conn.id();
        self.registry.add(conn)?;
        self.activate("connection");

        let count = self.registry.size();
        info!(
            hub = %self.name,
            connection = %id,
            connections = count,
            "Connection accepted"
        );

        if let Err(failure) = self.send_to(id, &Envelope::welcome(count).into()) {
            // Never announced, so its departure stays silent.
            warn!("Failed to welcome connection {}: {}", id, failure);
            if let Some(mut conn) = self.registry.remove(id) {
                conn.close(Some(failure.to_string()));
            }
            return Ok(id);
        }

        self.broadcast(&Envelope::user_joined(count).into(), Some(id));
        Ok(id)
    }

    /// Relay a client frame to every other connection. Frames that cannot be
    /// relayed earn the sender alone an `error` envelope.
    pub fn receive(&mut self, id: ConnectionId, frame: ClientFrame) {
        if !self.registry.contains(id) {
            debug!("Ignoring frame from unregistered connection {}", id);
            return;
        }

        match frame.interpret(self.max_message_bytes) {
            Ok(payload) => {
                let message = payload.into_message(self.registry.size());
                let delivered = self.broadcast(&message, Some(id));
                debug!(
                    "Relayed {} from {} to {} connections",
                    message.type_tag().unwrap_or("untyped message"),
                    id,
                    delivered
                );
            }
            Err(err) => {
                warn!("Rejected frame from connection {}: {}", id, err);
                let reply = Envelope::error(format!("Failed to process your message: {err}"));
                if let Err(failure) = self.send_to(id, &reply.into()) {
                    self.prune(id, failure);
                }
            }
        }
    }

    /// Deliver a trusted message to every connection.
    pub fn publish(&mut self, message: BroadcastMessage) -> PublishAck {
        self.activate("publish");
        let delivered = self.broadcast(&message, None);
        let ack = PublishAck {
            connection_count: self.registry.size(),
            delivered,
        };
        info!(
            hub = %self.name,
            kind = message.type_tag().unwrap_or("untyped"),
            delivered = ack.delivered,
            "Published message"
        );
        ack
    }

    /// Wrap an arbitrary payload in a `broadcast` envelope stamped with the
    /// current connection count, then publish it.
    pub fn publish_data(&mut self, data: Value) -> PublishAck {
        let envelope = Envelope::broadcast(data, self.registry.size());
        self.publish(envelope.into())
    }

    /// Handle the end of a connection's transport. Each connection is
    /// announced as departed at most once.
    pub fn depart(&mut self, id: ConnectionId, departure: Departure) {
        let announce = match self.registry.remove(id) {
            Some(mut conn) => {
                if !departure.is_error() {
                    conn.begin_close();
                }
                conn.close(departure.cause());
                true
            }
            None => self.pending_departures.remove(&id),
        };
        if !announce {
            debug!("Ignoring repeated departure of connection {}", id);
            return;
        }

        let count = self.registry.size();
        let notice = match &departure {
            Departure::Closed { .. } => Envelope::user_left(count),
            Departure::Errored(_) => Envelope::user_error(count),
        };
        info!(
            hub = %self.name,
            connection = %id,
            connections = count,
            "Connection departed: {:?}",
            departure
        );
        self.broadcast(&notice.into(), None);
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            active_connections: self.registry.size(),
            timestamp: Utc::now(),
            phase: self.phase,
        }
    }

    // ===== Fan-out =====

    /// Queue a message for every connection except `exclude`. Connections
    /// that cannot accept it are closed and removed before this returns.
    pub fn broadcast(&mut self, message: &BroadcastMessage, exclude: Option<ConnectionId>) -> usize {
        let Some(payload) = self.encode(message) else {
            return 0;
        };

        let hub = &self.name;
        let mut delivered = 0;
        let dropped = self.registry.for_each(|conn| {
            if Some(conn.id()) == exclude {
                return Visit::Keep;
            }
            match conn.send(Arc::clone(&payload)) {
                Ok(()) => {
                    delivered += 1;
                    Visit::Keep
                }
                Err(failure) => {
                    warn!(
                        "Hub '{}' dropping connection {}: {}",
                        hub,
                        conn.id(),
                        failure
                    );
                    conn.close(Some(failure.to_string()));
                    Visit::Remove
                }
            }
        });

        self.pending_departures
            .extend(dropped.iter().map(Connection::id));
        delivered
    }

    fn send_to(&self, id: ConnectionId, message: &BroadcastMessage) -> Result<(), SendFailure> {
        let conn = self
            .registry
            .get(id)
            .ok_or(SendFailure::NotOpen(ConnectionState::Closed))?;
        match self.encode(message) {
            Some(payload) => conn.send(payload),
            None => Ok(()),
        }
    }

    fn prune(&mut self, id: ConnectionId, failure: SendFailure) {
        if let Some(mut conn) = self.registry.remove(id) {
            warn!("Hub '{}' dropping connection {}: {}", self.name, id, failure);
            conn.close(Some(failure.to_string()));
            self.pending_departures.insert(id);
        }
    }

    fn encode(&self, message: &BroadcastMessage) -> Option<Payload> {
        match message.to_text() {
            Ok(text) => Some(Payload::from(text)),
            Err(err) => {
                error!("Hub '{}' failed to encode message: {}", self.name, err);
                None
            }
        }
    }

    fn activate(&mut self, trigger: &str) {
        if self.phase == HubPhase::Idle {
            self.phase = HubPhase::Active;
            info!("Hub '{}' active after first {}", self.name, trigger);
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable address of a running hub actor.
#[derive(Clone, Debug)]
pub struct HubHandle {
    name: Arc<str>,
    commands: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Register a connection whose writer drains `outbound`.
    pub async fn connect(&self, outbound: mpsc::Sender<Payload>) -> Result<ConnectionId, HubError> {
        let accepted = self
            .request(|reply| HubCommand::Connect { outbound, reply })
            .await?;
        Ok(accepted?)
    }

    pub async fn client_frame(&self, id: ConnectionId, frame: ClientFrame) -> Result<(), HubError> {
        self.send(HubCommand::Frame { id, frame }).await
    }

    pub async fn disconnect(&self, id: ConnectionId, departure: Departure) -> Result<(), HubError> {
        self.send(HubCommand::Disconnect { id, departure }).await
    }

    pub async fn publish(
        &self,
        message: impl Into<BroadcastMessage>,
    ) -> Result<PublishAck, HubError> {
        let message = message.into();
        self.request(|reply| HubCommand::Publish { message, reply })
            .await
    }

    /// Publish `data` inside a `broadcast` envelope.
    pub async fn publish_data(&self, data: Value) -> Result<PublishAck, HubError> {
        self.request(|reply| HubCommand::PublishData { data, reply })
            .await
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        self.request(|reply| HubCommand::Stats { reply }).await
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| self.unavailable())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> HubCommand,
    ) -> Result<T, HubError> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply)).await?;
        response.await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> HubError {
        HubError::Unavailable(self.name.to_string())
    }

    /// A handle whose actor has already exited.
    #[cfg(test)]
    pub(crate) fn stopped(name: &str) -> Self {
        let (commands, _) = mpsc::channel(1);
        Self {
            name: Arc::from(name),
            commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqcms_protocol::{MessageKind, RelayedMessage};
    use serde_json::json;

    struct Client {
        id: ConnectionId,
        inbox: mpsc::Receiver<Payload>,
    }

    impl Client {
        fn drain(&mut self) -> Vec<Value> {
            let mut messages = Vec::new();
            while let Ok(payload) = self.inbox.try_recv() {
                messages.push(serde_json::from_str(&payload).unwrap());
            }
            messages
        }
    }

    fn join(hub: &mut BroadcastHub) -> Client {
        join_with_buffer(hub, 16)
    }

    fn join_with_buffer(hub: &mut BroadcastHub, buffer: usize) -> Client {
        let (tx, inbox) = mpsc::channel(buffer);
        let id = hub.accept(tx).unwrap();
        Client { id, inbox }
    }

    fn types(messages: &[Value]) -> Vec<&str> {
        messages
            .iter()
            .map(|m| m["type"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn welcome_precedes_join_and_newcomer_is_excluded() {
        let mut hub = BroadcastHub::new("test", 1024);
        let mut a = join(&mut hub);
        let a_msgs = a.drain();
        assert_eq!(types(&a_msgs), vec!["welcome"]);
        assert_eq!(a_msgs[0]["connectionCount"], 1);

        let mut b = join(&mut hub);
        let b_msgs = b.drain();
        assert_eq!(types(&b_msgs), vec!["welcome"]);
        assert_eq!(b_msgs[0]["connectionCount"], 2);

        let a_msgs = a.drain();
        assert_eq!(types(&a_msgs), vec!["user_joined"]);
        assert_eq!(a_msgs[0]["connectionCount"], 2);
    }

    #[test]
    fn relays_objects_to_everyone_but_the_sender() {
        let mut hub = BroadcastHub::new("test", 1024);
        let mut a = join(&mut hub);
        let mut b = join(&mut hub);
        let mut c = join(&mut hub);
        a.drain();
        b.drain();
        c.drain();

        hub.receive(
            a.id,
            ClientFrame::Text(r#"{"type":"chat","body":"hi","connectionCount":42}"#.into()),
        );

        assert!(a.drain().is_empty());
        for client in [&mut b, &mut c] {
            let msgs = client.drain();
            assert_eq!(msgs.len(), 1);
            assert_eq!(msgs[0]["type"], "chat");
            assert_eq!(msgs[0]["body"], "hi");
            assert_eq!(msgs[0]["connectionCount"], 3);
            assert!(msgs[0]["timestamp"].is_string());
        }
    }

    #[test]
    fn wraps_plain_text_and_binary() {
        let mut hub = BroadcastHub::new("test", 1024);
        let a = join(&mut hub);
        let mut b = join(&mut hub);
        b.drain();

        hub.receive(a.id, ClientFrame::Text("hello".into()));
        hub.receive(a.id, ClientFrame::Binary(vec![1, 2, 3]));

        let msgs = b.drain();
        assert_eq!(types(&msgs), vec!["message", "binary"]);
        assert_eq!(msgs[0]["content"], "hello");
        assert_eq!(msgs[1]["content"], "Binary message received");
    }

    #[test]
    fn oversized_frames_reply_to_sender_only() {
        let mut hub = BroadcastHub::new("test", 32);
        let mut a = join(&mut hub);
        let mut b = join(&mut hub);
        a.drain();
        b.drain();

        hub.receive(a.id, ClientFrame::Text("x".repeat(33)));

        let msgs = a.drain();
        assert_eq!(types(&msgs), vec!["error"]);
        assert!(msgs[0]["message"].as_str().unwrap().contains("33 bytes"));
        assert!(b.drain().is_empty());
        assert_eq!(hub.connection_count(), 2);
    }

    #[test]
    fn server_type_tags_from_clients_are_relayed() {
        let mut hub = BroadcastHub::new("test", 1024);
        let mut a = join(&mut hub);
        let mut b = join(&mut hub);
        a.drain();
        b.drain();

        hub.receive(a.id, ClientFrame::Text(r#"{"type":"welcome"}"#.into()));

        assert!(a.drain().is_empty());
        let msgs = b.drain();
        assert_eq!(types(&msgs), vec!["welcome"]);
        assert_eq!(msgs[0]["connectionCount"], 2);
    }

    #[test]
    fn publish_reaches_every_connection_verbatim() {
        let mut hub = BroadcastHub::new("test", 1024);
        let mut a = join(&mut hub);
        let mut b = join(&mut hub);
        a.drain();
        b.drain();

        let ack = hub.publish(Envelope::media_updated().into());
        assert_eq!(
            ack,
            PublishAck {
                connection_count: 2,
                delivered: 2
            }
        );

        let a_msgs = a.drain();
        let b_msgs = b.drain();
        assert_eq!(a_msgs, b_msgs);
        assert_eq!(a_msgs[0].as_object().unwrap().len(), 2);
        assert_eq!(a_msgs[0]["type"], "media_updated");
    }

    #[test]
    fn publish_data_wraps_in_broadcast_envelope() {
        let mut hub = BroadcastHub::new("test", 1024);
        let mut a = join(&mut hub);
        a.drain();

        hub.publish_data(json!({"slide": 3}));

        let msgs = a.drain();
        assert_eq!(msgs[0]["type"], "broadcast");
        assert_eq!(msgs[0]["data"], json!({"slide": 3}));
        assert_eq!(msgs[0]["connectionCount"], 1);
    }

    #[test]
    fn publish_to_empty_hub_activates_it() {
        let mut hub = BroadcastHub::new("test", 1024);
        assert_eq!(hub.phase(), HubPhase::Idle);

        let ack = hub.publish(Envelope::playlist_updated().into());
        assert_eq!(ack.delivered, 0);
        assert_eq!(hub.phase(), HubPhase::Active);
        assert_eq!(hub.stats().active_connections, 0);
    }

    #[test]
    fn departure_is_announced_once_with_post_removal_count() {
        let mut hub = BroadcastHub::new("test", 1024);
        let mut a = join(&mut hub);
        let b = join(&mut hub);
        let c = join(&mut hub);
        a.drain();

        hub.depart(b.id, Departure::closed());
        hub.depart(b.id, Departure::closed());
        hub.depart(c.id, Departure::Errored("reset".into()));

        let msgs = a.drain();
        assert_eq!(types(&msgs), vec!["user_left", "user_error"]);
        assert_eq!(msgs[0]["connectionCount"], 2);
        assert_eq!(msgs[1]["connectionCount"], 1);
        assert_eq!(hub.connection_count(), 1);
    }

    #[test]
    fn failed_sends_prune_and_defer_the_announcement() {
        let mut hub = BroadcastHub::new("test", 1024);
        let mut a = join(&mut hub);
        let mut b = join(&mut hub);
        let c = join(&mut hub);
        a.drain();
        b.drain();

        let c_id = c.id;
        drop(c);

        let ack = hub.publish(Envelope::settings_updated().into());
        assert_eq!(ack.delivered, 2);
        assert_eq!(ack.connection_count, 2);
        a.drain();
        b.drain();

        // the transport reports the dead socket later, exactly once
        hub.depart(c_id, Departure::Errored("writer gone".into()));
        hub.depart(c_id, Departure::closed());

        let msgs = a.drain();
        assert_eq!(types(&msgs), vec!["user_error"]);
        assert_eq!(msgs[0]["connectionCount"], 2);
    }

    #[test]
    fn slow_connection_is_dropped_when_its_queue_fills() {
        let mut hub = BroadcastHub::new("test", 1024);
        // the welcome fills this connection's only slot
        let slow = join_with_buffer(&mut hub, 1);
        let mut b = join(&mut hub);

        assert_eq!(hub.connection_count(), 1);
        assert_eq!(b.drain()[0]["connectionCount"], 2);

        hub.receive(slow.id, ClientFrame::Text("ignored".into()));
        assert!(b.drain().is_empty());
    }

    #[test]
    fn relayed_message_type_is_reported() {
        let fields = json!({"type": "chat"});
        let message: BroadcastMessage =
            RelayedMessage::new(fields.as_object().unwrap().clone(), 1).into();
        assert_eq!(message.type_tag(), Some("chat"));
        assert_eq!(
            BroadcastMessage::from(Envelope::welcome(1)).type_tag(),
            Some(MessageKind::Welcome.as_str())
        );
    }

    #[tokio::test]
    async fn handle_drives_the_actor() {
        let handle = BroadcastHub::spawn("actor", &HubConfig::default());
        assert_eq!(handle.name(), "actor");
        assert_eq!(handle.stats().await.unwrap().phase, HubPhase::Idle);

        let (tx, mut inbox) = mpsc::channel(8);
        let id = handle.connect(tx).await.unwrap();
        let welcome: Value = serde_json::from_str(&inbox.recv().await.unwrap()).unwrap();
        assert_eq!(welcome["type"], "welcome");

        let ack = handle.publish(Envelope::playlist_updated()).await.unwrap();
        assert_eq!(ack.delivered, 1);

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.active_connections, 1);
        assert_eq!(stats.phase, HubPhase::Active);

        handle.disconnect(id, Departure::closed()).await.unwrap();
        assert_eq!(handle.stats().await.unwrap().active_connections, 0);
    }

    #[tokio::test]
    async fn stopped_hub_reports_unavailable() {
        let handle = HubHandle::stopped("gone");
        assert!(handle.is_closed());
        assert!(matches!(
            handle.stats().await,
            Err(HubError::Unavailable(name)) if name == "gone"
        ));
    }
}
