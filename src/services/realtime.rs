//! Realtime change notifications over the hosted service's websocket.
//!
//! Speaks the Phoenix channel protocol: join a topic configured for
//! `postgres_changes` on the bookmarks table, keep the socket alive with
//! heartbeats, and fire the subscriber callback on every change event.
//! The payload of a change is ignored; subscribers refetch.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::services::backend_client::BackendClient;
use crate::types::config::RealtimeConfig;
use crate::types::subscription::{ChangeCallback, Subscription};

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_CHANGES: &str = "postgres_changes";

/// One frame of the Phoenix channel protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixMessage {
    fn new(topic: &str, event: &str, payload: Value, reference: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            reference: Some(reference.to_string()),
        }
    }

    fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Join request subscribing to every event on `schema.table`.
pub fn join_message(topic: &str, table: &str, access_token: &str, reference: u64) -> PhoenixMessage {
    PhoenixMessage::new(
        topic,
        EVENT_JOIN,
        json!({
            "config": {
                "postgres_changes": [
                    {"event": "*", "schema": "public", "table": table}
                ]
            },
            "access_token": access_token
        }),
        reference,
    )
}

pub fn heartbeat_message(reference: u64) -> PhoenixMessage {
    PhoenixMessage::new("phoenix", EVENT_HEARTBEAT, json!({}), reference)
}

pub fn leave_message(topic: &str, reference: u64) -> PhoenixMessage {
    PhoenixMessage::new(topic, EVENT_LEAVE, json!({}), reference)
}

/// What an inbound frame means for the subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A row changed.
    Change,
    /// The server accepted our join.
    Joined,
    /// The server refused our join.
    JoinRefused(String),
    /// The server closed or errored the channel.
    ChannelClosed,
    /// Heartbeat replies, presence and anything else.
    Ignored,
}

/// Classifies `msg` relative to our `topic` and the `join_ref` we sent.
pub fn classify(msg: &PhoenixMessage, topic: &str, join_ref: &str) -> Inbound {
    if msg.topic != topic {
        return Inbound::Ignored;
    }
    match msg.event.as_str() {
        EVENT_CHANGES => Inbound::Change,
        EVENT_REPLY if msg.reference.as_deref() == Some(join_ref) => {
            match msg.payload.get("status").and_then(Value::as_str) {
                Some("ok") => Inbound::Joined,
                _ => Inbound::JoinRefused(
                    msg.payload
                        .get("response")
                        .map(Value::to_string)
                        .unwrap_or_else(|| "unknown reason".to_string()),
                ),
            }
        }
        EVENT_CLOSE | EVENT_ERROR => Inbound::ChannelClosed,
        _ => Inbound::Ignored,
    }
}

/// Sends `phx_leave` for `topic` and closes the socket, ignoring failures.
async fn leave_and_close<S>(sink: &mut S, topic: &str, reference: u64)
where
    S: Sink<WsMessage> + Unpin,
{
    let leave = leave_message(topic, reference);
    let _ = sink.send(WsMessage::Text(leave.to_text().into())).await;
    let _ = sink.close().await;
}

/// Factory for realtime subscriptions on the bookmarks table.
pub struct RealtimeChannel {
    client: Arc<BackendClient>,
    config: RealtimeConfig,
}

impl RealtimeChannel {
    pub fn new(client: Arc<BackendClient>, config: RealtimeConfig) -> Self {
        Self { client, config }
    }

    pub fn topic(&self) -> String {
        format!("realtime:{}", self.config.channel)
    }

    /// Spawns a worker that keeps a joined channel open until the returned
    /// subscription is released. Must be called inside a Tokio runtime.
    pub fn subscribe(&self, on_change: ChangeCallback) -> Subscription {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let worker = Worker {
            client: self.client.clone(),
            topic: self.topic(),
            table: self.client.table().to_string(),
            heartbeat: Duration::from_secs(self.config.heartbeat_interval_secs.max(1)),
            reconnect_delay: Duration::from_secs(self.config.reconnect_delay_secs.max(1)),
            on_change,
        };
        info!(topic = %worker.topic, "opening realtime subscription");
        tokio::spawn(worker.run(shutdown_rx));
        Subscription::new(move || {
            let _ = shutdown_tx.send(());
        })
    }
}

enum SessionEnd {
    Shutdown,
    Disconnected { joined: bool },
}

struct Worker {
    client: Arc<BackendClient>,
    topic: String,
    table: String,
    heartbeat: Duration,
    reconnect_delay: Duration,
    on_change: ChangeCallback,
}

impl Worker {
    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut has_joined = false;
        loop {
            match self.session(&mut shutdown, has_joined).await {
                SessionEnd::Shutdown => break,
                SessionEnd::Disconnected { joined } => {
                    has_joined |= joined;
                    warn!(
                        topic = %self.topic,
                        delay_secs = self.reconnect_delay.as_secs(),
                        "realtime connection lost, reconnecting"
                    );
                }
            }
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
        debug!(topic = %self.topic, "realtime subscription closed");
    }

    /// One connection lifetime. After a re-join the callback fires once,
    /// since changes made while disconnected were not delivered.
    async fn session(&self, shutdown: &mut oneshot::Receiver<()>, rejoin: bool) -> SessionEnd {
        let url = self.client.realtime_url();
        let connected = tokio::select! {
            _ = &mut *shutdown => return SessionEnd::Shutdown,
            result = connect_async(url.as_str()) => result,
        };
        let (socket, _) = match connected {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "realtime connect failed");
                return SessionEnd::Disconnected { joined: false };
            }
        };
        let (mut sink, mut stream) = socket.split();

        let token = self
            .client
            .access_token()
            .map(|t| t.as_str().to_owned())
            .unwrap_or_else(|| self.client.anon_key().to_owned());
        let mut next_ref: u64 = 1;
        let join_ref = next_ref.to_string();
        let join = join_message(&self.topic, &self.table, &token, next_ref);
        if let Err(e) = sink.send(WsMessage::Text(join.to_text().into())).await {
            warn!(error = %e, "realtime join send failed");
            return SessionEnd::Disconnected { joined: false };
        }

        let mut heartbeat = tokio::time::interval(self.heartbeat);
        heartbeat.tick().await;
        let mut joined = false;

        loop {
            tokio::select! {
                _ = &mut *shutdown => {
                    leave_and_close(&mut sink, &self.topic, next_ref + 1).await;
                    return SessionEnd::Shutdown;
                }
                _ = heartbeat.tick() => {
                    next_ref += 1;
                    let beat = heartbeat_message(next_ref);
                    if let Err(e) = sink.send(WsMessage::Text(beat.to_text().into())).await {
                        warn!(error = %e, "realtime heartbeat failed");
                        return SessionEnd::Disconnected { joined };
                    }
                }
                incoming = stream.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        let msg = match serde_json::from_str::<PhoenixMessage>(text.as_str()) {
                            Ok(msg) => msg,
                            Err(e) => {
                                debug!(error = %e, "ignoring unparseable realtime frame");
                                continue;
                            }
                        };
                        match classify(&msg, &self.topic, &join_ref) {
                            Inbound::Change => (self.on_change)(),
                            Inbound::Joined => {
                                joined = true;
                                info!(topic = %self.topic, "realtime channel joined");
                                if rejoin {
                                    (self.on_change)();
                                }
                            }
                            Inbound::JoinRefused(reason) => {
                                warn!(topic = %self.topic, %reason, "realtime join refused");
                                leave_and_close(&mut sink, &self.topic, next_ref + 1).await;
                                return SessionEnd::Disconnected { joined };
                            }
                            Inbound::ChannelClosed => return SessionEnd::Disconnected { joined },
                            Inbound::Ignored => {}
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => return SessionEnd::Disconnected { joined },
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "realtime receive error");
                        return SessionEnd::Disconnected { joined };
                    }
                },
            }
        }
    }
}
