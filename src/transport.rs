//! Transport-agnostic Socket.IO session logic.
//!
//! SYSTEM CONTEXT
//! ==============
//! The browser connector owns the sockets and timers; everything it decides
//! lives here so it can be tested without a browser. A [`Session`] is fed raw
//! Engine.IO packet text from one transport attempt and answers with a
//! [`Step`]: keep reading, write a reply, or stop. When the attempt is over,
//! [`Session::finish`] turns the way it ended into lifecycle reactions.
//!
//! Between attempts the connector sleeps per [`Backoff`]. Sessions that end
//! for any reason other than [`SessionEnd::Lost`] are not retried.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::rc::Rc;

use packets::{EnginePacket, Handshake, SocketPacket};
use serde_json::Value;

use crate::config::{ReconnectPolicy, TransportKind};
use crate::connection::Reactions;

/// Server defaults used until the handshake says otherwise.
pub const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 20_000;

/// Failure of a single transport attempt.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The transport could not be opened at all.
    #[error("{transport} unavailable: {detail}")]
    Unavailable { transport: &'static str, detail: String },
    /// The transport failed after opening.
    #[error("transport error: {0}")]
    Transport(String),
    /// Nothing arrived within the heartbeat window.
    #[error("ping timeout")]
    HeartbeatTimeout,
}

impl SessionError {
    pub fn unavailable(kind: TransportKind, detail: impl Into<String>) -> Self {
        Self::Unavailable { transport: kind.as_str(), detail: detail.into() }
    }
}

/// How a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The transport went away; the connection retries.
    Lost(String),
    /// The server disconnected the namespace.
    ServerDisconnect,
    /// The server refused the namespace connection.
    Rejected(String),
    /// The page side of the connection went away.
    Closed,
}

impl SessionEnd {
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::Lost(_))
    }
}

impl From<SessionError> for SessionEnd {
    fn from(err: SessionError) -> Self {
        Self::Lost(err.to_string())
    }
}

/// What the transport should do after a packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// Write this encoded Engine.IO packet.
    Send(String),
    End(SessionEnd),
}

/// Result of feeding a long-polling payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    pub replies: Vec<String>,
    pub end: Option<SessionEnd>,
}

/// Protocol state of one transport attempt.
pub struct Session {
    reactions: Rc<Reactions>,
    handshake: Option<Handshake>,
    connected: bool,
}

impl Session {
    pub fn new(reactions: Rc<Reactions>) -> Self {
        Self { reactions, handshake: None, connected: false }
    }

    pub fn handshake(&self) -> Option<&Handshake> {
        self.handshake.as_ref()
    }

    pub fn is_handshaken(&self) -> bool {
        self.handshake.is_some()
    }

    /// Whether the namespace connect was acknowledged.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Longest silence tolerated before the session counts as lost.
    pub fn heartbeat_ms(&self) -> u64 {
        self.handshake.as_ref().map_or(DEFAULT_PING_INTERVAL_MS + DEFAULT_PING_TIMEOUT_MS, |h| {
            h.ping_interval.saturating_add(h.ping_timeout)
        })
    }

    /// Process one Engine.IO packet.
    pub fn receive(&mut self, text: &str) -> Step {
        let packet = match packets::decode_engine(text) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("dropping engine packet {text:?}: {e}");
                return Step::Continue;
            }
        };

        match packet {
            EnginePacket::Open(handshake) => {
                log::debug!("engine session {} opened", handshake.sid);
                self.handshake = Some(handshake);
                Step::Send(encode_socket_message(&SocketPacket::connect()))
            }
            EnginePacket::Ping(probe) => Step::Send(packets::encode_engine(&EnginePacket::Pong(probe))),
            EnginePacket::Message(body) => self.receive_socket(&body),
            EnginePacket::Close => Step::End(SessionEnd::Lost("transport close".to_owned())),
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => Step::Continue,
        }
    }

    /// Process a `\x1e`-joined long-polling response body.
    pub fn receive_batch(&mut self, body: &str) -> Batch {
        let mut batch = Batch::default();
        for part in packets::split_payload(body) {
            match self.receive(part) {
                Step::Continue => {}
                Step::Send(reply) => batch.replies.push(reply),
                Step::End(end) => {
                    batch.end = Some(end);
                    break;
                }
            }
        }
        batch
    }

    fn receive_socket(&mut self, body: &str) -> Step {
        let packet = match packets::decode_socket(body) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("dropping socket packet {body:?}: {e}");
                return Step::Continue;
            }
        };

        match packet {
            SocketPacket::Connect { .. } => {
                self.connected = true;
                self.reactions.on_connect();
                Step::Continue
            }
            SocketPacket::Event { name, args, .. } => {
                self.reactions.on_event(&name, args.into_iter().next());
                Step::Continue
            }
            SocketPacket::Ack { id, .. } => {
                log::debug!("ignoring ack {id}");
                Step::Continue
            }
            SocketPacket::ConnectError { message, .. } => Step::End(SessionEnd::Rejected(message)),
            SocketPacket::Disconnect { .. } => Step::End(SessionEnd::ServerDisconnect),
        }
    }

    /// Report how the session ended to the lifecycle reactions.
    pub fn finish(self, end: &SessionEnd) {
        match end {
            SessionEnd::Lost(reason) if self.connected => self.reactions.on_disconnect(reason),
            SessionEnd::Lost(reason) => self.reactions.on_connect_error(reason),
            SessionEnd::Rejected(message) => self.reactions.on_connect_error(message),
            SessionEnd::ServerDisconnect => self.reactions.on_disconnect("io server disconnect"),
            SessionEnd::Closed => self.reactions.on_disconnect("io client disconnect"),
        }
    }
}

/// Inbound-silence deadline for a websocket session.
///
/// Only inbound traffic moves the deadline; outbound writes do not.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    deadline_ms: f64,
}

impl Heartbeat {
    pub fn new(window_ms: u64, now_ms: f64) -> Self {
        Self { deadline_ms: now_ms + window(window_ms) }
    }

    /// Restart the window after something arrived.
    pub fn touch(&mut self, window_ms: u64, now_ms: f64) {
        self.deadline_ms = now_ms + window(window_ms);
    }

    /// Milliseconds left before the session counts as lost; zero once expired.
    pub fn remaining_ms(&self, now_ms: f64) -> u32 {
        // Float-to-int `as` saturates at both ends.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let left = (self.deadline_ms - now_ms).ceil() as u32;
        left
    }

    pub fn is_expired(&self, now_ms: f64) -> bool {
        now_ms >= self.deadline_ms
    }
}

#[allow(clippy::cast_precision_loss)]
fn window(window_ms: u64) -> f64 {
    window_ms as f64
}

/// Reconnect delays: doubling from the initial delay up to the cap.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    next_ms: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, next_ms: policy.initial_ms }
    }

    pub fn next_delay(&mut self) -> u32 {
        let delay = self.next_ms.min(self.policy.max_ms);
        self.next_ms = delay.saturating_mul(2).min(self.policy.max_ms);
        delay
    }

    pub fn reset(&mut self) {
        self.next_ms = self.policy.initial_ms;
    }
}

/// Encode an outbound event as a ready-to-send Engine.IO packet.
pub fn encode_emit(event: &str, payload: Value) -> String {
    encode_socket_message(&SocketPacket::event(event, payload))
}

fn encode_socket_message(packet: &SocketPacket) -> String {
    packets::encode_engine(&EnginePacket::Message(packets::encode_socket(packet)))
}

pub fn websocket_url(secure: bool, host: &str, path: &str) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    format!(
        "{scheme}://{host}{}/?EIO={}&transport=websocket",
        path.trim_end_matches('/'),
        packets::ENGINE_PROTOCOL
    )
}

/// Long-polling endpoint; `sid` is required after the handshake.
pub fn polling_url(path: &str, sid: Option<&str>, cache_buster: &str) -> String {
    let mut url = format!(
        "{}/?EIO={}&transport=polling",
        path.trim_end_matches('/'),
        packets::ENGINE_PROTOCOL
    );
    if let Some(sid) = sid {
        url.push_str("&sid=");
        url.push_str(sid);
    }
    url.push_str("&t=");
    url.push_str(cache_buster);
    url
}
