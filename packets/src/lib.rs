//! Engine.IO v4 / Socket.IO v5 packet codec for the realtime chat transport.
//!
//! This crate owns the text wire representation spoken between the browser
//! client and the Socket.IO server. Two layers are modelled:
//!
//! - [`EnginePacket`]: the Engine.IO framing (open, ping/pong, message, ...)
//!   carried one-per-frame over websocket or `\x1e`-joined over long-polling.
//! - [`SocketPacket`]: the Socket.IO packet carried inside an Engine.IO
//!   `message` (connect, event, ack, ...).
//!
//! Event payloads stay flexible (`serde_json::Value`); callers decide how to
//! interpret them. Binary attachments are not supported.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record separator used to join packets in a long-polling payload.
pub const RECORD_SEPARATOR: char = '\x1e';

/// Engine.IO protocol revision requested in the `EIO` query parameter.
pub const ENGINE_PROTOCOL: u8 = 4;

/// The default Socket.IO namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Error returned by the decode functions.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The packet text was empty.
    #[error("empty packet")]
    Empty,
    /// The leading type character does not map to a known packet type.
    #[error("unknown packet type: {0:?}")]
    UnknownType(char),
    /// Binary packets and attachments are not handled by this codec.
    #[error("binary packets are not supported")]
    UnsupportedBinary,
    /// The JSON section of the packet could not be parsed.
    #[error("invalid packet json: {0}")]
    Json(#[from] serde_json::Error),
    /// An EVENT packet whose data is not an array headed by a string name.
    #[error("event packet without a name")]
    InvalidEvent,
    /// An ACK packet without an acknowledgement id.
    #[error("ack packet without an id")]
    MissingAckId,
}

/// Handshake data delivered by the Engine.IO `open` packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Session id; required on every long-polling request after the open.
    pub sid: String,
    /// Transports the server offers as upgrades.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong before closing.
    pub ping_timeout: u64,
    /// Largest payload the server accepts, in bytes.
    #[serde(default)]
    pub max_payload: u64,
}

/// A single Engine.IO packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    /// Heartbeat request; may carry a probe string.
    Ping(Option<String>),
    /// Heartbeat response; echoes the ping probe.
    Pong(Option<String>),
    /// Application payload, normally an encoded [`SocketPacket`].
    Message(String),
    Upgrade,
    Noop,
}

/// A single Socket.IO packet.
#[derive(Clone, Debug, PartialEq)]
pub enum SocketPacket {
    /// Namespace connect request (client) or acceptance (server).
    Connect { namespace: String, data: Option<Value> },
    Disconnect { namespace: String },
    /// Named event with positional arguments.
    Event { namespace: String, id: Option<u64>, name: String, args: Vec<Value> },
    Ack { namespace: String, id: u64, args: Vec<Value> },
    /// Server refused the namespace connection.
    ConnectError { namespace: String, message: String },
}

impl SocketPacket {
    /// Build an event on the default namespace with a single payload argument.
    #[must_use]
    pub fn event(name: &str, payload: Value) -> Self {
        Self::Event {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            id: None,
            name: name.to_owned(),
            args: vec![payload],
        }
    }

    /// Build a connect request for the default namespace.
    #[must_use]
    pub fn connect() -> Self {
        Self::Connect { namespace: DEFAULT_NAMESPACE.to_owned(), data: None }
    }
}

/// Encode an Engine.IO packet to its text form.
#[must_use]
pub fn encode_engine(packet: &EnginePacket) -> String {
    match packet {
        // Serializing a plain struct of strings and integers cannot fail.
        EnginePacket::Open(handshake) => {
            format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
        }
        EnginePacket::Close => "1".to_owned(),
        EnginePacket::Ping(probe) => format!("2{}", probe.as_deref().unwrap_or_default()),
        EnginePacket::Pong(probe) => format!("3{}", probe.as_deref().unwrap_or_default()),
        EnginePacket::Message(body) => format!("4{body}"),
        EnginePacket::Upgrade => "5".to_owned(),
        EnginePacket::Noop => "6".to_owned(),
    }
}

/// Decode one Engine.IO packet.
///
/// # Errors
///
/// Returns [`CodecError::Empty`] for empty input, [`CodecError::UnknownType`]
/// for an unrecognised type character, [`CodecError::UnsupportedBinary`] for
/// base64 binary packets and [`CodecError::Json`] for a malformed handshake.
pub fn decode_engine(text: &str) -> Result<EnginePacket, CodecError> {
    let Some(kind) = text.chars().next() else {
        return Err(CodecError::Empty);
    };
    let body = &text[kind.len_utf8()..];

    match kind {
        '0' => Ok(EnginePacket::Open(serde_json::from_str(body)?)),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(probe(body))),
        '3' => Ok(EnginePacket::Pong(probe(body))),
        '4' => Ok(EnginePacket::Message(body.to_owned())),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        'b' => Err(CodecError::UnsupportedBinary),
        other => Err(CodecError::UnknownType(other)),
    }
}

/// Join packets into a long-polling request body.
#[must_use]
pub fn encode_payload(packets: &[EnginePacket]) -> String {
    packets
        .iter()
        .map(encode_engine)
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string())
}

/// Split a long-polling response body into its raw packet texts.
///
/// Decoding is left to the caller so one malformed packet does not discard
/// the rest of the batch.
pub fn split_payload(body: &str) -> impl Iterator<Item = &str> {
    body.split(RECORD_SEPARATOR).filter(|part| !part.is_empty())
}

/// Decode every packet of a long-polling response body.
///
/// # Errors
///
/// Fails on the first packet that does not decode.
pub fn decode_payload(body: &str) -> Result<Vec<EnginePacket>, CodecError> {
    split_payload(body).map(decode_engine).collect()
}

/// Encode a Socket.IO packet to the text carried in an Engine.IO message.
#[must_use]
pub fn encode_socket(packet: &SocketPacket) -> String {
    match packet {
        SocketPacket::Connect { namespace, data } => {
            let json = data.as_ref().map(Value::to_string).unwrap_or_default();
            format!("0{}{json}", namespace_prefix(namespace))
        }
        SocketPacket::Disconnect { namespace } => {
            format!("1{}", namespace_prefix(namespace))
        }
        SocketPacket::Event { namespace, id, name, args } => {
            let mut items = Vec::with_capacity(args.len() + 1);
            items.push(Value::String(name.clone()));
            items.extend(args.iter().cloned());
            let id = id.map(|n| n.to_string()).unwrap_or_default();
            format!("2{}{id}{}", namespace_prefix(namespace), Value::Array(items))
        }
        SocketPacket::Ack { namespace, id, args } => {
            format!("3{}{id}{}", namespace_prefix(namespace), Value::Array(args.clone()))
        }
        SocketPacket::ConnectError { namespace, message } => {
            let json = serde_json::json!({ "message": message });
            format!("4{}{json}", namespace_prefix(namespace))
        }
    }
}

/// Decode the Socket.IO packet carried in an Engine.IO message body.
///
/// # Errors
///
/// Returns [`CodecError::Empty`] for empty input,
/// [`CodecError::UnknownType`] for an unrecognised type digit,
/// [`CodecError::UnsupportedBinary`] for binary events/acks,
/// [`CodecError::Json`] for malformed data, [`CodecError::InvalidEvent`]
/// for an event without a name and [`CodecError::MissingAckId`] for an ack
/// without an id.
pub fn decode_socket(text: &str) -> Result<SocketPacket, CodecError> {
    let Some(kind) = text.chars().next() else {
        return Err(CodecError::Empty);
    };
    match kind {
        '0'..='4' => {}
        '5' | '6' => return Err(CodecError::UnsupportedBinary),
        other => return Err(CodecError::UnknownType(other)),
    }

    let mut rest = &text[1..];

    let namespace = if rest.starts_with('/') {
        let end = rest.find(',').unwrap_or(rest.len());
        let ns = rest[..end].to_owned();
        rest = rest.get(end + 1..).unwrap_or_default();
        ns
    } else {
        DEFAULT_NAMESPACE.to_owned()
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let id = rest[..digits].parse::<u64>().ok();
    rest = &rest[digits..];

    let data = if rest.is_empty() { None } else { Some(serde_json::from_str::<Value>(rest)?) };

    match kind {
        '0' => Ok(SocketPacket::Connect { namespace, data }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let Some(Value::Array(mut items)) = data else {
                return Err(CodecError::InvalidEvent);
            };
            if items.is_empty() {
                return Err(CodecError::InvalidEvent);
            }
            let Value::String(name) = items.remove(0) else {
                return Err(CodecError::InvalidEvent);
            };
            Ok(SocketPacket::Event { namespace, id, name, args: items })
        }
        '3' => {
            let id = id.ok_or(CodecError::MissingAckId)?;
            let args = match data {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            Ok(SocketPacket::Ack { namespace, id, args })
        }
        _ => Ok(SocketPacket::ConnectError { namespace, message: connect_error_message(data) }),
    }
}

fn probe(body: &str) -> Option<String> {
    if body.is_empty() { None } else { Some(body.to_owned()) }
}

/// Non-default namespaces are written before the payload, always followed by
/// a comma.
fn namespace_prefix(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE || namespace.is_empty() {
        String::new()
    } else {
        format!("{namespace},")
    }
}

/// Protocol v5 sends `{"message": ...}`; older servers send a bare string.
fn connect_error_message(data: Option<Value>) -> String {
    match data {
        Some(Value::String(message)) => message,
        Some(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("connection rejected")
            .to_owned(),
        _ => "connection rejected".to_owned(),
    }
}
