//! Page-wide realtime connection ownership.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`ConnectionManager`] lazily opens the single event-stream connection for
//! the page through a [`Connector`]. The connector receives the
//! [`Reactions`] exactly once, at creation time, and runs them as lifecycle
//! events arrive; the reactions are the only writers of
//! [`ConnectionState`] and forward health changes and inbound messages to the
//! registered [`Dependents`].
//!
//! The manager never gates emission on connection health. Callers check
//! [`ConnectionManager::is_connected`] first.

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;

use std::cell::{Cell, OnceCell};
use std::rc::Rc;

use serde_json::Value;

use crate::config::ConnectionConfig;
use crate::message::Message;

/// Outbound chat event.
pub const SEND_EVENT: &str = "send_message";
/// Inbound chat event.
pub const RECEIVE_EVENT: &str = "receive_message";

/// Whether the page connection is currently usable.
#[derive(Debug, Default)]
pub struct ConnectionState {
    connected: Cell<bool>,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn set(&self, connected: bool) {
        self.connected.set(connected);
    }
}

/// Consumers of connection health and inbound messages.
pub trait Dependents {
    fn connection_changed(&self, connected: bool);
    fn message_received(&self, message: &Message);
}

/// An open event-stream connection.
pub trait Connection {
    /// Queue an outbound event; never blocks.
    fn emit(&self, event: &str, payload: Value);
}

/// Opens the underlying transport.
pub trait Connector {
    fn open(&self, config: &ConnectionConfig, reactions: Rc<Reactions>) -> Box<dyn Connection>;
}

/// A lifecycle notification from the transport.
#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleEvent {
    Connect,
    Disconnect(String),
    ConnectError(String),
    /// Named server event with its first argument, if any.
    Inbound { event: String, payload: Option<Value> },
}

/// The four lifecycle reactions shared with the transport.
pub struct Reactions {
    state: Rc<ConnectionState>,
    dependents: Rc<dyn Dependents>,
}

impl Reactions {
    fn new(state: Rc<ConnectionState>, dependents: Rc<dyn Dependents>) -> Self {
        Self { state, dependents }
    }

    pub fn dispatch(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Connect => self.on_connect(),
            LifecycleEvent::Disconnect(reason) => self.on_disconnect(&reason),
            LifecycleEvent::ConnectError(detail) => self.on_connect_error(&detail),
            LifecycleEvent::Inbound { event, payload } => self.on_event(&event, payload),
        }
    }

    pub fn on_connect(&self) {
        log::info!("chat connection established");
        self.update(true);
    }

    pub fn on_disconnect(&self, reason: &str) {
        log::info!("chat connection closed: {reason}");
        self.update(false);
    }

    pub fn on_connect_error(&self, detail: &str) {
        log::warn!("chat connection error: {detail}");
        self.update(false);
    }

    /// Forward `receive_message` payloads; other events are ignored.
    pub fn on_event(&self, event: &str, payload: Option<Value>) {
        if event != RECEIVE_EVENT {
            log::debug!("ignoring inbound event {event}");
            return;
        }
        let payload = payload.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        self.dependents.message_received(&Message::from_payload(&payload));
    }

    fn update(&self, connected: bool) {
        self.state.set(connected);
        self.dependents.connection_changed(connected);
    }
}

/// Owner of the page's single connection.
pub struct ConnectionManager {
    config: ConnectionConfig,
    connector: Box<dyn Connector>,
    state: Rc<ConnectionState>,
    dependents: Rc<dyn Dependents>,
    connection: OnceCell<Box<dyn Connection>>,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig, connector: Box<dyn Connector>, dependents: Rc<dyn Dependents>) -> Self {
        Self {
            config,
            connector,
            state: Rc::new(ConnectionState::default()),
            dependents,
            connection: OnceCell::new(),
        }
    }

    /// Return the connection, opening it on first use.
    pub fn ensure_connection(&self) -> &dyn Connection {
        let connection = self.connection.get_or_init(|| {
            log::debug!("opening chat connection at {}", self.config.path);
            let reactions = Rc::new(Reactions::new(self.state.clone(), self.dependents.clone()));
            self.connector.open(&self.config, reactions)
        });
        &**connection
    }

    pub fn is_open(&self) -> bool {
        self.connection.get().is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn state(&self) -> &Rc<ConnectionState> {
        &self.state
    }

    pub fn emit(&self, event: &str, payload: Value) {
        self.ensure_connection().emit(event, payload);
    }
}
