//! Chat client configuration.
//!
//! Defaults describe the fixed page setup (socket path, transports, widget
//! element ids). A host page can override a few of them with
//! `<meta name="chat-..." content="...">` tags; see [`ChatConfig::from_lookup`].

pub const DEFAULT_SOCKET_PATH: &str = "/socket.io";
pub const DEFAULT_SWAP_EVENT: &str = "htmx:afterSwap";
pub const DEFAULT_LIST_ID: &str = "chat";
pub const DEFAULT_COMPOSER_ID: &str = "msg";
pub const DEFAULT_SEND_ID: &str = "send-btn";
pub const AUTOSIZE_MAX_PX: u32 = 160;
pub const DEFAULT_RECONNECT_INITIAL_MS: u32 = 1000;
pub const DEFAULT_RECONNECT_MAX_MS: u32 = 10_000;

pub const KEY_SOCKET_PATH: &str = "chat-socket-path";
pub const KEY_TRANSPORTS: &str = "chat-transports";
pub const KEY_CREDENTIALS: &str = "chat-credentials";
pub const KEY_SWAP_EVENT: &str = "chat-swap-event";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown transport: {0}")]
    UnknownTransport(String),
    #[error("no transports configured")]
    NoTransports,
    #[error("invalid value for {key}: {value}")]
    InvalidFlag { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    WebSocket,
    Polling,
}

impl TransportKind {
    /// Name used in the Engine.IO `transport` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebSocket => "websocket",
            Self::Polling => "polling",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_ms: u32,
    pub max_ms: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { initial_ms: DEFAULT_RECONNECT_INITIAL_MS, max_ms: DEFAULT_RECONNECT_MAX_MS }
    }
}

/// How the single page connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Endpoint path on the page origin.
    pub path: String,
    /// Transports in the order they are attempted.
    pub transports: Vec<TransportKind>,
    /// Send cookies with long-polling requests.
    pub with_credentials: bool,
    pub reconnect: ReconnectPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SOCKET_PATH.to_owned(),
            transports: vec![TransportKind::WebSocket, TransportKind::Polling],
            with_credentials: true,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Element ids of the chat widget inside a bind scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetIds {
    pub list: String,
    pub composer: String,
    pub send: String,
}

impl Default for WidgetIds {
    fn default() -> Self {
        Self {
            list: DEFAULT_LIST_ID.to_owned(),
            composer: DEFAULT_COMPOSER_ID.to_owned(),
            send: DEFAULT_SEND_ID.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub connection: ConnectionConfig,
    pub widget: WidgetIds,
    pub autosize_max_px: u32,
    /// DOM event announcing that a subtree was replaced.
    pub swap_event: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            widget: WidgetIds::default(),
            autosize_max_px: AUTOSIZE_MAX_PX,
            swap_event: DEFAULT_SWAP_EVENT.to_owned(),
        }
    }
}

impl ChatConfig {
    /// Build config from a key lookup, falling back to defaults per key.
    ///
    /// Recognised keys:
    /// - `chat-socket-path`: endpoint path, default `/socket.io`
    /// - `chat-transports`: comma-separated `websocket` / `polling`
    /// - `chat-credentials`: `true` (default) or `false`
    /// - `chat-swap-event`: subtree-replaced event, default `htmx:afterSwap`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unknown transport, an empty transport
    /// list or a credentials flag that is not a boolean.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = non_empty(lookup(KEY_SOCKET_PATH)) {
            config.connection.path = normalize_path(&path);
        }
        if let Some(raw) = non_empty(lookup(KEY_TRANSPORTS)) {
            config.connection.transports = parse_transports(&raw)?;
        }
        if let Some(raw) = non_empty(lookup(KEY_CREDENTIALS)) {
            config.connection.with_credentials = parse_flag(KEY_CREDENTIALS, &raw)?;
        }
        if let Some(event) = non_empty(lookup(KEY_SWAP_EVENT)) {
            config.swap_event = event;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.starts_with('/') { trimmed.to_owned() } else { format!("/{trimmed}") }
}

fn parse_transports(raw: &str) -> Result<Vec<TransportKind>, ConfigError> {
    let mut transports = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let kind = match name.to_ascii_lowercase().as_str() {
            "websocket" => TransportKind::WebSocket,
            "polling" => TransportKind::Polling,
            _ => return Err(ConfigError::UnknownTransport(name.to_owned())),
        };
        if !transports.contains(&kind) {
            transports.push(kind);
        }
    }
    if transports.is_empty() {
        return Err(ConfigError::NoTransports);
    }
    Ok(transports)
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { key, value: raw.to_owned() }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
