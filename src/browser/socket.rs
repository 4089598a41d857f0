//! Socket.IO connector over `gloo-net`: websocket first, long-polling as the
//! fallback.
//!
//! The connection is a local task fed by an unbounded channel of encoded
//! packets. Outbound packets stay queued until the current session has
//! connected its namespace.

use std::rc::Rc;

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{FutureExt, SinkExt, StreamExt};
use gloo_net::http::Request;
use gloo_net::websocket::Message;
use gloo_net::websocket::futures::WebSocket;
use gloo_timers::future::TimeoutFuture;
use serde_json::Value;
use web_sys::RequestCredentials;

use crate::config::{ConnectionConfig, TransportKind};
use crate::connection::{Connection, Connector, Reactions};
use crate::transport::{self, Backoff, Heartbeat, Session, SessionEnd, SessionError, Step};

pub struct SocketIoConnector;

impl Connector for SocketIoConnector {
    fn open(&self, config: &ConnectionConfig, reactions: Rc<Reactions>) -> Box<dyn Connection> {
        let (tx, rx) = mpsc::unbounded::<String>();
        wasm_bindgen_futures::spawn_local(connection_loop(config.clone(), reactions, rx));
        Box::new(SocketIoConnection { tx })
    }
}

struct SocketIoConnection {
    tx: UnboundedSender<String>,
}

impl Connection for SocketIoConnection {
    fn emit(&self, event: &str, payload: Value) {
        if self.tx.unbounded_send(transport::encode_emit(event, payload)).is_err() {
            log::warn!("chat connection stopped; dropping {event}");
        }
    }
}

/// Main connection loop with reconnect logic.
async fn connection_loop(config: ConnectionConfig, reactions: Rc<Reactions>, mut outbox: UnboundedReceiver<String>) {
    let mut backoff = Backoff::new(config.reconnect);

    loop {
        let (session, end) = attempt(&config, &reactions, &mut outbox).await;
        if session.is_connected() {
            backoff.reset();
        }
        session.finish(&end);

        if !end.should_retry() {
            log::info!("chat connection stopped: {end:?}");
            return;
        }

        let delay_ms = backoff.next_delay();
        log::debug!("reconnecting chat in {delay_ms} ms");
        TimeoutFuture::new(delay_ms).await;
    }
}

/// Try each transport in order until one completes a handshake.
async fn attempt(
    config: &ConnectionConfig,
    reactions: &Rc<Reactions>,
    outbox: &mut UnboundedReceiver<String>,
) -> (Session, SessionEnd) {
    let mut failed = None;

    for kind in &config.transports {
        let mut session = Session::new(reactions.clone());
        let result = match kind {
            TransportKind::WebSocket => run_websocket(config, &mut session, outbox).await,
            TransportKind::Polling => run_polling(config, &mut session, outbox).await,
        };
        let end = result.unwrap_or_else(SessionEnd::from);

        if session.is_handshaken() {
            return (session, end);
        }
        log::debug!("{} transport failed before handshake: {end:?}", kind.as_str());
        failed = Some((session, end));
    }

    failed.unwrap_or_else(|| {
        (Session::new(reactions.clone()), SessionEnd::Lost("no transports configured".to_owned()))
    })
}

fn transport_error(e: impl std::fmt::Display) -> SessionError {
    SessionError::Transport(e.to_string())
}

/// Waits for outbound packets only once the namespace is connected.
async fn next_outbound(outbox: &mut UnboundedReceiver<String>, connected: bool) -> Option<String> {
    if connected { outbox.next().await } else { futures::future::pending().await }
}

fn location() -> Option<(bool, String)> {
    let location = web_sys::window()?.location();
    let secure = location.protocol().ok()? == "https:";
    Some((secure, location.host().ok()?))
}

enum SocketWake {
    Inbound(Option<Result<Message, gloo_net::websocket::WebSocketError>>),
    Outbound(Option<String>),
    Heartbeat,
}

async fn run_websocket(
    config: &ConnectionConfig,
    session: &mut Session,
    outbox: &mut UnboundedReceiver<String>,
) -> Result<SessionEnd, SessionError> {
    let (secure, host) = location()
        .ok_or_else(|| SessionError::unavailable(TransportKind::WebSocket, "no window location"))?;
    let url = transport::websocket_url(secure, &host, &config.path);
    let ws = WebSocket::open(&url).map_err(|e| SessionError::unavailable(TransportKind::WebSocket, e.to_string()))?;
    let (mut write, mut read) = ws.split();
    let mut deadline = Heartbeat::new(session.heartbeat_ms(), js_sys::Date::now());

    loop {
        let wake = {
            let heartbeat_ms = deadline.remaining_ms(js_sys::Date::now());
            let inbound = read.next().fuse();
            let outbound = next_outbound(outbox, session.is_connected()).fuse();
            let heartbeat = TimeoutFuture::new(heartbeat_ms).fuse();
            futures::pin_mut!(inbound, outbound, heartbeat);
            futures::select! {
                msg = inbound => SocketWake::Inbound(msg),
                text = outbound => SocketWake::Outbound(text),
                () = heartbeat => SocketWake::Heartbeat,
            }
        };

        match wake {
            SocketWake::Inbound(Some(Ok(Message::Text(text)))) => {
                let step = session.receive(&text);
                deadline.touch(session.heartbeat_ms(), js_sys::Date::now());
                match step {
                    Step::Continue => {}
                    Step::Send(reply) => write.send(Message::Text(reply)).await.map_err(transport_error)?,
                    Step::End(end) => return Ok(end),
                }
            }
            SocketWake::Inbound(Some(Ok(Message::Bytes(_)))) => {
                deadline.touch(session.heartbeat_ms(), js_sys::Date::now());
                log::debug!("ignoring binary frame");
            }
            SocketWake::Inbound(Some(Err(e))) => return Err(transport_error(e)),
            SocketWake::Inbound(None) => return Ok(SessionEnd::Lost("transport close".to_owned())),
            SocketWake::Outbound(Some(text)) => write.send(Message::Text(text)).await.map_err(transport_error)?,
            SocketWake::Outbound(None) => return Ok(SessionEnd::Closed),
            SocketWake::Heartbeat if deadline.is_expired(js_sys::Date::now()) => {
                return Err(SessionError::HeartbeatTimeout);
            }
            SocketWake::Heartbeat => {}
        }
    }
}

enum PollWake {
    Body(Result<String, SessionError>),
    Outbound(Option<String>),
}

async fn run_polling(
    config: &ConnectionConfig,
    session: &mut Session,
    outbox: &mut UnboundedReceiver<String>,
) -> Result<SessionEnd, SessionError> {
    let credentials = config.with_credentials;

    let body = poll(transport::polling_url(&config.path, None, &cache_buster()), credentials)
        .await
        .map_err(|e| SessionError::unavailable(TransportKind::Polling, e.to_string()))?;
    let batch = session.receive_batch(&body);
    let sid = session
        .handshake()
        .map(|h| h.sid.clone())
        .ok_or_else(|| SessionError::unavailable(TransportKind::Polling, "no handshake in first poll"))?;
    post(&config.path, &sid, credentials, &batch.replies).await?;
    if let Some(end) = batch.end {
        return Ok(end);
    }

    loop {
        let pending = poll(transport::polling_url(&config.path, Some(&sid), &cache_buster()), credentials).fuse();
        futures::pin_mut!(pending);

        loop {
            let wake = {
                let outbound = next_outbound(outbox, session.is_connected()).fuse();
                futures::pin_mut!(outbound);
                futures::select! {
                    body = pending => PollWake::Body(body),
                    text = outbound => PollWake::Outbound(text),
                }
            };

            match wake {
                PollWake::Body(body) => {
                    let batch = session.receive_batch(&body?);
                    post(&config.path, &sid, credentials, &batch.replies).await?;
                    if let Some(end) = batch.end {
                        return Ok(end);
                    }
                    break;
                }
                PollWake::Outbound(Some(text)) => {
                    let mut queued = vec![text];
                    while let Ok(Some(text)) = outbox.try_next() {
                        queued.push(text);
                    }
                    post(&config.path, &sid, credentials, &queued).await?;
                }
                PollWake::Outbound(None) => return Ok(SessionEnd::Closed),
            }
        }
    }
}

fn cache_buster() -> String {
    js_sys::Date::now().to_string()
}

async fn poll(url: String, credentials: bool) -> Result<String, SessionError> {
    let mut request = Request::get(&url);
    if credentials {
        request = request.credentials(RequestCredentials::Include);
    }
    let resp = request.send().await.map_err(transport_error)?;
    if !resp.ok() {
        return Err(SessionError::Transport(format!("poll returned {}", resp.status())));
    }
    resp.text().await.map_err(transport_error)
}

/// Write encoded packets as one long-polling payload.
async fn post(path: &str, sid: &str, credentials: bool, packets: &[String]) -> Result<(), SessionError> {
    if packets.is_empty() {
        return Ok(());
    }
    let url = transport::polling_url(path, Some(sid), &cache_buster());
    let mut request = Request::post(&url).header("Content-Type", "text/plain;charset=UTF-8");
    if credentials {
        request = request.credentials(RequestCredentials::Include);
    }
    let body = packets.join(&packets::RECORD_SEPARATOR.to_string());
    let resp = request.body(body).map_err(transport_error)?.send().await.map_err(transport_error)?;
    if !resp.ok() {
        return Err(SessionError::Transport(format!("post returned {}", resp.status())));
    }
    Ok(())
}
