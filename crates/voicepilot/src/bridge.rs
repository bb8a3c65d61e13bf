//! Message channel to the page runtime.
//!
//! The orchestrator never talks to a document directly; it sends
//! [`PageRequest`]s through a [`PageChannel`] and treats every failure mode
//! (no receiver, malformed reply, timeout) as "content script absent",
//! which triggers the next fallback tier rather than an error. Two
//! implementations: [`LocalPage`] drives an in-process [`PageRuntime`]
//! (tests, embedding), and [`WsBridge`] serves a WebSocket endpoint a
//! browser-side client connects to.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{CommandError, Result};
use crate::page::{PageRequest, PageResponse, PageRuntime};

/// Ping round-trip budget; silence means the page capability is absent
pub const PING_TIMEOUT: Duration = Duration::from_secs(1);
/// Budget for an element inventory extraction
pub const ELEMENTS_TIMEOUT: Duration = Duration::from_secs(3);
/// Budget for an element interaction (includes the settle delay)
pub const INTERACT_TIMEOUT: Duration = Duration::from_secs(3);
/// Budget for scroll commands
pub const SCROLL_TIMEOUT: Duration = Duration::from_secs(2);

const ATTACH_SETTLE: Duration = Duration::from_millis(300);

/// Request/response channel to a specific page
#[async_trait]
pub trait PageChannel: Send + Sync {
    /// Deliver a request and wait for its structured reply, bounded by
    /// `timeout`. A timeout is equivalent to failure.
    async fn request(&self, request: PageRequest, timeout: Duration) -> Result<PageResponse>;

    /// Re-establish the page capability if it is absent (the injection
    /// analogue). Idempotent and safe to call redundantly.
    async fn attach(&self) -> Result<()> {
        Ok(())
    }
}

/// Verify the page capability responds, re-attaching once if it does not.
/// Ping-then-inject, idempotent; every interaction path runs this because
/// content presence does not survive navigations.
pub async fn ensure_page_ready(channel: &dyn PageChannel) -> Result<()> {
    if let Ok(response) = channel.request(PageRequest::Ping, PING_TIMEOUT).await {
        if response.is_pong() {
            return Ok(());
        }
    }

    debug!("page did not answer ping, re-attaching");
    channel.attach().await?;
    tokio::time::sleep(ATTACH_SETTLE).await;

    match channel.request(PageRequest::Ping, PING_TIMEOUT).await {
        Ok(response) if response.is_pong() => Ok(()),
        Ok(_) => Err(CommandError::ContentScriptUnavailable(
            "unexpected ping response".to_string(),
        )),
        Err(err) => Err(CommandError::ContentScriptUnavailable(err.to_string())),
    }
}

/// In-process channel wrapping a [`PageRuntime`] directly
pub struct LocalPage {
    runtime: Arc<PageRuntime>,
}

impl LocalPage {
    pub fn new(runtime: Arc<PageRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl PageChannel for LocalPage {
    async fn request(&self, request: PageRequest, timeout: Duration) -> Result<PageResponse> {
        tokio::time::timeout(timeout, self.runtime.handle(request))
            .await
            .map_err(|_| CommandError::Timeout(timeout, "page reply".to_string()))
    }
}

type BridgeResult = std::result::Result<serde_json::Value, String>;
type PendingMap = HashMap<String, oneshot::Sender<BridgeResult>>;
type Pending = Arc<Mutex<PendingMap>>;
type Clients = Arc<Mutex<Vec<Client>>>;

struct Client {
    sender: mpsc::UnboundedSender<Message>,
    connected_at: std::time::Instant,
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    id: &'a str,
    #[serde(flatten)]
    request: &'a PageRequest,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BridgeIncoming {
    Reply {
        id: String,
        ok: bool,
        #[serde(default)]
        result: Option<serde_json::Value>,
        #[serde(default)]
        error: Option<String>,
    },
    Typed(TypedIncoming),
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum TypedIncoming {
    #[serde(rename = "hello")]
    Hello { from: Option<String> },
    #[serde(rename = "pong")]
    Pong,
}

/// WebSocket bridge: a local server the browser-side client connects to.
/// Requests carry a uuid and resolve through a pending map when the
/// matching reply arrives; the most recently connected client wins.
pub struct WsBridge {
    _server_task: JoinHandle<()>,
    clients: Clients,
    pending: Pending,
}

impl WsBridge {
    pub async fn start(addr: &str) -> std::io::Result<WsBridge> {
        let clients: Clients = Arc::new(Mutex::new(Vec::new()));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "page bridge listening");

        let clients_for_task = clients.clone();
        let pending_for_task = pending.clone();
        let server_task = tokio::spawn(async move {
            loop {
                let Ok((stream, peer)) = listener.accept().await else {
                    break;
                };
                debug!(%peer, "bridge connection accepted");

                let clients = clients_for_task.clone();
                let pending = pending_for_task.clone();
                tokio::spawn(async move {
                    let ws = match accept_async(stream).await {
                        Ok(ws) => ws,
                        Err(err) => {
                            warn!(%err, "websocket handshake failed");
                            return;
                        }
                    };
                    let (mut sink, mut source) = ws.split();
                    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

                    clients.lock().await.push(Client {
                        sender: tx,
                        connected_at: std::time::Instant::now(),
                    });

                    let writer = tokio::spawn(async move {
                        while let Some(message) = rx.recv().await {
                            if sink.send(message).await.is_err() {
                                break;
                            }
                        }
                    });

                    while let Some(Ok(message)) = source.next().await {
                        let Message::Text(text) = message else {
                            continue;
                        };
                        match serde_json::from_str::<BridgeIncoming>(&text) {
                            Ok(BridgeIncoming::Reply {
                                id,
                                ok,
                                result,
                                error,
                            }) => {
                                if let Some(sender) = pending.lock().await.remove(&id) {
                                    let outcome = if ok {
                                        Ok(result.unwrap_or(serde_json::Value::Null))
                                    } else {
                                        Err(error.unwrap_or_else(|| "unknown error".to_string()))
                                    };
                                    let _ = sender.send(outcome);
                                }
                            }
                            Ok(BridgeIncoming::Typed(TypedIncoming::Hello { from })) => {
                                info!(?from, "page client said hello");
                            }
                            Ok(BridgeIncoming::Typed(TypedIncoming::Pong)) => {}
                            Err(err) => {
                                debug!(%err, "ignoring unparseable bridge message");
                            }
                        }
                    }

                    writer.abort();
                    debug!(%peer, "bridge connection closed");
                });
            }
        });

        Ok(WsBridge {
            _server_task: server_task,
            clients,
            pending,
        })
    }

    async fn send_to_latest_client(&self, payload: String) -> bool {
        let mut clients = self.clients.lock().await;
        clients.retain(|c| !c.sender.is_closed());
        match clients.last() {
            Some(client) => {
                debug!(
                    connected_at = ?client.connected_at,
                    "sending request to most recent page client"
                );
                client.sender.send(Message::Text(payload)).is_ok()
            }
            None => false,
        }
    }

    async fn connected(&self) -> bool {
        let mut clients = self.clients.lock().await;
        clients.retain(|c| !c.sender.is_closed());
        !clients.is_empty()
    }
}

#[async_trait]
impl PageChannel for WsBridge {
    async fn request(&self, request: PageRequest, timeout: Duration) -> Result<PageResponse> {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel::<BridgeResult>();
        self.pending.lock().await.insert(id.clone(), tx);

        let payload = serde_json::to_string(&BridgeRequest {
            id: &id,
            request: &request,
        })?;

        if !self.send_to_latest_client(payload).await {
            self.pending.lock().await.remove(&id);
            return Err(CommandError::ContentScriptUnavailable(
                "no connected page client".to_string(),
            ));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(value))) => {
                serde_json::from_value(value).map_err(CommandError::Serialization)
            }
            Ok(Ok(Err(err))) => Err(CommandError::ContentScriptUnavailable(err)),
            Ok(Err(_canceled)) => Err(CommandError::ChannelClosed(
                "reply channel canceled".to_string(),
            )),
            Err(_elapsed) => {
                self.pending.lock().await.remove(&id);
                warn!(%id, "timed out waiting for page reply");
                Err(CommandError::Timeout(timeout, "page reply".to_string()))
            }
        }
    }

    /// Wait briefly for a client to (re)connect; the injection analogue
    /// for a transport where the page side attaches on its own.
    async fn attach(&self) -> Result<()> {
        const MAX_WAIT: Duration = Duration::from_secs(3);
        const INTERVAL: Duration = Duration::from_millis(250);
        let start = tokio::time::Instant::now();

        while start.elapsed() < MAX_WAIT {
            if self.connected().await {
                return Ok(());
            }
            tokio::time::sleep(INTERVAL).await;
        }
        Err(CommandError::ContentScriptUnavailable(
            "no page client connected".to_string(),
        ))
    }
}
