
use super::registry::ConnectionTable;
use super::{ConnectedEvent, ConnectionRecord, ErrorEvent};
use crate::config::GatewayConfig;
use crate::{Result, VaultError};
use futures::{Sink, SinkExt, StreamExt};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Outcome of a connect event.
///
/// The accept/reject decision and the delivery of the lifecycle event are
/// reported separately: a connection can be accepted even when the
/// confirmation event failed to send, and both outcomes are assertable on
/// their own.
#[derive(Debug)]
pub struct ConnectOutcome {
    pub decision: ConnectDecision,
    pub notification: NotificationStatus,
}

#[derive(Debug)]
pub enum ConnectDecision {
    Accepted(ConnectionRecord),
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Delivered,
    Failed(String),
}

/// WebSocket gateway server owning the connection table.
pub struct GatewayServer {
    config: GatewayConfig,
    table: Arc<ConnectionTable>,
}

impl GatewayServer {
    #[inline]
    pub fn new(config: GatewayConfig) -> Self {
        let table = Arc::new(ConnectionTable::new(config.max_connections));
        Self { config, table }
    }

    #[inline]
    pub fn connection_table(&self) -> Arc<ConnectionTable> {
        Arc::clone(&self.table)
    }

    /// Bind the listener and spawn the accept loop.
    #[inline]
    pub async fn start(&self) -> Result<GatewayHandle> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| VaultError::Gateway(format!("Failed to bind {}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| VaultError::Gateway(format!("Failed to read local address: {}", e)))?;
        info!("Gateway listening on {}", local_addr);

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let table = Arc::clone(&self.table);
        let accept_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, peer)) => {
                                let table = Arc::clone(&table);
                                tokio::spawn(handle_connection(stream, peer, table));
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Shutting down gateway server");
                        break;
                    }
                }
            }
        });

        Ok(GatewayHandle {
            address: local_addr,
            table: Arc::clone(&self.table),
            shutdown_tx,
            accept_handle: Some(accept_handle),
        })
    }
}

/// Handle to a running gateway server.
pub struct GatewayHandle {
    address: SocketAddr,
    table: Arc<ConnectionTable>,
    shutdown_tx: mpsc::Sender<()>,
    accept_handle: Option<tokio::task::JoinHandle<()>>,
}

impl GatewayHandle {
    #[inline]
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    #[inline]
    pub fn connection_table(&self) -> Arc<ConnectionTable> {
        Arc::clone(&self.table)
    }

    #[inline]
    pub async fn connection_count(&self) -> usize {
        self.table.len().await
    }

    /// Stop accepting new connections. Established connections wind down as
    /// their clients disconnect.
    #[inline]
    pub async fn shutdown(mut self) -> Result<()> {
        self.shutdown_tx.send(()).await.ok();

        if let Some(handle) = self.accept_handle.take() {
            handle.abort();
        }

        info!("Gateway shutdown complete");
        Ok(())
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, table: Arc<ConnectionTable>) {
    debug!("New connection attempt from {}", peer);

    let mut origin = "unknown".to_string();
    let callback = |req: &Request, resp: Response| {
        if let Some(value) = req.headers().get("Origin").and_then(|v| v.to_str().ok()) {
            origin = value.to_string();
        }
        Ok(resp)
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake failed for {}: {}", peer, e);
            return;
        }
    };

    // The transport session id is assigned at handshake time and is distinct
    // from the connection id the registry generates.
    let session_id = format!("sess-{}", Uuid::new_v4());

    info!(
        "Gateway connection attempt from {} (Origin: {})",
        peer.ip(),
        origin
    );

    let (mut sink, mut source) = ws_stream.split();

    let outcome = connect(&table, peer.ip(), &origin, &session_id, &mut sink).await;
    if let NotificationStatus::Failed(reason) = &outcome.notification {
        warn!(
            "Failed to deliver lifecycle event for session {}: {}",
            session_id, reason
        );
    }

    let connection_id = match outcome.decision {
        ConnectDecision::Accepted(record) => record.connection_id,
        ConnectDecision::Rejected(reason) => {
            warn!("Rejected connection from {}: {}", peer, reason);
            sink.close().await.ok();
            return;
        }
    };

    info!(
        "Gateway connection established - Connection ID: {}, SID: {}",
        connection_id, session_id
    );

    while let Some(msg) = source.next().await {
        match msg {
            Ok(Message::Ping(data)) => {
                sink.send(Message::Pong(data)).await.ok();
            }
            Ok(Message::Close(_)) => {
                debug!("Connection {} closing", connection_id);
                break;
            }
            Ok(Message::Text(text)) => {
                // The lifecycle protocol defines no inbound events
                debug!("Ignoring inbound message on {}: {}", connection_id, text);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Error receiving message on {}: {}", connection_id, e);
                break;
            }
        }
    }

    disconnect(&table, &session_id).await;
}

/// Handle a connect event: register the connection and emit the lifecycle
/// event. Event delivery is best-effort in both the accept and the reject
/// path; its outcome never changes the decision.
pub(crate) async fn connect<S>(
    table: &ConnectionTable,
    client_ip: IpAddr,
    origin: &str,
    session_id: &str,
    sink: &mut S,
) -> ConnectOutcome
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match table.add(client_ip, origin, session_id).await {
        Ok(record) => {
            let event = ConnectedEvent::new(&record.connection_id);
            let notification = send_event(sink, &event).await;
            ConnectOutcome {
                decision: ConnectDecision::Accepted(record),
                notification,
            }
        }
        Err(e) => {
            error!("Error handling gateway connection: {}", e);
            let event =
                ErrorEvent::connection_error(format!("Failed to establish gateway connection: {}", e));
            let notification = send_event(sink, &event).await;
            ConnectOutcome {
                decision: ConnectDecision::Rejected(e.to_string()),
                notification,
            }
        }
    }
}

/// Handle a disconnect event. Never fails toward the transport layer.
pub(crate) async fn disconnect(table: &ConnectionTable, session_id: &str) {
    match table.remove_by_session(session_id).await {
        Some(record) => {
            info!(
                "Gateway disconnected - Connection ID: {}, SID: {}",
                record.connection_id, session_id
            );
        }
        None => {
            warn!("Gateway disconnect for unknown SID: {}", session_id);
        }
    }
}

async fn send_event<S, E>(sink: &mut S, event: &E) -> NotificationStatus
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
    E: Serialize,
{
    match serde_json::to_string(event) {
        Ok(json) => match sink.send(Message::Text(json)).await {
            Ok(()) => NotificationStatus::Delivered,
            Err(e) => NotificationStatus::Failed(e.to_string()),
        },
        Err(e) => NotificationStatus::Failed(e.to_string()),
    }
}
