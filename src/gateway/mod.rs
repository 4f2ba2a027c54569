// WebSocket gateway module
// Tracks live connections and emits lifecycle events

pub mod registry;
pub mod server;

pub use registry::{ConnectionRecord, ConnectionTable, RegistryError};
pub use server::{ConnectDecision, ConnectOutcome, GatewayHandle, GatewayServer, NotificationStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbound confirmation emitted after a connection is accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedEvent {
    pub event: String,
    pub connection_id: String,
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ConnectedEvent {
    #[inline]
    pub fn new(connection_id: &str) -> Self {
        Self {
            event: "connected".to_string(),
            connection_id: connection_id.to_string(),
            status: "connected".to_string(),
            message: "Gateway WebSocket connection established".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Outbound error event emitted when a connection cannot be established
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub event: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorEvent {
    #[inline]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self {
            event: "error".to_string(),
            kind: "connection_error".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
