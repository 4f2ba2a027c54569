
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Metadata recorded for one live gateway connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRecord {
    /// Identifier generated by the registry, unique per connect event
    pub connection_id: String,
    pub connected_at: DateTime<Utc>,
    pub client_ip: IpAddr,
    /// Value of the Origin header at handshake time, "unknown" if absent
    pub origin: String,
    /// Identifier assigned by the transport layer for this session
    pub session_id: String,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("connection table is full ({0} active connections)")]
    AtCapacity(usize),
}

/// Table of active connections keyed by connection id.
///
/// Owned by the gateway server rather than living in process-global state;
/// all mutation goes through this type, which guards the map with an async
/// RwLock. Contents are in-memory only and lost on restart.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    /// 0 means unbounded
    max_connections: usize,
    inner: RwLock<HashMap<String, ConnectionRecord>>,
}

impl ConnectionTable {
    #[inline]
    pub fn new(max_connections: usize) -> Self {
        Self {
            max_connections,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Record a new connection, generating a fresh connection id for it.
    #[inline]
    pub async fn add(
        &self,
        client_ip: IpAddr,
        origin: &str,
        session_id: &str,
    ) -> Result<ConnectionRecord, RegistryError> {
        let mut inner = self.inner.write().await;

        if self.max_connections > 0 && inner.len() >= self.max_connections {
            return Err(RegistryError::AtCapacity(inner.len()));
        }

        let record = ConnectionRecord {
            connection_id: Uuid::new_v4().to_string(),
            connected_at: Utc::now(),
            client_ip,
            origin: origin.to_string(),
            session_id: session_id.to_string(),
        };

        debug!(
            "Registering connection {} for session {}",
            record.connection_id, record.session_id
        );
        inner.insert(record.connection_id.clone(), record.clone());
        Ok(record)
    }

    /// Remove and return the record whose transport session id matches.
    ///
    /// Scans the table linearly; connection volume is expected to stay small
    /// enough that a secondary session index is not worth the bookkeeping.
    #[inline]
    pub async fn remove_by_session(&self, session_id: &str) -> Option<ConnectionRecord> {
        let mut inner = self.inner.write().await;

        let connection_id = inner
            .iter()
            .find(|(_, record)| record.session_id == session_id)
            .map(|(id, _)| id.clone())?;

        inner.remove(&connection_id)
    }

    /// Look up a connection record by its connection id
    #[inline]
    pub async fn get(&self, connection_id: &str) -> Option<ConnectionRecord> {
        self.inner.read().await.get(connection_id).cloned()
    }

    #[inline]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    #[inline]
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
