//! Client broadcast hub
//!
//! Membership only: each client is an id plus the sending half of the channel
//! its WebSocket task drains. Events are serialized once per broadcast.
//! Each queue is bounded; a client that stops reading loses events instead
//! of growing the queue.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::protocol::ServerEvent;

/// Outbound events buffered per client before new ones are dropped
pub const CLIENT_QUEUE_CAPACITY: usize = 256;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque client identifier, unique for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    pub fn next() -> Self {
        ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Outbound side of one client connection
#[derive(Debug, Clone)]
pub struct ClientConnection {
    pub id: ClientId,
    tx: mpsc::Sender<String>,
}

impl ClientConnection {
    /// New connection with a fresh id
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self {
            id: ClientId::next(),
            tx,
        }
    }

    /// False once the connection task has gone away
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a serialized event without waiting. Returns false if the
    /// connection is gone or its queue is full.
    pub fn send_text(&self, text: String) -> bool {
        match self.tx.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(client = %self.id, "Client queue full, dropping event");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Set of connected clients
#[derive(Debug, Default)]
pub struct ClientHub {
    clients: HashMap<ClientId, ClientConnection>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client. Adding an id twice keeps the first connection.
    pub fn add(&mut self, client: ClientConnection) -> bool {
        if self.clients.contains_key(&client.id) {
            return false;
        }
        self.clients.insert(client.id, client);
        true
    }

    /// Deregister a client; unknown ids are ignored
    pub fn remove(&mut self, id: ClientId) -> bool {
        self.clients.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    /// Send to every open client. Returns the number of clients reached.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        let text = match event.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize event: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        for client in self.clients.values() {
            if !client.is_open() {
                continue;
            }
            if client.send_text(text.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Send to one client. Returns false if the client is unknown or closed.
    pub fn send_to(&self, id: ClientId, event: &ServerEvent) -> bool {
        let Some(client) = self.clients.get(&id) else {
            return false;
        };
        match event.to_json() {
            Ok(text) => client.send_text(text),
            Err(e) => {
                warn!("Failed to serialize event: {}", e);
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.clients.clear();
    }
}
