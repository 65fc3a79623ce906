//! RealtimeHub - in-process realtime client registry

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use contracts::{Broadcaster, ContractError, RealtimeClient, RealtimeMessage, UserId};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

struct ClientState {
    id: String,
    /// Authenticated identity, None for anonymous connections
    user_id: RwLock<Option<UserId>>,
    topics: RwLock<HashSet<String>>,
    tx: mpsc::Sender<RealtimeMessage>,
}

/// Shared handle to one connected client
#[derive(Clone)]
pub struct ClientHandle {
    state: Arc<ClientState>,
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.state.id)
            .field("user_id", &*self.state.user_id.read())
            .finish()
    }
}

impl ClientHandle {
    pub fn subscribe(&self, topic: impl Into<String>) {
        self.state.topics.write().insert(topic.into());
    }

    pub fn unsubscribe(&self, topic: &str) {
        self.state.topics.write().remove(topic);
    }

    /// Re-authenticate the connection
    pub fn set_user_id(&self, user_id: Option<UserId>) {
        *self.state.user_id.write() = user_id;
    }

    /// Receiver side dropped
    pub fn is_closed(&self) -> bool {
        self.state.tx.is_closed()
    }
}

impl RealtimeClient for ClientHandle {
    fn id(&self) -> &str {
        &self.state.id
    }

    fn user_id(&self) -> Option<UserId> {
        self.state.user_id.read().clone()
    }

    fn is_subscribed(&self, topic: &str) -> bool {
        self.state.topics.read().contains(topic)
    }

    /// Never blocks; a full buffer drops the message
    fn send(&self, message: RealtimeMessage) -> Result<(), ContractError> {
        self.state.tx.try_send(message).map_err(|e| {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "buffer full",
                mpsc::error::TrySendError::Closed(_) => "disconnected",
            };
            ContractError::realtime_send(&self.state.id, reason)
        })
    }
}

/// Registry of connected realtime clients
pub struct RealtimeHub {
    clients: RwLock<HashMap<String, ClientHandle>>,
    /// Per-client outbound buffer
    buffer: usize,
}

impl RealtimeHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Register a client; messages for it arrive on the returned receiver
    pub fn connect(
        &self,
        user_id: Option<UserId>,
    ) -> (ClientHandle, mpsc::Receiver<RealtimeMessage>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let handle = ClientHandle {
            state: Arc::new(ClientState {
                id: Uuid::new_v4().simple().to_string(),
                user_id: RwLock::new(user_id),
                topics: RwLock::new(HashSet::new()),
                tx,
            }),
        };
        debug!(client = %handle.id(), user = ?handle.user_id(), "Realtime client connected");
        self.clients
            .write()
            .insert(handle.id().to_string(), handle.clone());
        (handle, rx)
    }

    pub fn disconnect(&self, client_id: &str) -> bool {
        let removed = self.clients.write().remove(client_id).is_some();
        if removed {
            debug!(client = %client_id, "Realtime client disconnected");
        }
        removed
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Drop clients whose receiver is gone
    fn prune_closed(&self) {
        let mut clients = self.clients.write();
        let before = clients.len();
        clients.retain(|_, client| !client.is_closed());
        let pruned = before - clients.len();
        if pruned > 0 {
            warn!(pruned, "Removed disconnected realtime clients");
        }
    }
}

impl Broadcaster for RealtimeHub {
    type Client = ClientHandle;

    fn clients(&self) -> Vec<ClientHandle> {
        self.prune_closed();
        self.clients.read().values().cloned().collect()
    }
}
