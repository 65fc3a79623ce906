//! Realtime collaborator - live dashboard clients
//!
//! The client registry and its wire transport live outside the relay; the
//! broadcast loop only enumerates, filters and pushes.

use bytes::Bytes;

use crate::{ContractError, UserId};

/// Opaque "data changed, re-fetch" payload
pub const REFRESH_SIGNAL: &[u8] = b"refresh";

/// Message pushed to one realtime client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeMessage {
    /// Topic the message is published under
    pub topic: String,
    pub data: Bytes,
}

impl RealtimeMessage {
    /// Fixed refresh signal for a topic
    pub fn refresh(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            data: Bytes::from_static(REFRESH_SIGNAL),
        }
    }
}

/// A currently connected realtime client
pub trait RealtimeClient: Send + Sync {
    fn id(&self) -> &str;

    /// Authenticated user, `None` for anonymous connections
    fn user_id(&self) -> Option<UserId>;

    fn is_subscribed(&self, topic: &str) -> bool;

    /// Hand a message to the client without waiting on its connection
    fn send(&self, message: RealtimeMessage) -> Result<(), ContractError>;
}

/// Registry of connected realtime clients
pub trait Broadcaster: Send + Sync {
    type Client: RealtimeClient;

    /// Snapshot of the clients connected right now
    fn clients(&self) -> Vec<Self::Client>;
}
