//! Core domain models for the chat server.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use super::{
    error::TransportError,
    value_object::{ConnectionId, GroupId, MessageType, PresenceStatus, UserId},
};

/// Non-owning handle to one live connection.
///
/// The socket itself is owned by its connection handler task; the handle only
/// holds a sender into that task's outbound queue. Dropping a handle never
/// closes the connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    sender: UnboundedSender<String>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: UnboundedSender<String>) -> Self {
        Self { id, sender }
    }

    /// Queue a serialized frame for the connection's writer.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` once the writer has stopped.
    pub fn deliver(&self, frame: String) -> Result<(), TransportError> {
        self.sender.send(frame).map_err(|_| TransportError)
    }
}

/// Identity extracted from a validated session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
}

/// Profile fields fetched from the account store on first registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub avatar: String,
    pub bio: String,
}

/// Presence of one user with at least one live connection.
///
/// The registry keeps an entry only while `connections` is non-empty.
#[derive(Debug, Clone)]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub username: String,
    pub avatar: String,
    pub bio: String,
    pub status: PresenceStatus,
    pub last_seen: DateTime<Utc>,
    pub connections: HashMap<ConnectionId, ConnectionHandle>,
}

impl PresenceEntry {
    /// Create an online entry holding its first connection
    pub fn new(
        user_id: UserId,
        username: String,
        profile: UserProfile,
        connection: ConnectionHandle,
        now: DateTime<Utc>,
    ) -> Self {
        let mut connections = HashMap::new();
        connections.insert(connection.id, connection);
        Self {
            user_id,
            username,
            avatar: profile.avatar,
            bio: profile.bio,
            status: PresenceStatus::Online,
            last_seen: now,
            connections,
        }
    }

    pub fn attach(&mut self, connection: ConnectionHandle, now: DateTime<Utc>) {
        self.connections.insert(connection.id, connection);
        self.last_seen = now;
    }

    /// Remove a connection. Returns whether it was present.
    pub fn detach(&mut self, connection_id: &ConnectionId, now: DateTime<Utc>) -> bool {
        self.last_seen = now;
        self.connections.remove(connection_id).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_stale(&self, threshold: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_seen > threshold
    }
}

/// A chat message accepted from a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_id: UserId,
    pub sender_name: String,
    pub content: String,
    pub message_type: MessageType,
    pub file_url: String,
    pub file_name: String,
    pub file_size: u64,
    /// Direct recipient, if any
    pub target: Option<UserId>,
    /// Destination group, if any. Takes precedence over `target`.
    pub group_id: Option<GroupId>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Plain text message to everyone
    pub fn text(sender_id: UserId, sender_name: String, content: String, created_at: DateTime<Utc>) -> Self {
        Self {
            sender_id,
            sender_name,
            content,
            message_type: MessageType::Text,
            file_url: String::new(),
            file_name: String::new(),
            file_size: 0,
            target: None,
            group_id: None,
            created_at,
        }
    }
}
