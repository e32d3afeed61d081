//! Ports implemented by the infrastructure layer.
//!
//! The use cases and the router depend on these traits only, so every
//! collaborator can be replaced by an in-memory fake or a mock in tests.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{
    entity::{AuthenticatedUser, ChatMessage, ConnectionHandle, PresenceEntry, UserProfile},
    error::{AuthError, PersistenceError, ResolverError},
    value_object::{ConnectionId, GroupId, PresenceStatus, UserId},
};

/// Process-wide table of reachable users.
///
/// All operations are linearizable per user: two connections of the same
/// user registering or deregistering concurrently never lose an update.
#[async_trait]
pub trait PresenceRegistry: Send + Sync {
    /// Add a connection. Returns `true` if this is the user's first connection.
    ///
    /// The first connection creates the entry from the stored profile and
    /// persists status "online".
    async fn register(&self, user_id: UserId, username: String, connection: ConnectionHandle)
    -> bool;

    /// Remove a connection. Returns `true` if it was the user's last one.
    ///
    /// The last removal deletes the entry and persists status "offline".
    /// Unknown users and already removed connections are a no-op returning `false`.
    async fn deregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool;

    async fn lookup(&self, user_id: UserId) -> Option<PresenceEntry>;

    /// Change the in-memory status if the user is present and always persist it.
    async fn update_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
    ) -> Result<(), PersistenceError>;

    /// Online users ordered by user id
    async fn snapshot(&self) -> Vec<PresenceEntry>;

    /// Refresh `last_seen` after inbound activity
    async fn touch(&self, user_id: UserId);

    async fn all_connections(&self) -> Vec<(UserId, ConnectionHandle)>;

    async fn connections_of(&self, user_ids: &[UserId]) -> Vec<(UserId, ConnectionHandle)>;

    /// Drop every entry idle for longer than `threshold` and persist it offline.
    ///
    /// Connections are not closed, only forgotten.
    async fn evict_stale(&self, threshold: Duration, now: DateTime<Utc>) -> Vec<UserId>;
}

/// Durable sink for chat messages. Never read back by the router.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn write_message(&self, message: &ChatMessage) -> Result<(), PersistenceError>;
}

/// Read-only group membership lookup
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn member_ids(&self, group_id: GroupId) -> Result<HashSet<UserId>, ResolverError>;
}

/// Account profile storage and persisted presence status
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch(&self, user_id: UserId) -> Result<Option<UserProfile>, PersistenceError>;

    async fn set_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;
}

/// Session token validation
#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
