//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// UserId must be non-zero
    #[error("UserId cannot be zero")]
    UserIdZero,

    /// GroupId must be non-zero
    #[error("GroupId cannot be zero")]
    GroupIdZero,

    /// Unknown presence status
    #[error("invalid status '{0}' (expected online, offline, busy or away)")]
    InvalidStatus(String),
}

/// Token validation failures. Always fatal to the connection presenting the token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token claims are invalid: {0}")]
    InvalidClaims(String),
}

/// Malformed handshake traffic. Always fatal to the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("auth frame must be a text frame")]
    NotText,

    #[error("malformed auth frame: {0}")]
    Malformed(String),

    #[error("expected an auth frame, got type '{0}'")]
    UnexpectedType(String),

    #[error("no auth frame received within {0} seconds")]
    Timeout(u64),
}

/// Failure of the durable write path. Logged, never fatal to delivery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("persistence failed: {0}")]
pub struct PersistenceError(pub String);

/// Group membership lookup failure. The affected group broadcast is dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("group membership lookup failed: {0}")]
pub struct ResolverError(pub String);

/// Errors returned when handing an event to the router queue
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The bounded queue is full; the event was rejected (reject-new policy)
    #[error("router queue is full ({capacity} events)")]
    QueueFull { capacity: usize },

    /// The router task is gone
    #[error("router is no longer running")]
    Closed,
}

/// A write to a connection failed because its transport is gone
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("connection transport is closed")]
pub struct TransportError;
