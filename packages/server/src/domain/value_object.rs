//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::ValueObjectError;

/// User identifier value object.
///
/// Identifiers are issued by the account service and are always non-zero;
/// zero is reserved on the wire to mean "no user".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Create a new UserId.
    ///
    /// # Errors
    ///
    /// Returns `ValueObjectError::UserIdZero` for `0`.
    pub fn new(id: u64) -> Result<Self, ValueObjectError> {
        if id == 0 {
            return Err(ValueObjectError::UserIdZero);
        }
        Ok(Self(id))
    }

    /// Interpret a wire value where `0` means "none".
    pub fn from_wire(id: u64) -> Option<Self> {
        Self::new(id).ok()
    }

    /// Get the inner value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group identifier value object. Zero on the wire means "not a group message".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(u64);

impl GroupId {
    /// Create a new GroupId.
    ///
    /// # Errors
    ///
    /// Returns `ValueObjectError::GroupIdZero` for `0`.
    pub fn new(id: u64) -> Result<Self, ValueObjectError> {
        if id == 0 {
            return Err(ValueObjectError::GroupIdZero);
        }
        Ok(Self(id))
    }

    /// Interpret a wire value where `0` means "none".
    pub fn from_wire(id: u64) -> Option<Self> {
        Self::new(id).ok()
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one live transport stream.
///
/// A user may hold many connections at once; each gets its own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Presence status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
    Busy,
    Away,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Busy => "busy",
            Self::Away => "away",
        }
    }
}

impl TryFrom<&str> for PresenceStatus {
    type Error = ValueObjectError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            "busy" => Ok(Self::Busy),
            "away" => Ok(Self::Away),
            other => Err(ValueObjectError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of chat message content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
}

impl MessageType {
    /// Lenient conversion from the wire; unknown values become `Text`.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "image" => Self::Image,
            "file" => Self::File,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
