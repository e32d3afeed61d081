//! Domain layer for the chat server.
//!
//! This module contains business rules that are independent of
//! wire formats (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod event;
pub mod factory;
pub mod repository;
pub mod value_object;

pub use entity::{AuthenticatedUser, ChatMessage, ConnectionHandle, PresenceEntry, UserProfile};
pub use error::{
    AuthError, PersistenceError, ProtocolError, ResolverError, SubmitError, TransportError,
    ValueObjectError,
};
pub use event::{Audience, EventPublisher, OutboundEvent};
pub use factory::ConnectionIdFactory;
pub use repository::{GroupDirectory, MessageStore, PresenceRegistry, ProfileStore, TokenVerifier};
pub use value_object::{ConnectionId, GroupId, MessageType, PresenceStatus, UserId};
