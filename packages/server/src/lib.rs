//! Real-time chat server library.
//!
//! Tracks which users are online across any number of WebSocket connections,
//! routes chat messages and presence events to everyone, a group, or a
//! direct pair, and keeps presence state consistent with the message store.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::ServerConfig;
pub use error::ServerError;
pub use ui::{Collaborators, run_server, serve};
