//! WebSocket chat server implementation.

mod handler;
mod runner;
mod signal;
pub mod state;

pub use runner::{Collaborators, build_app, run_server, serve};
