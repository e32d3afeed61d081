//! Infrastructure layer: wire formats and concrete implementations of the domain ports.

pub mod auth;
pub mod dto;
pub mod repository;
