//! Shared utilities for Murmur binaries and tests.

pub mod logger;
pub mod time;
