//! Shared application state handed to every handler.

use std::{sync::Arc, time::Duration};

use crate::domain::{EventPublisher, GroupDirectory, PresenceRegistry, TokenVerifier};

/// Shared application state
pub struct AppState {
    /// Presence registry (one per process)
    pub registry: Arc<dyn PresenceRegistry>,
    /// Group membership lookups for the HTTP surface
    pub groups: Arc<dyn GroupDirectory>,
    /// Router queue handle
    pub publisher: Arc<dyn EventPublisher>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub heartbeat_interval: Duration,
    pub auth_timeout: Duration,
}
