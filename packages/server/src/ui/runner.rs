//! Server wiring: collaborators, background tasks and the axum router.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, put},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    domain::{GroupDirectory, MessageStore, PresenceRegistry, TokenVerifier},
    error::ServerError,
    infrastructure::{
        auth::JwtTokenVerifier,
        repository::{
            InMemoryGroupDirectory, InMemoryMessageStore, InMemoryPresenceRegistry,
            InMemoryProfileStore,
        },
    },
    ui::{handler, signal::shutdown_signal, state::AppState},
    usecase::{MessageRouter, PresenceSweeper},
};

/// External collaborators the server is wired with
pub struct Collaborators {
    pub registry: Arc<dyn PresenceRegistry>,
    pub groups: Arc<dyn GroupDirectory>,
    pub store: Arc<dyn MessageStore>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl Collaborators {
    /// In-memory stores and an HS256 verifier for `jwt_secret`
    pub fn in_memory(jwt_secret: &[u8]) -> Self {
        Self {
            registry: Arc::new(InMemoryPresenceRegistry::new(Arc::new(
                InMemoryProfileStore::new(),
            ))),
            groups: Arc::new(InMemoryGroupDirectory::new()),
            store: Arc::new(InMemoryMessageStore::new()),
            verifier: Arc::new(JwtTokenVerifier::new(jwt_secret)),
        }
    }
}

/// Build the HTTP/WebSocket routes
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handler::health_check))
        .route("/api/online-users", get(handler::get_online_users))
        .route(
            "/api/groups/{id}/online-members",
            get(handler::get_group_online_members),
        )
        .route("/api/profile/status", put(handler::update_status))
        .route("/ws", get(handler::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// Rejects an invalid `config` before spawning anything. Spawns the message
/// router and the presence sweeper; the sweeper is aborted on shutdown.
pub async fn serve<F>(
    listener: TcpListener,
    config: &ServerConfig,
    collaborators: Collaborators,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;

    let (router, router_handle) = MessageRouter::new(
        collaborators.registry.clone(),
        collaborators.groups.clone(),
        collaborators.store,
        config.router_queue_capacity,
    );
    let sweeper = PresenceSweeper::new(
        collaborators.registry.clone(),
        config.sweep_interval(),
        config.stale_threshold(),
    );

    let state = Arc::new(AppState {
        registry: collaborators.registry,
        groups: collaborators.groups,
        publisher: Arc::new(router_handle),
        verifier: collaborators.verifier,
        heartbeat_interval: config.heartbeat_interval(),
        auth_timeout: config.auth_timeout(),
    });

    tokio::spawn(router.run());
    let sweeper_task = tokio::spawn(sweeper.run());

    let app = build_app(state);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve);

    sweeper_task.abort();
    tracing::info!("Server stopped");
    result
}

/// Validate config, bind and serve until Ctrl-C or SIGTERM
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;
    tracing::debug!(?config, "Starting server");

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!("Listening on {}", addr);

    let collaborators = Collaborators::in_memory(config.jwt_secret.as_bytes());
    serve(listener, &config, collaborators, shutdown_signal()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, MAX_DURATION_SECS};

    #[tokio::test]
    async fn test_serve_rejects_out_of_range_config() {
        // テスト項目: 上限を超える閾値では起動前に Config エラーが返る（パニックしない）
        // given (前提条件):
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: "s3cret".to_string(),
            sweep_interval_secs: 60,
            stale_after_secs: u64::MAX,
            heartbeat_interval_secs: 30,
            auth_timeout_secs: 10,
            router_queue_capacity: 16,
            log_level: "info".to_string(),
        };

        // when (操作):
        let result = serve(
            listener,
            &config,
            Collaborators::in_memory(b"s3cret"),
            std::future::ready(()),
        )
        .await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(ServerError::Config(ConfigError::TooLarge {
                name: "stale threshold",
                max: MAX_DURATION_SECS,
            }))
        ));
    }
}
