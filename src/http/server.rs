//! API server setup.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, request ID, timeout, auth)
//! - Serve until the shutdown signal fires

use axum::{
    middleware,
    routing::{get, head, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ConductorConfig;
use crate::http::auth::api_auth_middleware;
use crate::http::handlers;
use crate::service::ConductorService;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConductorService>,
    pub api_key: Option<Arc<str>>,
}

/// HTTP/JSON front of the conductor.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    pub fn new(service: Arc<ConductorService>, config: &ConductorConfig) -> Self {
        let state = AppState {
            service,
            api_key: config.api.api_key.as_deref().map(Arc::from),
        };
        let router = Self::build_router(state, Duration::from_secs(config.timeouts.request_secs));
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
        let api = Router::new()
            .route("/routes", post(handlers::add_or_update_routes))
            .route("/routes/remove", post(handlers::remove_routes))
            .route("/config/regenerate", post(handlers::regenerate_config))
            .route("/reload/lock", post(handlers::lock_for_reload))
            .route("/reload", post(handlers::reload))
            .route("/reload/release", post(handlers::release_reload_lock))
            .route("/changesets/{id}", get(handlers::query_change_set))
            .route("/status", get(handlers::status))
            .route("/live", post(handlers::set_live).delete(handlers::set_not_live))
            .route("/proxy/start", post(handlers::start_proxy))
            .route("/proxy/kill", post(handlers::kill_proxy))
            .route_layer(middleware::from_fn_with_state(state.clone(), api_auth_middleware));

        Router::new()
            .nest("/v1", api)
            .route("/health", head(handlers::health))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "API server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("API server shutting down");
            })
            .await?;

        tracing::info!("API server stopped");
        Ok(())
    }
}
