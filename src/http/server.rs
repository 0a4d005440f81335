//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with proxy and admin handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Own the backend registry handle for the lifetime of the process
//! - Bind server to listener and drain on shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::config::{AdminConfig, ProxyConfig};
use crate::http::dispatcher::{build_client, Dispatcher};
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::load_balancer::{BackendRegistry, RegistryError};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BackendRegistry>,
    pub dispatcher: Dispatcher,
    pub admin: AdminConfig,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    registry: Arc<BackendRegistry>,
}

impl HttpServer {
    /// Create a server with a fresh registry seeded from `config.backends`.
    pub fn new(config: ProxyConfig) -> Result<Self, RegistryError> {
        let registry = Arc::new(BackendRegistry::from_addresses(&config.backends)?);
        Ok(Self::with_registry(config, registry))
    }

    /// Create a server around an existing registry.
    pub fn with_registry(config: ProxyConfig, registry: Arc<BackendRegistry>) -> Self {
        let client = build_client(Duration::from_secs(config.timeouts.connect_secs));

        let state = AppState {
            registry: registry.clone(),
            dispatcher: Dispatcher::new(registry.clone(), client),
            admin: config.admin.clone(),
        };
        metrics::record_backend_count(registry.len());

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            registry,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/api/", any(proxy_handler))
            .route("/api/{*path}", any(proxy_handler))
            .merge(admin::setup_admin_router(state.clone()))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Run the server until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.registry.len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// A clone of the fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Proxy handler: hands the whole request to the dispatcher.
async fn proxy_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Response {
    match state.dispatcher.forward(request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
