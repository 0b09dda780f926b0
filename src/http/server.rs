//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, metrics)
//! - Serve on a listener until shutdown is signalled

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::blockchain::{
    BlockchainError, ClientFactory, Clock, LifecycleSettings, NetworkClient,
};
use crate::compiler::{ArtifactStore, Compiler};
use crate::config::{AppConfig, NetworkConfig};
use crate::http::middleware::track_metrics;
use crate::http::request::{make_span, propagate_request_id_layer, set_request_id_layer};
use crate::http::response::ApiError;
use crate::http::{catalog, contracts, inbox};
use crate::lifecycle::InFlight;
use crate::metadata::MetadataStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub clients: Arc<dyn ClientFactory>,
    pub store: Arc<dyn MetadataStore>,
    pub artifacts: Arc<ArtifactStore>,
    pub compiler: Arc<dyn Compiler>,
    pub clock: Arc<dyn Clock>,
    /// Deploy and update runs that must outlive their request.
    pub tasks: InFlight,
}

impl AppState {
    /// Look up a configured network.
    pub fn network(&self, name: &str) -> Result<&NetworkConfig, ApiError> {
        self.config
            .network(name)
            .ok_or_else(|| BlockchainError::NetworkNotFound(name.to_string()).into())
    }

    /// Resolve and connect to a configured network.
    pub async fn connect(&self, name: &str) -> Result<(NetworkConfig, Arc<dyn NetworkClient>), ApiError> {
        let network = self.network(name)?.clone();
        let client = self.clients.connect(&network).await?;
        Ok((network, client))
    }

    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings::from(&self.config.lifecycle)
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(state: AppState) -> Router {
        let api = &state.config.api_server;
        let request_timeout = Duration::from_secs(api.request_timeout_secs);
        let body_limit = api.max_upload_bytes;

        let contract_routes = Router::new()
            .route("/compile", post(contracts::compile))
            .route("/compiled_contracts", get(contracts::compiled_contracts))
            .route("/deploy", post(contracts::deploy))
            .route("/metadata", get(contracts::metadata));

        let inbox_routes = Router::new()
            .route("/message", get(inbox::message))
            .route("/counter", get(inbox::counter))
            .route("/update", put(inbox::update))
            .route("/maths", post(inbox::maths));

        Router::new()
            .route("/", get(catalog::root))
            .route("/networks", get(catalog::networks))
            .route("/users", get(catalog::users))
            .route("/explorer", get(catalog::explorer))
            .nest("/contracts", contract_routes)
            .nest("/inbox", inbox_routes)
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(state)
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(TimeoutLayer::new(request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_span::<axum::body::Body>))
            .layer(set_request_id_layer())
    }

    /// Serve until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            networks = self.config.networks.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
