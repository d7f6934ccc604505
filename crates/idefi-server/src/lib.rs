//! idefi Server - Agent API Server
//!
//! HTTP server for creating agents and dispatching tasks to them.

pub mod error;
pub mod http;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use idefi_core::error::{FactoryError, IdefiError};
use idefi_core::{
    AgentContext, AgentFactory, AgentRegistry, EoaValidator, IdefiConfig, Services,
    TemplateStore, TrackingStore,
};

pub use error::ApiError;

/// Shared application state
pub struct AppState {
    pub config: IdefiConfig,
    pub registry: RwLock<AgentRegistry>,
    pub factory: AgentFactory,
    pub tracking: Arc<TrackingStore>,
    pub eoa: EoaValidator,
    pub services: Services,
}

impl AppState {
    /// Open the tracking file, seed templates if configured and wire the
    /// factory to `services`
    pub fn new(config: IdefiConfig, services: Services) -> Result<Self, IdefiError> {
        if config.storage.seed_templates {
            TemplateStore::new(config.storage.templates_dir.clone())
                .seed()
                .map_err(FactoryError::from)?;
        }

        let tracking = Arc::new(TrackingStore::open(config.storage.tracking_file.clone())?);
        let factory = AgentFactory::from_config(&config, &services, tracking.clone());

        Ok(Self {
            eoa: EoaValidator::new(services.code_lookup.clone()),
            registry: RwLock::new(AgentRegistry::new()),
            factory,
            tracking,
            services,
            config,
        })
    }

    /// Services available to agents
    pub fn agent_context(&self) -> AgentContext {
        AgentContext::from(&self.services)
    }

    /// Stop every registered agent
    pub async fn shutdown_agents(&self) {
        let handles = self.registry.write().await.drain();
        let count = handles.len();
        for handle in handles {
            handle.shutdown().await;
        }
        tracing::info!("Stopped {} agents", count);
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_upload_bytes;
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        // Agent endpoints
        .route("/api/agents_create", post(http::create_agent))
        .route("/api/agents_assign", post(http::assign_tasks))
        .route("/api/agents_status", get(http::get_agent_status))
        .route("/api/agents_sync", post(http::sync_data))
        .route("/api/agents_sync_wallet", post(http::sync_wallet))
        .route("/api/agents_security_check", post(http::security_check))
        .route("/api/agents_endpoints", post(http::assign_endpoints))
        .route("/api/agents_tracking", get(http::get_tracking))
        // Proxies to the analytics and quantum APIs
        .route(
            "/api/endpoints",
            get(http::proxy_analytics_get).post(http::proxy_analytics_post),
        )
        .route("/api/quantum/{endpoint}", post(http::proxy_quantum))
        // File processing
        .route("/api/files/upload", post(http::upload_file))
        .route("/api/files/download/{filename}", get(http::download_file))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the server and run until Ctrl-C, then stop every agent
pub async fn serve(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = state.config.server.addr.clone();
    let app = create_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("idefi server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    state.shutdown_agents().await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
