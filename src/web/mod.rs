//! Web server module.

mod handlers;

use crate::config::ServerConfig;
use crate::probe::Prober;
use crate::viewer::StatsViewer;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub prober: Arc<Prober>,
    pub viewer: Arc<StatsViewer>,
}

/// Web server for the keepalive service.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, prober: Arc<Prober>, viewer: Arc<StatsViewer>) -> Self {
        Self {
            state: AppState {
                config,
                prober,
                viewer,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            .route(
                "/api/keepalive",
                get(handlers::handle_keepalive_get).post(handlers::handle_keepalive_post),
            )
            .route("/api/stats", get(handlers::handle_get_stats))
            .route("/api/stats/refresh", post(handlers::handle_refresh_stats))
            .route("/api/stats/auto-refresh", put(handlers::handle_set_auto_refresh))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web server listening on {}", addr);

        // The socket is bound, so the first timed fetch can reach us.
        if self.state.config.auto_refresh {
            self.state.viewer.set_auto_refresh(true).await;
        }

        axum::serve(listener, router).await?;

        Ok(())
    }
}
