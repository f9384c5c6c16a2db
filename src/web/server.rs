//! Router composition and server startup.

use std::future::Future;
use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::board::Board;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::web::api;
use crate::web::state::AppState;

pub struct WebServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: ServerConfig, board: Board) -> Self {
        let state = Arc::new(AppState { board });
        Self { config, state }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        self.config.addr()
    }

    /// Build the Axum router with all routes registered.
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(addr = %addr, "starting web server");
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener, e.g. one bound to port 0 in tests.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("web server stopped");
        Ok(())
    }
}

/// Routes of the board API over the given state
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health))
        .route("/records", get(api::list_records).post(api::create_record))
        .route(
            "/records/{id}",
            get(api::get_record)
                .patch(api::patch_record)
                .delete(api::delete_record),
        )
        .route("/reorder", post(api::reorder))
        .route("/reorder/batch", post(api::reorder_batch))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
