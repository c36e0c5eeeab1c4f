use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handler::{self, ServerContext};

/// Build the axum router around one shared server context.
///
/// All routing happens in the fallback: the ordered template table in
/// [`crate::routes`] is the real router, axum only provides the transport.
pub fn build_router(ctx: Arc<ServerContext>) -> Router {
    Router::new()
        .fallback(handler::dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// The restbay repository server.
pub struct RestServer {
    config: ServerConfig,
}

impl RestServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> Router {
        build_router(Arc::new(ServerContext::new(self.config.clone())))
    }

    /// Start serving requests.
    pub async fn serve(self) -> anyhow::Result<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            path = %self.config.path.display(),
            append_only = self.config.append_only,
            private_repos = self.config.private_repos,
            "restbay listening"
        );
        axum::serve(listener, app).await?;
        Ok(())
    }
}
