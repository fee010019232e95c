//! # HTTP Server
//!
//! Combines the comment, admin and health routers behind CORS and request
//! tracing.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::admin_routes::{admin_routes, AdminState};
use super::avatar_routes::avatar_routes;
use super::comments_routes::comments_routes;
use super::config::HttpServerConfig;
use super::observability_routes::health_routes;
use crate::auth::AdminAuth;
use crate::service::CommentService;

/// HTTP server for the comment API
pub struct HttpServer {
    config: HttpServerConfig,
    service: Arc<CommentService>,
    router: Router,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, service: Arc<CommentService>, auth: AdminAuth) -> Self {
        let router = Self::build_router(&config, Arc::clone(&service), auth);
        Self {
            config,
            service,
            router,
        }
    }

    /// Build the combined router with all endpoints
    pub fn build_router(
        config: &HttpServerConfig,
        service: Arc<CommentService>,
        auth: AdminAuth,
    ) -> Router {
        let admin_state = Arc::new(AdminState::new(Arc::clone(&service), auth));

        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(health_routes(Arc::clone(service.store())))
            .merge(avatar_routes(Arc::clone(&service)))
            .nest("/api", comments_routes(service))
            .nest("/admin", admin_routes(admin_state))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until Ctrl-C.
    pub async fn start(self) -> Result<(), std::io::Error> {
        self.start_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then flush the store.
    pub async fn start_with_shutdown<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        info!(addr = %listener.local_addr()?, "comment server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Err(e) = self.service.store().flush() {
            warn!(error = %e, "store flush on shutdown failed");
        }
        info!("comment server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captcha::StaticCaptcha;
    use crate::notify::NullNotifier;
    use crate::service::SanitizingMarkdown;
    use crate::store::CommentStore;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> Arc<CommentService> {
        Arc::new(CommentService::new(
            Arc::new(CommentStore::open(dir.path()).unwrap()),
            Arc::new(SanitizingMarkdown),
            Arc::new(NullNotifier),
            Arc::new(StaticCaptcha::accept_all()),
        ))
    }

    #[test]
    fn test_server_with_custom_port() {
        let temp_dir = TempDir::new().unwrap();
        let server = HttpServer::new(
            HttpServerConfig::with_port(8080),
            service(&temp_dir),
            AdminAuth::new("secret"),
        );
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_router_builds_with_origin_list() {
        let temp_dir = TempDir::new().unwrap();
        let config = HttpServerConfig {
            cors_origins: vec!["https://blog.example.com".to_string()],
            ..HttpServerConfig::default()
        };
        let _router = HttpServer::new(config, service(&temp_dir), AdminAuth::new("secret")).router();
    }
}
