//! # HTTP Server Module
//!
//! Axum server in front of the comment service.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/api/:documentId` - Public comment list and submission
//! - `/admin/*` - Signed moderation requests
//! - `/avatar/:avatarHash` - Stored commenter avatars

pub mod admin_routes;
pub mod avatar_routes;
mod blocking;
pub mod comments_routes;
pub mod config;
pub mod observability_routes;
pub mod server;

pub use admin_routes::{AdminResponse, AdminState};
pub use config::HttpServerConfig;
pub use server::HttpServer;
