//! Avatar images
//!
//! - `GET /avatar/:avatarHash` - the stored image for a commenter's
//!   `avatarHash`, 404 if there is none

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::error;

use super::blocking::run_blocking;
use crate::service::CommentService;

/// Avatar route at `/avatar/:avatar_hash`
pub fn avatar_routes(service: Arc<CommentService>) -> Router {
    Router::new()
        .route("/avatar/:avatar_hash", get(avatar_handler))
        .with_state(service)
}

async fn avatar_handler(
    State(service): State<Arc<CommentService>>,
    Path(avatar_hash): Path<String>,
) -> Response {
    match run_blocking(&service, move |s| s.avatar(&avatar_hash)).await {
        Ok(Some(avatar)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, avatar.content_type),
                (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
            ],
            avatar.bytes,
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
        Err(e) => {
            error!(code = e.code(), error = %e, "avatar lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "500 server error").into_response()
        }
    }
}
