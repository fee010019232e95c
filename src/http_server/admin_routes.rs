//! Admin routes
//!
//! Every request is signed: `Authorization: HMAC-SHA256 <hex>` where the hex
//! is HMAC-SHA256(admin secret, raw body ++ current nonce). Every response
//! carries the nonce to sign the next request with.
//!
//! - `GET  /admin` - login state and current nonce
//! - `POST /admin/comments` - list every comment
//! - `POST /admin/delete` - `{"delete": {"documentId", "date"}}`
//! - `POST /admin/import` - `{"comments": [...]}`

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Json, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, info};

use super::blocking::run_blocking;
use crate::auth::{parse_credential, AdminAuth, AuthOutcome};
use crate::service::{CommentService, RenderableComment, ServiceResult};
use crate::store::Comment;

/// Shared admin state
pub struct AdminState {
    pub service: Arc<CommentService>,
    pub auth: AdminAuth,
}

impl AdminState {
    pub fn new(service: Arc<CommentService>, auth: AdminAuth) -> Self {
        Self { service, auth }
    }
}

/// Admin routes with shared state
pub fn admin_routes(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/", get(login_state_handler))
        .route("/comments", post(list_handler))
        .route("/delete", post(delete_handler))
        .route("/import", post(import_handler))
        .with_state(state)
}

// ==================
// Request/Response Types
// ==================

/// Body of a plain listing request; any JSON object is accepted.
#[derive(Debug, Deserialize)]
pub struct ListRequest {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTarget {
    pub document_id: String,
    pub date: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub delete: DeleteTarget,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub authenticated: bool,
    pub incorrect: bool,
    pub nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<RenderableComment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdminResponse {
    fn denied(nonce: String, incorrect: bool) -> Self {
        Self {
            authenticated: false,
            incorrect,
            nonce,
            comments: None,
            error: None,
        }
    }

    fn granted(nonce: String) -> Self {
        Self {
            authenticated: true,
            incorrect: false,
            nonce,
            comments: None,
            error: None,
        }
    }
}

type AdminReply = (StatusCode, Json<AdminResponse>);

fn credential(headers: &HeaderMap) -> Option<&str> {
    parse_credential(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()))
}

/// Verifies the request, runs `action` on the signed payload, then answers
/// with the full comment list.
async fn authorized<T, F>(state: &AdminState, headers: &HeaderMap, body: &[u8], action: F) -> AdminReply
where
    T: DeserializeOwned + Send + 'static,
    F: FnOnce(&CommentService, T) -> ServiceResult<()> + Send + 'static,
{
    let (decoded, nonce) = state.auth.verify_json::<T>(credential(headers), body);

    let payload = match decoded {
        Ok(AuthOutcome::Authenticated(payload)) => payload,
        Ok(AuthOutcome::MissingCredentials) => {
            return (StatusCode::UNAUTHORIZED, Json(AdminResponse::denied(nonce, false)))
        }
        Ok(AuthOutcome::Rejected) => {
            return (StatusCode::UNAUTHORIZED, Json(AdminResponse::denied(nonce, true)))
        }
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
            let mut response = AdminResponse::granted(nonce);
            response.error = Some(e.to_string());
            return (status, Json(response));
        }
    };

    let result = run_blocking(&state.service, move |service| {
        action(service, payload).and_then(|()| service.list_all())
    })
    .await;

    let mut response = AdminResponse::granted(nonce);
    match result {
        Ok(comments) => {
            response.comments = Some(comments);
            (StatusCode::OK, Json(response))
        }
        Err(e) => {
            if !e.is_client_error() {
                error!(code = e.code(), error = %e, "admin request failed");
            }
            response.error = Some(e.user_message());
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(response))
        }
    }
}

// ==================
// Handlers
// ==================

async fn login_state_handler(State(state): State<Arc<AdminState>>) -> AdminReply {
    (
        StatusCode::OK,
        Json(AdminResponse::denied(state.auth.current_nonce(), false)),
    )
}

async fn list_handler(
    State(state): State<Arc<AdminState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AdminReply {
    authorized(&state, &headers, &body, |_, _: ListRequest| Ok(())).await
}

async fn delete_handler(
    State(state): State<Arc<AdminState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AdminReply {
    authorized(&state, &headers, &body, |service, request: DeleteRequest| {
        info!(
            document_id = %request.delete.document_id,
            date = request.delete.date,
            "admin delete"
        );
        service.remove(&request.delete.document_id, request.delete.date)
    })
    .await
}

async fn import_handler(
    State(state): State<Arc<AdminState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AdminReply {
    authorized(&state, &headers, &body, |service, request: ImportRequest| {
        service.import(request.comments).map(|_| ())
    })
    .await
}
