//! Public comment routes
//!
//! - `GET  /api/:documentId` - threaded comments of a document
//! - `POST /api/:documentId` - submit a comment, answer with the updated list
//!
//! Both answer `{comments, error}`, plus `captchaURL`/`captchaChallenge`
//! when the captcha provider issues challenges. Validation and captcha
//! failures still return 200 so the widget can re-render the list with the
//! error inline.

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::blocking::run_blocking;
use crate::captcha::CaptchaChallenge;
use crate::service::{CommentService, RenderableComment, ServiceError, SubmitFields};

/// Comment routes with shared state
pub fn comments_routes(service: Arc<CommentService>) -> Router {
    Router::new()
        .route("/:document_id", get(list_handler).post(submit_handler))
        .with_state(service)
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(flatten)]
    pub fields: SubmitFields,

    #[serde(default, alias = "g-recaptcha-response")]
    pub captcha_token: Option<String>,

    /// Proof-of-work answer, sent as two fields instead of one token
    #[serde(default)]
    pub captcha_challenge: Option<String>,
    #[serde(default)]
    pub captcha_nonce: Option<String>,
}

impl SubmitRequest {
    /// The token to verify: `captchaToken`, or `challenge:nonce` built from
    /// the proof-of-work fields.
    pub fn captcha_token(&self) -> Option<String> {
        if let Some(token) = self.captcha_token.as_deref().filter(|t| !t.is_empty()) {
            return Some(token.to_string());
        }
        match (&self.captcha_challenge, &self.captcha_nonce) {
            (Some(challenge), Some(nonce)) => Some(format!("{}:{}", challenge, nonce)),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    #[serde(flatten)]
    pub captcha: Option<CaptchaChallenge>,
    pub comments: Vec<RenderableComment>,
    pub error: Option<String>,
}

impl CommentsResponse {
    fn ok(comments: Vec<RenderableComment>) -> Self {
        Self {
            captcha: None,
            comments,
            error: None,
        }
    }
}

type CommentsReply = (StatusCode, Json<CommentsResponse>);

fn failure(comments: Vec<RenderableComment>, err: &ServiceError) -> CommentsReply {
    let status = if err.is_client_error() {
        StatusCode::OK
    } else {
        error!(code = err.code(), error = %err, "comment request failed");
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    };
    let response = CommentsResponse {
        captcha: None,
        comments,
        error: Some(err.user_message()),
    };
    (status, Json(response))
}

/// Lists the document and attaches a fresh captcha challenge.
async fn reply_with_list(
    service: &Arc<CommentService>,
    document_id: String,
    submitted: Result<(), ServiceError>,
) -> CommentsReply {
    let listed = run_blocking(service, move |s| s.list(&document_id)).await;
    let comments = match listed {
        Ok(comments) => comments,
        Err(e) => return failure(Vec::new(), &e),
    };

    let (status, Json(mut response)) = match submitted {
        Ok(()) => (StatusCode::OK, Json(CommentsResponse::ok(comments))),
        Err(e) => failure(comments, &e),
    };
    if status == StatusCode::OK {
        response.captcha = service.captcha_challenge().await;
    }
    (status, Json(response))
}

// ==================
// Handlers
// ==================

async fn list_handler(
    State(service): State<Arc<CommentService>>,
    Path(document_id): Path<String>,
) -> CommentsReply {
    reply_with_list(&service, document_id, Ok(())).await
}

async fn submit_handler(
    State(service): State<Arc<CommentService>>,
    Path(document_id): Path<String>,
    Json(request): Json<SubmitRequest>,
) -> CommentsReply {
    let token = request.captcha_token();
    let submitted = match service.verify_captcha(&document_id, token.as_deref()).await {
        Ok(()) => {
            let id = document_id.clone();
            let fields = request.fields;
            run_blocking(&service, move |s| s.submit(&id, fields).map(|_| ())).await
        }
        Err(e) => Err(e),
    };

    reply_with_list(&service, document_id, submitted).await
}
