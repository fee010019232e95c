//! # Comment Service
//!
//! Orchestration between the HTTP surface and the store: validates
//! submissions, derives avatar identity from an email that is then dropped,
//! stores a generated avatar image, renders Markdown for display, assembles
//! reply threads and fires the owner notification.

mod avatar;
mod errors;
mod identicon;
mod render;
#[allow(clippy::module_inception)]
mod service;
mod thread;

pub use avatar::{AvatarIdentity, AVATAR_SALT, GRAVATAR_BASE_URL};
pub use errors::{ServiceError, ServiceResult, ValidationError};
pub use identicon::{identicon_svg, IDENTICON_CONTENT_TYPE};
pub use render::{MarkdownRenderer, SanitizingMarkdown};
pub use service::{CommentService, SubmitFields, UNKNOWN_USERNAME};
pub use thread::{build_threads, RenderableComment};
