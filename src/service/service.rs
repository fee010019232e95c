//! Comment service operations

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::avatar::AvatarIdentity;
use super::errors::{ServiceResult, ValidationError};
use super::identicon::{identicon_svg, IDENTICON_CONTENT_TYPE};
use super::render::MarkdownRenderer;
use super::thread::{build_threads, RenderableComment};
use crate::captcha::{CaptchaChallenge, CaptchaVerifier};
use crate::keys;
use crate::notify::Notifier;
use crate::store::{Avatar, AvatarStore, Comment, CommentStore};

/// Name shown for comments submitted without one
pub const UNKNOWN_USERNAME: &str = "Unknown";

/// Form fields of a comment submission
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFields {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Used to derive the avatar and then dropped
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub in_reply_to: Option<String>,
}

impl SubmitFields {
    pub fn new(username: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn replying_to(mut self, thread_id: impl Into<String>) -> Self {
        self.in_reply_to = Some(thread_id.into());
        self
    }
}

/// Ties the store to rendering, notification and captcha checks.
///
/// Cheap to share: every collaborator sits behind an `Arc`.
pub struct CommentService {
    store: Arc<CommentStore>,
    renderer: Arc<dyn MarkdownRenderer>,
    notifier: Arc<dyn Notifier>,
    captcha: Arc<dyn CaptchaVerifier>,
    avatars: Option<Arc<AvatarStore>>,
}

impl CommentService {
    pub fn new(
        store: Arc<CommentStore>,
        renderer: Arc<dyn MarkdownRenderer>,
        notifier: Arc<dyn Notifier>,
        captcha: Arc<dyn CaptchaVerifier>,
    ) -> Self {
        Self {
            store,
            renderer,
            notifier,
            captcha,
            avatars: None,
        }
    }

    /// Stores a generated avatar for every commenter who leaves an email.
    pub fn with_avatars(mut self, avatars: Arc<AvatarStore>) -> Self {
        self.avatars = Some(avatars);
        self
    }

    pub fn store(&self) -> &Arc<CommentStore> {
        &self.store
    }

    /// Validates and stores a new comment on `document_id`.
    ///
    /// The server assigns the date. On success the owner notification is
    /// dispatched in the background; its outcome never affects the result.
    ///
    /// # Errors
    ///
    /// - `Validation` for a bad document id, blank body or unknown parent
    /// - `Store` if the write fails; nothing was stored
    pub fn submit(&self, document_id: &str, fields: SubmitFields) -> ServiceResult<Comment> {
        keys::validate_document_id(document_id).map_err(ValidationError::from)?;

        let body = required_body(fields.body.as_deref().unwrap_or_default())?;
        let username = username_or_unknown(fields.username.as_deref().unwrap_or_default());

        let in_reply_to = self.resolve_parent(document_id, fields.in_reply_to.as_deref())?;

        let identity = fields.email.as_deref().and_then(AvatarIdentity::from_email);

        let mut comment = Comment::new(document_id, username, body);
        comment.in_reply_to = in_reply_to;
        if let Some(identity) = &identity {
            comment.user_id = identity.user_id.clone();
            comment.avatar_hash = Some(identity.avatar_hash.clone());
            comment.gravatar_url = Some(identity.gravatar_url.clone());
        }

        let stored = self.store.append(document_id, comment)?;
        info!(document_id, date = stored.date, "comment submitted");

        if let Some(identity) = &identity {
            self.store_avatar(identity);
        }

        self.dispatch_notification(format!(
            "User {} commented \"{}\" on post #{}",
            stored.username, stored.body, document_id
        ));

        Ok(stored)
    }

    /// `submit`, gated on the captcha verifier. Nothing is written when the
    /// captcha fails.
    pub async fn submit_with_captcha(
        &self,
        document_id: &str,
        fields: SubmitFields,
        captcha_token: Option<&str>,
    ) -> ServiceResult<Comment> {
        self.verify_captcha(document_id, captcha_token).await?;
        self.submit(document_id, fields)
    }

    /// The captcha half of `submit_with_captcha`, for callers that run the
    /// store write elsewhere.
    pub async fn verify_captcha(
        &self,
        document_id: &str,
        captcha_token: Option<&str>,
    ) -> ServiceResult<()> {
        if let Err(e) = self.captcha.verify(captcha_token.unwrap_or_default()).await {
            debug!(document_id, error = %e, "captcha rejected submission");
            return Err(e.into());
        }
        Ok(())
    }

    /// All comments of a document, rendered and threaded, oldest first.
    pub fn list(&self, document_id: &str) -> ServiceResult<Vec<RenderableComment>> {
        let rendered = self
            .store
            .scan_document(document_id)?
            .map(|item| item.map(|comment| self.render(comment)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(build_threads(rendered))
    }

    /// Every comment of every document, rendered, flat, in key order.
    ///
    /// Admin-only: callers must have authenticated the request first.
    pub fn list_all(&self) -> ServiceResult<Vec<RenderableComment>> {
        let rendered = self
            .store
            .scan_all()?
            .map(|item| item.map(|comment| self.render(comment)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rendered)
    }

    /// Deletes one comment. Deleting an absent comment succeeds.
    ///
    /// Admin-only. Replies to the removed comment stay stored but no longer
    /// appear in `list`.
    pub fn remove(&self, document_id: &str, date: i64) -> ServiceResult<()> {
        self.store.delete(document_id, date)?;
        info!(document_id, date, "comment removed");
        Ok(())
    }

    /// Bulk-writes comments from a backup or another system.
    ///
    /// Comments carrying a date are written at exactly that date, replacing
    /// whatever is there, so importing the same set twice is harmless.
    /// Undated ones get the server clock. Bodies and usernames are
    /// normalized as in `submit`, and the whole batch is validated before
    /// anything is written.
    ///
    /// Admin-only. Returns the number of comments written.
    pub fn import(&self, mut comments: Vec<Comment>) -> ServiceResult<usize> {
        for comment in &mut comments {
            keys::validate_document_id(&comment.document_id).map_err(ValidationError::from)?;
            if comment.date != 0 {
                keys::encode(&comment.document_id, comment.date).map_err(ValidationError::from)?;
            }
            comment.body = required_body(&comment.body)?;
            comment.username = username_or_unknown(&comment.username);
        }

        let total = comments.len();
        for comment in comments {
            if comment.date == 0 {
                let document_id = comment.document_id.clone();
                self.store.append(&document_id, comment)?;
            } else {
                self.store.put(&comment)?;
            }
        }

        info!(count = total, "comments imported");
        Ok(total)
    }

    /// Avatar image for `avatar_hash`, if one was stored.
    pub fn avatar(&self, avatar_hash: &str) -> ServiceResult<Option<Avatar>> {
        match &self.avatars {
            Some(avatars) => Ok(avatars.get(avatar_hash)?),
            None => Ok(None),
        }
    }

    /// Captcha challenge to send with a comment listing, if the provider
    /// uses one. A provider outage leaves the listing without a challenge.
    pub async fn captcha_challenge(&self) -> Option<CaptchaChallenge> {
        match self.captcha.challenge().await {
            Ok(challenge) => challenge,
            Err(e) => {
                warn!(code = e.code(), error = %e, "captcha challenge unavailable");
                None
            }
        }
    }

    /// Avatar failures never fail the submit; the comment is already stored.
    fn store_avatar(&self, identity: &AvatarIdentity) {
        let Some(avatars) = &self.avatars else {
            return;
        };
        let written = avatars.put_if_absent(&identity.avatar_hash, || Avatar {
            content_type: IDENTICON_CONTENT_TYPE.to_string(),
            bytes: identicon_svg(&identity.identicon_seed).into_bytes(),
        });
        if let Err(e) = written {
            warn!(avatar_hash = %identity.avatar_hash, error = %e, "avatar not stored");
        }
    }

    fn render(&self, mut comment: Comment) -> RenderableComment {
        if comment.username.trim().is_empty() {
            comment.username = UNKNOWN_USERNAME.to_string();
        }
        let body_html = self.renderer.render(&comment.body);
        RenderableComment::new(comment, body_html)
    }

    /// Checks that `in_reply_to` names an existing comment of this document.
    fn resolve_parent(
        &self,
        document_id: &str,
        in_reply_to: Option<&str>,
    ) -> ServiceResult<Option<String>> {
        let parent = match in_reply_to.map(str::trim) {
            None | Some("") | Some("root") => return Ok(None),
            Some(parent) => parent,
        };

        let unknown = || ValidationError::UnknownParent(parent.to_string());

        let date = parent
            .strip_prefix(document_id)
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|date| date.parse::<i64>().ok())
            .ok_or_else(unknown)?;

        match self.store.get(document_id, date) {
            Ok(Some(_)) => Ok(Some(parent.to_string())),
            Ok(None) | Err(crate::store::StoreError::InvalidKey(_)) => Err(unknown().into()),
            Err(e) => Err(e.into()),
        }
    }

    fn dispatch_notification(&self, text: String) {
        let notifier = Arc::clone(&self.notifier);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = notifier.notify(&text).await {
                        warn!(error = %e, "comment notification failed");
                    }
                });
            }
            Err(_) => debug!("no async runtime, comment notification skipped"),
        }
    }
}

fn required_body(raw: &str) -> Result<String, ValidationError> {
    let body = raw.trim();
    if body.is_empty() {
        Err(ValidationError::BodyRequired)
    } else {
        Ok(body.to_string())
    }
}

fn username_or_unknown(raw: &str) -> String {
    match raw.trim() {
        "" => UNKNOWN_USERNAME.to_string(),
        name => name.to_string(),
    }
}
