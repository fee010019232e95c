//! Reply threading for display

use std::collections::HashMap;

use serde::Serialize;

use crate::store::Comment;

/// A comment prepared for display, with its replies nested beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderableComment {
    pub document_id: String,
    pub date: i64,
    pub username: String,
    /// Raw Markdown as submitted
    pub body: String,
    /// Sanitized HTML rendering of `body`
    #[serde(rename = "bodyHTML")]
    pub body_html: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_hash: Option<String>,
    #[serde(rename = "gravatarURL", skip_serializing_if = "Option::is_none")]
    pub gravatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<RenderableComment>,
}

impl RenderableComment {
    pub fn new(comment: Comment, body_html: String) -> Self {
        Self {
            document_id: comment.document_id,
            date: comment.date,
            username: comment.username,
            body: comment.body,
            body_html,
            user_id: comment.user_id,
            avatar_hash: comment.avatar_hash,
            gravatar_url: comment.gravatar_url,
            in_reply_to: comment.in_reply_to,
            replies: Vec::new(),
        }
    }

    pub fn thread_id(&self) -> String {
        format!("{}_{}", self.document_id, self.date)
    }

    pub fn is_root(&self) -> bool {
        matches!(self.in_reply_to.as_deref(), None | Some("") | Some("root"))
    }

    /// This comment plus every reply below it.
    pub fn total_count(&self) -> usize {
        1 + self.replies.iter().map(|r| r.total_count()).sum::<usize>()
    }
}

/// Nests replies under their parents.
///
/// Input must already be in ascending date order, which is what a document
/// scan yields; siblings keep that order. Replies whose parent is missing are
/// dropped, as are comments that reply to themselves.
pub fn build_threads(comments: Vec<RenderableComment>) -> Vec<RenderableComment> {
    let mut roots = Vec::new();
    let mut children: HashMap<String, Vec<RenderableComment>> = HashMap::new();

    for comment in comments {
        if comment.is_root() {
            roots.push(comment);
        } else if let Some(parent) = comment.in_reply_to.clone() {
            children.entry(parent).or_default().push(comment);
        }
    }

    fn attach(node: &mut RenderableComment, children: &mut HashMap<String, Vec<RenderableComment>>) {
        if let Some(mut replies) = children.remove(&node.thread_id()) {
            for reply in replies.iter_mut() {
                attach(reply, children);
            }
            node.replies = replies;
        }
    }

    for root in roots.iter_mut() {
        attach(root, &mut children);
    }

    roots
}
