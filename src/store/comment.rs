//! Persisted comment record

use serde::{Deserialize, Serialize};

/// A comment as stored in the log.
///
/// `document_id` and `date` double as the storage key; on read they are
/// taken from the key, not the value. The commenter's email is never part of
/// this record, only values derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub document_id: String,

    /// Milliseconds since the Unix epoch; `0` means "not yet assigned"
    #[serde(default)]
    pub date: i64,

    #[serde(default)]
    pub username: String,

    /// Raw Markdown
    pub body: String,

    /// Short id derived from the commenter's email hash, empty without email
    #[serde(default)]
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_hash: Option<String>,

    #[serde(
        default,
        rename = "gravatarURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub gravatar_url: Option<String>,

    /// `"<documentId>_<date>"` of the parent comment, `"root"` or absent for top level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
}

impl Comment {
    /// A new, undated comment.
    pub fn new(
        document_id: impl Into<String>,
        username: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            date: 0,
            username: username.into(),
            body: body.into(),
            user_id: String::new(),
            avatar_hash: None,
            gravatar_url: None,
            in_reply_to: None,
        }
    }

    /// Identifier used by replies to point at this comment.
    pub fn thread_id(&self) -> String {
        format!("{}_{}", self.document_id, self.date)
    }

    /// Whether this comment sits at the top of its document's thread.
    pub fn is_root(&self) -> bool {
        match self.in_reply_to.as_deref() {
            None | Some("") | Some("root") => true,
            Some(_) => false,
        }
    }
}
