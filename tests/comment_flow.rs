//! Comment Flow Tests
//!
//! End-to-end through the comment service: submit, list, moderate.

use std::sync::Arc;

use commentd::auth::{sign, AdminAuth, AuthOutcome};
use commentd::captcha::{CaptchaVerifier, StaticCaptcha};
use commentd::notify::{MockNotifier, Notifier};
use commentd::service::{
    CommentService, SanitizingMarkdown, ServiceError, SubmitFields, ValidationError,
};
use commentd::store::{Comment, CommentStore};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

struct Harness {
    _dir: TempDir,
    service: CommentService,
    notifier: Arc<MockNotifier>,
}

fn harness_with(notifier: MockNotifier, captcha: StaticCaptcha) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(CommentStore::open(dir.path()).unwrap());
    let notifier = Arc::new(notifier);
    let service = CommentService::new(
        store,
        Arc::new(SanitizingMarkdown::new()),
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        Arc::new(captcha) as Arc<dyn CaptchaVerifier>,
    );
    Harness {
        _dir: dir,
        service,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(MockNotifier::new(), StaticCaptcha::accept_all())
}

async fn settle(notifier: &MockNotifier, expected: usize) {
    for _ in 0..100 {
        if notifier.sent_count() >= expected {
            return;
        }
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// Submit and list
// =============================================================================

#[tokio::test]
async fn test_submit_then_list() {
    let h = harness();

    h.service
        .submit_with_captcha("post42", SubmitFields::new("Alice", "hello"), Some("token"))
        .await
        .unwrap();

    let comments = h.service.list("post42").unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].username, "Alice");
    assert!(comments[0].body_html.contains("hello"));
    assert!(comments[0].date > 0);

    settle(&h.notifier, 1).await;
    assert_eq!(h.notifier.sent_count(), 1);
}

#[tokio::test]
async fn test_empty_body_rejected() {
    let h = harness();

    let err = h
        .service
        .submit_with_captcha("post42", SubmitFields::new("Alice", ""), Some("token"))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Validation(ValidationError::BodyRequired)));
    assert!(h.service.list("post42").unwrap().is_empty());
    assert_eq!(h.notifier.sent_count(), 0);
}

#[tokio::test]
async fn test_captcha_gates_the_store() {
    let h = harness_with(MockNotifier::new(), StaticCaptcha::reject_all());

    let err = h
        .service
        .submit_with_captcha("post42", SubmitFields::new("Alice", "hello"), Some("bad"))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Captcha(_)));
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_submit() {
    let h = harness_with(MockNotifier::failing(), StaticCaptcha::accept_all());

    h.service
        .submit_with_captcha("post42", SubmitFields::new("Alice", "hello"), None)
        .await
        .unwrap();

    settle(&h.notifier, 1).await;
    assert_eq!(h.notifier.sent_count(), 1);
    assert_eq!(h.service.list("post42").unwrap().len(), 1);
}

/// Rendering neutralizes script injection in comment bodies.
#[test]
fn test_bodies_are_sanitized() {
    let h = harness();
    h.service
        .submit(
            "post",
            SubmitFields::new("Mallory", "<script>alert('x')</script><img src=x onerror=alert(1)>"),
        )
        .unwrap();

    let html = &h.service.list("post").unwrap()[0].body_html;
    assert!(!html.contains("<script"));
    assert!(!html.contains("onerror"));
}

/// Replies nest under their parent; a reply to a deleted comment disappears.
#[test]
fn test_threading_and_orphans() {
    let h = harness();
    let root = h.service.submit("post", SubmitFields::new("A", "root")).unwrap();
    let reply = h
        .service
        .submit("post", SubmitFields::new("B", "reply").replying_to(root.thread_id()))
        .unwrap();
    h.service
        .submit("post", SubmitFields::new("C", "nested").replying_to(reply.thread_id()))
        .unwrap();

    let threads = h.service.list("post").unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].total_count(), 3);

    h.service.remove("post", root.date).unwrap();
    assert!(h.service.list("post").unwrap().is_empty());
    assert_eq!(h.service.list_all().unwrap().len(), 2);
}

/// Users with the same email share a userId; the email is never returned.
#[test]
fn test_avatar_identity() {
    let h = harness();
    let a = h
        .service
        .submit("post", SubmitFields::new("A", "one").with_email("Same@Example.com"))
        .unwrap();
    let b = h
        .service
        .submit("post", SubmitFields::new("B", "two").with_email(" same@example.com "))
        .unwrap();
    let anon = h.service.submit("post", SubmitFields::new("C", "three")).unwrap();

    assert_eq!(a.user_id, b.user_id);
    assert_eq!(a.avatar_hash, b.avatar_hash);
    assert!(anon.user_id.is_empty());
    assert!(anon.gravatar_url.is_none());

    let json = serde_json::to_string(&h.service.list("post").unwrap()).unwrap();
    assert!(!json.to_lowercase().contains("same@example.com"));
}

// =============================================================================
// Moderation
// =============================================================================

/// Signed admin delete removes exactly the targeted comment.
#[test]
fn test_admin_delete_flow() {
    let h = harness();
    let auth = AdminAuth::new("admin-secret");

    let keep = h.service.submit("post42", SubmitFields::new("A", "keep")).unwrap();
    let doomed = h.service.submit("post42", SubmitFields::new("B", "spam")).unwrap();

    let body = format!(
        r#"{{"delete":{{"documentId":"post42","date":{}}}}}"#,
        doomed.date
    );
    let credential = sign(b"admin-secret", body.as_bytes(), &auth.current_nonce()).unwrap();

    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Target {
        document_id: String,
        date: i64,
    }
    #[derive(serde::Deserialize)]
    struct Delete {
        delete: Target,
    }

    let (decoded, _) = auth.verify_json::<Delete>(Some(&credential), body.as_bytes());
    let AuthOutcome::Authenticated(request) = decoded.unwrap() else {
        panic!("admin request should authenticate");
    };
    h.service
        .remove(&request.delete.document_id, request.delete.date)
        .unwrap();

    let remaining: Vec<i64> = h
        .service
        .store()
        .scan_document("post42")
        .unwrap()
        .map(|c| c.unwrap().date)
        .collect();
    assert_eq!(remaining, vec![keep.date]);
}

/// Importing the same export twice leaves one copy of each comment.
#[test]
fn test_import_is_repeatable() {
    let h = harness();
    let mut first = Comment::new("post", "A", "imported one");
    first.date = 1_600_000_000_000;
    let mut second = Comment::new("other", "B", "imported two");
    second.date = 1_600_000_000_001;

    let batch = vec![first, second];
    assert_eq!(h.service.import(batch.clone()).unwrap(), 2);
    assert_eq!(h.service.import(batch).unwrap(), 2);

    // Shorter ids pad with more leading zeros, so "post" sorts before "other"
    let all = h.service.list_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].document_id, "post");
    assert_eq!(all[1].document_id, "other");
}
