//! Store-bound service calls from async handlers
//!
//! Every store write fsyncs, so service calls run on tokio's blocking pool
//! instead of the request worker threads.

use std::sync::Arc;

use tracing::error;

use crate::service::{CommentService, ServiceError, ServiceResult};

/// Runs `call` against the service on the blocking pool.
pub async fn run_blocking<T, F>(service: &Arc<CommentService>, call: F) -> ServiceResult<T>
where
    F: FnOnce(&CommentService) -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| {
            error!(error = %e, "service task panicked");
            ServiceError::TaskFailed(e.to_string())
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captcha::StaticCaptcha;
    use crate::notify::NullNotifier;
    use crate::service::{SanitizingMarkdown, SubmitFields};
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

    #[tokio::test]
    async fn test_runs_on_blocking_pool() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);

        let has_runtime = run_blocking(&service, |_| {
            Ok(tokio::runtime::Handle::try_current().is_ok())
        })
        .await
        .unwrap();
        // blocking-pool threads still see the runtime handle
        assert!(has_runtime);

        let stored = run_blocking(&service, |s| s.submit("post", SubmitFields::new("A", "hi")))
            .await
            .unwrap();
        assert!(service.store().get("post", stored.date).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_panic_becomes_task_failure() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir);

        let result: ServiceResult<()> = run_blocking(&service, |_| panic!("boom")).await;
        assert!(matches!(result, Err(ServiceError::TaskFailed(_))));
    }
}
