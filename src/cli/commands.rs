//! CLI command implementations
//!
//! Every command loads the config, installs logging and opens the store.
//! Opening replays the log, so a corrupted log stops every command before it
//! does anything else.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::auth::AdminAuth;
use crate::captcha::create_verifier;
use crate::config::Config;
use crate::http_server::{HttpServer, HttpServerConfig};
use crate::notify::create_notifier;
use crate::observability::{init_logging, LogFormat};
use crate::service::{CommentService, SanitizingMarkdown};
use crate::store::{AvatarStore, Comment, CommentStore};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_json_file, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(&config),
        Command::Check { config } => check(&config),
        Command::Compact { config } => compact(&config),
        Command::Export { config } => export(&config),
        Command::Import { file, config } => import(&config, &file),
    }
}

/// Load config and install logging.
fn boot(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level)?;
    Ok(config)
}

/// Wire the store and collaborators into a service.
pub fn build_service(config: &Config) -> CliResult<Arc<CommentService>> {
    let store = Arc::new(CommentStore::open(config.data_path())?);
    let notifier = create_notifier(config.email.clone());
    let captcha = create_verifier(config.captcha.as_ref())?;
    let avatars = Arc::new(AvatarStore::open(config.data_path())?);

    Ok(Arc::new(
        CommentService::new(store, Arc::new(SanitizingMarkdown::new()), notifier, captcha)
            .with_avatars(avatars),
    ))
}

/// Start the HTTP server and serve until Ctrl-C.
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = boot(config_path)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let service = build_service(&config)?;
        let auth = AdminAuth::new(config.admin_password.as_bytes());
        let server = HttpServer::new(HttpServerConfig::from(&config), service, auth);

        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Replay the log and report what it holds.
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = boot(config_path)?;
    let store = CommentStore::open(config.data_path())?;

    let mut documents = std::collections::BTreeSet::new();
    for comment in store.scan_all()? {
        documents.insert(comment?.document_id);
    }

    let log_bytes = std::fs::metadata(store.log_path())?.len();
    write_response(json!({
        "comments": store.len(),
        "documents": documents.len(),
        "log_bytes": log_bytes,
    }))?;

    store.close()?;
    Ok(())
}

/// Rewrite the log with live comments only.
pub fn compact(config_path: &Path) -> CliResult<()> {
    let config = boot(config_path)?;
    let store = CommentStore::open(config.data_path())?;

    let before = std::fs::metadata(store.log_path())?.len();
    store.compact()?;
    let after = std::fs::metadata(store.log_path())?.len();
    info!(before, after, "log compacted");

    write_response(json!({
        "comments": store.len(),
        "bytes_before": before,
        "bytes_after": after,
    }))?;

    store.close()?;
    Ok(())
}

/// Print every comment, in key order.
pub fn export(config_path: &Path) -> CliResult<()> {
    let config = boot(config_path)?;
    let store = CommentStore::open(config.data_path())?;

    let comments = store.scan_all()?.collect::<Result<Vec<Comment>, _>>()?;
    write_response(json!({ "comments": comments }))?;

    store.close()?;
    Ok(())
}

/// Import a JSON array of comments, as produced by `export`'s `comments`.
pub fn import(config_path: &Path, file: &Path) -> CliResult<()> {
    let config = boot(config_path)?;
    let comments: Vec<Comment> = read_json_file(file)?;
    let service = build_service(&config)?;

    let imported = service.import(comments)?;
    service.store().flush()?;

    write_response(json!({ "imported": imported }))?;
    Ok(())
}
