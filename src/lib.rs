//! commentd - a self-hosted comment server
//!
//! Threaded, Markdown-rendered comments per document, stored in an ordered
//! key-value log, with a captcha-gated public write path and an HMAC-signed
//! admin path for moderation.

pub mod auth;
pub mod captcha;
pub mod cli;
pub mod config;
pub mod http_server;
pub mod keys;
pub mod notify;
pub mod observability;
pub mod service;
pub mod store;
