//! Observability for commentd
//!
//! Structured logging through `tracing`. Modules emit events with the
//! `tracing` macros and structured fields; this module installs the
//! subscriber once at process start.
//!
//! # Usage
//!
//! ```ignore
//! use commentd::observability::{init_logging, LogFormat};
//!
//! init_logging(LogFormat::Json, "info")?;
//! tracing::info!(document_id = "post42", "comment submitted");
//! ```

mod logging;

pub use logging::{init_logging, LogFormat, LoggingError};
