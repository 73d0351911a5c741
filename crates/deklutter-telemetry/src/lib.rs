#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! Telemetry primitives shared across the Deklutter workspace.
//!
//! Layout: `init.rs` (subscriber installation and build SHA), `context.rs`
//! (per-command spans).

pub mod context;
pub mod init;

pub use context::command_span;
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
