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

//! Session and cleanup workflow core for the Deklutter client.
//!
//! Layout: `token.rs` (token persistence), `redirect.rs` (authorization
//! redirect capture and entry routes), `client.rs` (mailbox service client),
//! `ports.rs` (confirmation and notification seams), `workflow.rs` (the
//! scan/review/apply controller), `error.rs` (shared error types).

pub mod client;
pub mod error;
pub mod ports;
pub mod redirect;
pub mod token;
pub mod workflow;

pub use client::{HttpMailboxClient, MailboxApi};
pub use error::{ApiError, ApiOperation, ApiResult, WorkflowAction, WorkflowError};
pub use ports::{ConfirmationPort, NotificationPort};
pub use redirect::{Route, TOKEN_PARAM, capture_redirect};
pub use token::{FileTokenStore, MemoryTokenStore, SessionToken, TOKEN_KEY, TokenStore};
pub use workflow::{
    ActionGates, CleanupOutcome, NOTHING_TO_DELETE, Phase, WorkflowController, WorkflowDeps,
    WorkflowState, cleanup_complete, cleanup_confirmation,
};
