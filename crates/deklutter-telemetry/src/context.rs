//! Span helpers that tie log lines to a single CLI invocation.

use tracing::Span;

use crate::init::build_sha;

/// Build the top-level span for one command invocation.
///
/// Every request issued while the span is active carries the same
/// `trace_id`, which the CLI also sends as `x-request-id`.
#[must_use]
pub fn command_span(command: &str, trace_id: &str) -> Span {
    tracing::info_span!(
        "command",
        command = %command,
        trace_id = %trace_id,
        build_sha = %build_sha()
    )
}
