//! Error types for mailbox-service calls and workflow transitions.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::workflow::Phase;

/// Result alias for mailbox-service calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Remote operation an [`ApiError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOperation {
    /// `POST /oauth/google/init`.
    Init,
    /// `POST /gmail/scan`.
    Scan,
    /// `POST /gmail/apply`.
    Apply,
}

impl ApiOperation {
    /// Message shown when the service gave nothing better.
    #[must_use]
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::Init => "Failed to connect. Please try again.",
            Self::Scan => "Scan failed",
            Self::Apply => "Cleanup failed",
        }
    }

    /// Stable operation name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Scan => "scan",
            Self::Apply => "apply",
        }
    }
}

impl Display for ApiOperation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Uniform failure shape for the three mailbox-service operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response arrived (connect, DNS, TLS or timeout failure).
    #[error("{operation} request failed before a response was received")]
    Transport {
        /// Operation that failed.
        operation: ApiOperation,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The service answered with a non-success status.
    #[error("{operation} request rejected with status {status}")]
    Service {
        /// Operation that failed.
        operation: ApiOperation,
        /// HTTP status code.
        status: u16,
        /// `message` field of the error body, when present.
        message: Option<String>,
    },
    /// The service answered with success but the body did not parse.
    #[error("{operation} response could not be decoded")]
    MalformedResponse {
        /// Operation that failed.
        operation: ApiOperation,
        /// Decoder error detail.
        detail: String,
    },
}

impl ApiError {
    /// Operation the error belongs to.
    #[must_use]
    pub const fn operation(&self) -> ApiOperation {
        match self {
            Self::Transport { operation, .. }
            | Self::Service { operation, .. }
            | Self::MalformedResponse { operation, .. } => *operation,
        }
    }

    /// Text surfaced to the user: the service message verbatim, or the
    /// operation's generic fallback.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Service {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => self.operation().fallback_message().to_string(),
        }
    }
}

/// Rejected controller action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// The action is disabled in the current phase.
    #[error("{action} is not available while {phase}")]
    ActionUnavailable {
        /// Requested action.
        action: WorkflowAction,
        /// Phase the controller was in.
        phase: Phase,
    },
}

/// User-triggered controller actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Request a scan.
    Scan,
    /// Confirm the cleanup of the delete set.
    Cleanup,
    /// Drop the session.
    Logout,
}

impl Display for WorkflowAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Scan => "scan",
            Self::Cleanup => "cleanup",
            Self::Logout => "logout",
        })
    }
}
