//! Scan → review → apply state machine.
//!
//! # Design
//! - One tagged state replaces loose "loading"/"has results"/"has error"
//!   flags, so a scan can never be in flight while results are on screen.
//! - Each action awaits its single network call inside the transition; the
//!   controller is borrowed mutably for the duration, which serialises
//!   actions without locks.
//! - Service failures end in [`WorkflowState::Error`] and never clear the
//!   token; only logout does.
//! - A failed apply keeps the reviewed result (`retained`) so the user can
//!   retry the cleanup without scanning again.

use std::fmt::{self, Display, Formatter};
use std::mem;
use std::sync::Arc;

use deklutter_api_models::{
    ApplyOutcome, ApplyRequest, ScanRequest, ScanResult, TRASH_RETENTION_DAYS,
};

use crate::client::MailboxApi;
use crate::error::{WorkflowAction, WorkflowError};
use crate::ports::{ConfirmationPort, NotificationPort};
use crate::redirect::Route;
use crate::token::{SessionToken, TokenStore};

/// Notice shown when the delete set is empty.
pub const NOTHING_TO_DELETE: &str = "No messages to delete.";

/// Workflow state owned by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    /// No token; the view must route to the landing page.
    Unauthenticated,
    /// Signed in, nothing scanned yet (or the last cleanup finished).
    Idle {
        /// Active token.
        token: SessionToken,
    },
    /// Scan request in flight.
    Scanning {
        /// Active token.
        token: SessionToken,
    },
    /// Triage on screen.
    Reviewing {
        /// Active token.
        token: SessionToken,
        /// Result of the last successful scan.
        result: ScanResult,
    },
    /// Apply request in flight.
    Applying {
        /// Active token.
        token: SessionToken,
        /// Result being applied.
        result: ScanResult,
    },
    /// Last scan or apply failed.
    Error {
        /// Active token.
        token: SessionToken,
        /// Service message or generic fallback.
        message: String,
        /// Triage kept from a failed apply, if that is what failed.
        retained: Option<ScanResult>,
    },
}

impl WorkflowState {
    /// Discriminant without payload.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Unauthenticated => Phase::Unauthenticated,
            Self::Idle { .. } => Phase::Idle,
            Self::Scanning { .. } => Phase::Scanning,
            Self::Reviewing { .. } => Phase::Reviewing,
            Self::Applying { .. } => Phase::Applying,
            Self::Error { .. } => Phase::Error,
        }
    }

    /// Active token, absent only when unauthenticated.
    #[must_use]
    pub const fn token(&self) -> Option<&SessionToken> {
        match self {
            Self::Unauthenticated => None,
            Self::Idle { token }
            | Self::Scanning { token }
            | Self::Reviewing { token, .. }
            | Self::Applying { token, .. }
            | Self::Error { token, .. } => Some(token),
        }
    }

    /// Triage the view should show, if any.
    #[must_use]
    pub const fn result(&self) -> Option<&ScanResult> {
        match self {
            Self::Reviewing { result, .. } | Self::Applying { result, .. } => Some(result),
            Self::Error {
                retained: Some(result),
                ..
            } => Some(result),
            _ => None,
        }
    }

    /// Error message, when in the error state.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Payload-free view of [`WorkflowState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// See [`WorkflowState::Unauthenticated`].
    Unauthenticated,
    /// See [`WorkflowState::Idle`].
    Idle,
    /// See [`WorkflowState::Scanning`].
    Scanning,
    /// See [`WorkflowState::Reviewing`].
    Reviewing,
    /// See [`WorkflowState::Applying`].
    Applying,
    /// See [`WorkflowState::Error`].
    Error,
}

impl Phase {
    /// Stable lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Reviewing => "reviewing",
            Self::Applying => "applying",
            Self::Error => "error",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Which user actions are enabled in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionGates {
    /// A scan may be requested.
    pub scan: bool,
    /// The cleanup button may be pressed.
    pub cleanup: bool,
    /// Logout is offered.
    pub logout: bool,
}

/// Result of [`WorkflowController::confirm_cleanup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The delete set was empty; no request was sent.
    NothingToDelete,
    /// The user declined the confirmation; no request was sent.
    Declined,
    /// The service trashed the messages and the triage was cleared.
    Applied {
        /// Number of identifiers sent.
        count: usize,
        /// Counts reported by the service.
        outcome: ApplyOutcome,
    },
    /// The apply call failed; the controller is in the error state.
    Failed {
        /// Message surfaced to the user.
        message: String,
    },
}

/// Collaborators the controller is wired to.
#[derive(Clone)]
pub struct WorkflowDeps {
    /// Token persistence.
    pub store: Arc<dyn TokenStore>,
    /// Mailbox service.
    pub api: Arc<dyn MailboxApi>,
    /// Confirmation prompt.
    pub confirm: Arc<dyn ConfirmationPort>,
    /// Notice sink.
    pub notify: Arc<dyn NotificationPort>,
}

/// Session and cleanup workflow controller.
pub struct WorkflowController {
    state: WorkflowState,
    deps: WorkflowDeps,
}

impl WorkflowController {
    /// Read the stored token and pick the initial state and route.
    #[must_use]
    pub fn boot(deps: WorkflowDeps) -> (Self, Route) {
        let (state, route) = match deps.store.load() {
            Some(token) => (WorkflowState::Idle { token }, Route::Dashboard),
            None => (WorkflowState::Unauthenticated, Route::Landing),
        };
        tracing::debug!(phase = %state.phase(), "workflow booted");
        (Self { state, deps }, route)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Where the view belongs for the current state.
    #[must_use]
    pub const fn route(&self) -> Route {
        match self.state {
            WorkflowState::Unauthenticated => Route::Landing,
            _ => Route::Dashboard,
        }
    }

    /// Actions the view should enable.
    #[must_use]
    pub const fn gates(&self) -> ActionGates {
        let phase = self.state.phase();
        ActionGates {
            scan: matches!(phase, Phase::Idle | Phase::Reviewing | Phase::Error),
            cleanup: matches!(
                self.state,
                WorkflowState::Reviewing { .. }
                    | WorkflowState::Error {
                        retained: Some(_),
                        ..
                    }
            ),
            logout: !matches!(phase, Phase::Unauthenticated),
        }
    }

    /// Run a scan, replacing any previous result or error.
    ///
    /// Returns the phase reached: [`Phase::Reviewing`] on success,
    /// [`Phase::Error`] when the service call failed.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ActionUnavailable`] unless the controller is
    /// idle, reviewing, or in the error state.
    pub async fn request_scan(&mut self, request: ScanRequest) -> Result<Phase, WorkflowError> {
        if !self.gates().scan {
            return Err(self.unavailable(WorkflowAction::Scan));
        }
        let Some(token) = self.state.token().cloned() else {
            return Err(self.unavailable(WorkflowAction::Scan));
        };

        self.transition(WorkflowState::Scanning {
            token: token.clone(),
        });

        let next = match self.deps.api.scan(&token, &request).await {
            Ok(result) => {
                tracing::info!(
                    delete = result.summary.counts.delete,
                    review = result.summary.counts.review,
                    keep = result.summary.counts.keep,
                    "scan completed"
                );
                WorkflowState::Reviewing { token, result }
            }
            Err(err) => WorkflowState::Error {
                token,
                message: err.user_message(),
                retained: None,
            },
        };
        self.transition(next);
        Ok(self.phase())
    }

    /// Trash the current delete set after an explicit confirmation.
    ///
    /// An empty delete set is reported through the notification port without
    /// a network call. Otherwise the user is asked to confirm the exact count
    /// and the recovery window before the apply request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ActionUnavailable`] unless a triage result is
    /// on screen (reviewing, or retained after a failed apply).
    pub async fn confirm_cleanup(&mut self) -> Result<CleanupOutcome, WorkflowError> {
        if !self.gates().cleanup {
            return Err(self.unavailable(WorkflowAction::Cleanup));
        }
        let Some(request) = self.state.result().and_then(ApplyRequest::from_scan) else {
            self.deps.notify.inform(NOTHING_TO_DELETE);
            return Ok(CleanupOutcome::NothingToDelete);
        };

        let count = request.message_ids().len();
        if !self.deps.confirm.ask(&cleanup_confirmation(count)) {
            tracing::debug!(count, "cleanup declined");
            return Ok(CleanupOutcome::Declined);
        }

        let Some(token) = self.state.token().cloned() else {
            return Err(self.unavailable(WorkflowAction::Cleanup));
        };
        let unavailable = self.unavailable(WorkflowAction::Cleanup);
        let result = match &mut self.state {
            WorkflowState::Reviewing { result, .. }
            | WorkflowState::Error {
                retained: Some(result),
                ..
            } => mem::take(result),
            _ => return Err(unavailable),
        };
        self.transition(WorkflowState::Applying {
            token: token.clone(),
            result,
        });

        match self.deps.api.apply(&token, &request).await {
            Ok(outcome) => {
                self.transition(WorkflowState::Idle { token });
                self.deps.notify.inform(&cleanup_complete(count));
                Ok(CleanupOutcome::Applied { count, outcome })
            }
            Err(err) => {
                let message = err.user_message();
                let retained = match &mut self.state {
                    WorkflowState::Applying { result, .. } => Some(mem::take(result)),
                    _ => None,
                };
                self.transition(WorkflowState::Error {
                    token,
                    message: message.clone(),
                    retained,
                });
                Ok(CleanupOutcome::Failed { message })
            }
        }
    }

    /// Clear the stored token and return to the landing page.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ActionUnavailable`] when already signed out.
    pub fn logout(&mut self) -> Result<Route, WorkflowError> {
        if !self.gates().logout {
            return Err(self.unavailable(WorkflowAction::Logout));
        }
        self.deps.store.clear();
        self.transition(WorkflowState::Unauthenticated);
        tracing::info!("signed out");
        Ok(Route::Landing)
    }

    fn transition(&mut self, next: WorkflowState) {
        let from = self.state.phase();
        let to = next.phase();
        if let WorkflowState::Error { message, .. } = &next {
            tracing::warn!(%from, %to, message = %message, "workflow entered error state");
        } else {
            tracing::debug!(%from, %to, "workflow transition");
        }
        self.state = next;
    }

    const fn unavailable(&self, action: WorkflowAction) -> WorkflowError {
        WorkflowError::ActionUnavailable {
            action,
            phase: self.state.phase(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_state(deps: WorkflowDeps, state: WorkflowState) -> Self {
        Self { state, deps }
    }
}

/// Confirmation text naming the count and the recovery window.
#[must_use]
pub fn cleanup_confirmation(count: usize) -> String {
    format!(
        "Move {} to trash? You can recover them for {TRASH_RETENTION_DAYS} days.",
        messages_label(count)
    )
}

/// Notice shown after a successful apply.
#[must_use]
pub fn cleanup_complete(count: usize) -> String {
    format!("Cleanup complete: {} moved to trash.", messages_label(count))
}

fn messages_label(count: usize) -> String {
    if count == 1 {
        "1 message".to_string()
    } else {
        format!("{count} messages")
    }
}
