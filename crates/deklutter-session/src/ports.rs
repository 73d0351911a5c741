//! Interaction ports the view layer implements for the workflow controller.

/// Asks the user to approve a destructive step.
pub trait ConfirmationPort: Send + Sync {
    /// Present `message` and report whether the user chose to proceed.
    fn ask(&self, message: &str) -> bool;
}

/// Surfaces one-off notices (no-op reports, completion messages).
pub trait NotificationPort: Send + Sync {
    /// Show `message` to the user.
    fn inform(&self, message: &str);
}
