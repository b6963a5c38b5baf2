//! Error types for the notification bus.

use thiserror::Error;

/// Errors raised by the strict transaction API.
///
/// The default transaction calls never fail; only
/// [`try_start_transaction`](super::try_start_transaction) reports nesting.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A transaction was started while another one was open
    #[error("A transaction is already active on this thread")]
    TransactionAlreadyActive,
}

impl NotifyError {
    /// Check if this error reports a nested transaction
    pub fn is_nested_transaction(&self) -> bool {
        matches!(self, NotifyError::TransactionAlreadyActive)
    }
}

// Conversion from NotifyError to the main Error type
impl From<NotifyError> for crate::Error {
    fn from(err: NotifyError) -> Self {
        crate::Error::Notify(err)
    }
}
