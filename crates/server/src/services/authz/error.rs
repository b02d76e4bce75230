//! Authorization service error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during authorization operations.
///
/// A plain "no" from the evaluator is a `false` return, never an error;
/// `Denied` is reserved for privileged mutations attempted without the
/// required permission.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Caller lacks the permission required for a privileged mutation.
    #[error("permission denied")]
    Denied,

    /// Store/database error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
