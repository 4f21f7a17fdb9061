//! Error types for spansync-sync.

use thiserror::Error;

use spansync_core::StoreError;

/// Errors that escape a sync operation.
///
/// Rendering failures for a single marker never surface here; they become
/// inline placeholders. What remains is storage trouble for the record being
/// synced.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the record store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
