//! Typed error types for the hierarchy store.
//!
//! Most failure modes in this crate are expected races and are absorbed
//! where they happen (see the engine's skip-silently policy). What remains
//! surfaces as [`StoreError`] so callers at the crate boundary can match on
//! specific variants instead of opaque strings.

use crate::forest::{TabId, WindowId};
use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by the host tab/window system
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The tab no longer exists (closed or replaced)
    #[error("tab {0} not found")]
    TabNotFound(TabId),

    /// The window no longer exists
    #[error("window {0} not found")]
    WindowNotFound(WindowId),
}

/// Top-level error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("storage I/O failed for '{path}': {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The collection could not be encoded
    #[error("failed to encode collection: {0}")]
    Encode(#[from] serde_json::Error),

    /// A host query the operation depends on failed
    #[error(transparent)]
    Host(#[from] HostError),
}
