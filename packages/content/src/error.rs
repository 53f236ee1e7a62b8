//! Error types for content trees.
//!
//! These are backend-native errors. The resource layer translates them into
//! its own taxonomy and never hands them to callers.

use crate::path::{Path, PathError};

/// Errors raised by [`ContentTree`](crate::ContentTree) backends.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A resource already exists at the path.
    #[error("resource already exists: {path}")]
    Exists { path: Path },

    /// No resource exists at the path.
    #[error("no resource at: {path}")]
    Missing { path: Path },

    /// An ancestor of the target is a resource, so it cannot hold children.
    #[error("ancestor is a resource: {ancestor}")]
    NotADirectory { ancestor: Path },

    /// The target is a directory, not a resource.
    #[error("path is a directory: {path}")]
    IsADirectory { path: Path },

    /// The path cannot be used for this operation.
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    /// A single-use content stream was opened a second time.
    #[error("content stream already consumed")]
    StreamConsumed,

    /// Stored data could not be decoded.
    #[error("corrupt entry at {path}: {message}")]
    Corrupt { path: Path, message: String },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
