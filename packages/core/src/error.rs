//! Error types for the resource layer.

use storetree_content::{Path, TreeError};

use crate::auth::Action;

/// Building a resource failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// No content source was ever set; a resource needs retrievable bytes.
    #[error("resource has no content source")]
    MissingContent,
}

/// Errors returned by storage trees.
///
/// Backend errors are translated into these variants at the facade, so
/// callers never see a backend-specific type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Nothing (or no resource) exists at the path.
    #[error("resource not found: {path}")]
    NotFound { path: Path },

    /// The path is malformed or cannot hold a resource.
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: Path, message: String },

    /// A resource already exists at the path.
    #[error("resource already exists: {path}")]
    Conflict { path: Path },

    /// The caller's context denied the action.
    #[error("unauthorized: {action} on {path}")]
    Unauthorized { path: Path, action: Action },

    /// The content stream or backend failed.
    #[error("I/O error at '{path}': {message}")]
    Io { path: Path, message: String },

    /// A resource could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Configuration could not be loaded.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl StorageError {
    /// Translate a backend error raised while operating on `path`.
    pub fn from_tree(path: &Path, error: TreeError) -> Self {
        match error {
            TreeError::Exists { path } => StorageError::Conflict { path },
            TreeError::Missing { path } => StorageError::NotFound { path },
            TreeError::NotADirectory { ancestor } => StorageError::InvalidPath {
                path: path.clone(),
                message: format!("ancestor '{}' is a resource", ancestor),
            },
            TreeError::IsADirectory { path } => StorageError::InvalidPath {
                path,
                message: "path is a directory".to_string(),
            },
            TreeError::InvalidPath(e) => StorageError::InvalidPath {
                path: path.clone(),
                message: e.to_string(),
            },
            TreeError::StreamConsumed => StorageError::Io {
                path: path.clone(),
                message: "content stream already consumed".to_string(),
            },
            TreeError::Corrupt { path, message } => {
                tracing::warn!(path = %path, %message, "corrupt stored resource");
                StorageError::Io { path, message }
            }
            TreeError::Io(e) => {
                tracing::warn!(path = %path, error = %e, "backend I/O failure");
                StorageError::Io {
                    path: path.clone(),
                    message: e.to_string(),
                }
            }
        }
    }
}
