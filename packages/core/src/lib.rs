//! storetree core: resources, storage trees and authorization.
//!
//! This layer gives meaning to the raw content trees of
//! `storetree-content`:
//! - `ResourceMeta`: content plus normalized metadata (type, size, times)
//! - `ResourceMetaBuilder`: stepwise construction with defaults
//! - `StorageTree`: the resource-aware tree contract, and `StorageTreeImpl`
//!   adapting any `ContentTree` to it
//! - `auth`: decorators that check a caller's `AuthContext` before every
//!   operation
//! - `TreeConfig`: backend selection from JSON
//!
//! # Example
//!
//! ```rust
//! use storetree_core::{ResourceMeta, StorageTree, TreeConfig, path};
//!
//! let tree = TreeConfig::Memory.open().unwrap();
//! let log = ResourceMeta::builder()
//!     .content_type("text/plain")
//!     .bytes("0123456789")
//!     .build()
//!     .unwrap();
//! tree.create(&path!("jobs/123/log"), log).unwrap();
//!
//! let stored = tree.get(&path!("jobs/123/log")).unwrap();
//! assert_eq!(stored.content_type(), Some("text/plain"));
//! assert_eq!(stored.content_length(), 10);
//! ```

pub mod auth;
mod builder;
mod config;
pub mod date;
mod error;
mod meta;
mod storage_tree;

pub use auth::{
    authorized_storage_tree, Action, AuthContext, AuthStorageTree, ContextStorageTree,
    RESOURCE_TYPE_STORAGE,
};
pub use builder::ResourceMetaBuilder;
pub use config::TreeConfig;
pub use error::{BuildError, StorageError};
pub use meta::{
    is_reserved_key, ResourceMeta, RESERVED_KEYS, RES_META_CONTENT_LENGTH, RES_META_CONTENT_TYPE,
    RES_META_CREATION_TIME, RES_META_MODIFY_TIME,
};
pub use storage_tree::{as_storage_tree, StorageTree, StorageTreeImpl};

// Re-export content types for convenience
pub use storetree_content::{path, Content, ContentTree, Metadata, Path, PathError};

// Async support
#[cfg(feature = "async")]
mod async_tree;

#[cfg(feature = "async")]
pub use async_tree::{AsyncStorageTree, SyncToAsync};
