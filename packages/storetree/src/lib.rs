//! storetree: a hierarchical, authorization-aware storage abstraction.
//!
//! A tree of named resources, each holding a binary content stream plus
//! normalized metadata, reachable only through operations that are checked
//! against the caller's permissions before any I/O happens.
//!
//! The workspace is layered:
//! - [`content`]: paths, content sources, and raw `ContentTree` backends
//!   (in memory and on local disk)
//! - [`tree`]: the resource model, the `StorageTree` facade, authorization
//!   decorators, and backend configuration
//!
//! The most used types of both layers are re-exported at the top level.
//!
//! # Example
//!
//! ```rust
//! use storetree::{authorized_storage_tree, auth, Action, Path, ResourceMeta, StorageTree, TreeConfig, path};
//!
//! let backend = TreeConfig::from_json(r#"{"type": "memory"}"#).unwrap().open().unwrap();
//! let readers_only = auth::from_fn(|_: &str, _: &Path, action| action == Action::Read);
//! let tree = authorized_storage_tree(readers_only, backend);
//!
//! let resource = ResourceMeta::builder().bytes("x").build().unwrap();
//! assert!(tree.create(&path!("notes/today"), resource).is_err());
//! assert!(tree.list(&Path::root()).unwrap().is_empty());
//! ```

pub use storetree_content as content;
pub use storetree_core as tree;

pub use storetree_content::{
    path, Bytes, Content, ContentTree, LocalTree, MemoryTree, Metadata, Path, PathError, TreeError,
};
pub use storetree_core::{
    as_storage_tree, auth, authorized_storage_tree, date, Action, AuthContext, AuthStorageTree,
    BuildError, ContextStorageTree, ResourceMeta, ResourceMetaBuilder, StorageError, StorageTree,
    StorageTreeImpl, TreeConfig,
};

#[cfg(feature = "async")]
pub use storetree_core::{AsyncStorageTree, SyncToAsync};

/// Open the backend named by a JSON configuration, with every operation
/// checked against `context`.
pub fn open_authorized<C: AuthContext>(
    config_json: &str,
    context: C,
) -> Result<ContextStorageTree<Box<dyn StorageTree>, C>, StorageError> {
    let config = TreeConfig::from_json(config_json)?;
    tracing::debug!(?config, "opening storage tree");
    Ok(authorized_storage_tree(context, config.open()?))
}
