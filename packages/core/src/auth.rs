//! Authorization-enforcing decorators over storage trees.
//!
//! Every operation is checked against the caller's [`AuthContext`] before
//! the wrapped tree is touched. A denied call returns
//! [`StorageError::Unauthorized`] and performs no I/O; listings are filtered
//! down to the children the caller may read.
//!
//! There are two ways to use the decorator:
//!
//! - [`AuthStorageTree`] is shared between callers, and each operation takes
//!   the caller's context explicitly.
//! - [`ContextStorageTree`] binds one context to a shared decorator and
//!   implements [`StorageTree`], so it can stand in wherever an undecorated
//!   tree is expected.
//!
//! # Example
//!
//! ```rust
//! use storetree_content::{MemoryTree, path};
//! use storetree_core::auth::{self, Action};
//! use storetree_core::{authorized_storage_tree, ResourceMeta, StorageError, StorageTree, StorageTreeImpl};
//!
//! let facade = StorageTreeImpl::new(MemoryTree::new());
//! let no_logs = auth::from_fn(|_ty: &str, path: &storetree_content::Path, action| {
//!     !(action == Action::Read && path.name() == Some("log"))
//! });
//! let tree = authorized_storage_tree(no_logs, facade);
//!
//! let resource = ResourceMeta::builder().bytes("0123456789").build().unwrap();
//! tree.create(&path!("jobs/123/log"), resource).unwrap();
//!
//! assert!(matches!(
//!     tree.get(&path!("jobs/123/log")),
//!     Err(StorageError::Unauthorized { .. })
//! ));
//! assert!(tree.list(&path!("jobs/123")).unwrap().is_empty());
//! ```

use std::fmt;
use std::sync::Arc;

use storetree_content::Path;

use crate::meta::ResourceMeta;
use crate::storage_tree::StorageTree;
use crate::StorageError;

/// Resource type passed to [`AuthContext::is_authorized`] for tree paths.
pub const RESOURCE_TYPE_STORAGE: &str = "storage";

/// The kind of access an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Lowercase name, as used in policy decisions and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller's permissions, consulted before every operation.
///
/// Implementations are only ever read by the decorators; the decision for a
/// given `(resource_type, path, action)` is entirely the context's.
pub trait AuthContext: Send + Sync {
    /// Whether the caller may perform `action` on `path`.
    fn is_authorized(&self, resource_type: &str, path: &Path, action: Action) -> bool;
}

impl<T: AuthContext + ?Sized> AuthContext for &T {
    fn is_authorized(&self, resource_type: &str, path: &Path, action: Action) -> bool {
        (**self).is_authorized(resource_type, path, action)
    }
}

impl<T: AuthContext + ?Sized> AuthContext for Box<T> {
    fn is_authorized(&self, resource_type: &str, path: &Path, action: Action) -> bool {
        self.as_ref().is_authorized(resource_type, path, action)
    }
}

impl<T: AuthContext + ?Sized> AuthContext for Arc<T> {
    fn is_authorized(&self, resource_type: &str, path: &Path, action: Action) -> bool {
        self.as_ref().is_authorized(resource_type, path, action)
    }
}

/// Permits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AuthContext for AllowAll {
    fn is_authorized(&self, _resource_type: &str, _path: &Path, _action: Action) -> bool {
        true
    }
}

/// Permits nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl AuthContext for DenyAll {
    fn is_authorized(&self, _resource_type: &str, _path: &Path, _action: Action) -> bool {
        false
    }
}

/// An [`AuthContext`] backed by a closure. See [`from_fn`].
#[derive(Clone)]
pub struct FnAuthContext<F> {
    decide: F,
}

impl<F> fmt::Debug for FnAuthContext<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAuthContext").finish_non_exhaustive()
    }
}

impl<F> AuthContext for FnAuthContext<F>
where
    F: Fn(&str, &Path, Action) -> bool + Send + Sync,
{
    fn is_authorized(&self, resource_type: &str, path: &Path, action: Action) -> bool {
        (self.decide)(resource_type, path, action)
    }
}

/// Build an [`AuthContext`] from a decision closure.
pub fn from_fn<F>(decide: F) -> FnAuthContext<F>
where
    F: Fn(&str, &Path, Action) -> bool + Send + Sync,
{
    FnAuthContext { decide }
}

/// Authorizing decorator shared between callers.
///
/// Each operation takes the caller's context and checks it before
/// delegating:
///
/// | Operation | Required action |
/// |---|---|
/// | `exists`, `has_resource`, `has_directory`, `get` | `Read` on the path |
/// | `list`, `list_resources`, `list_subdirs` | `Read` on the path, then on each child returned |
/// | `create` | `Create` on the path |
/// | `update` | `Update` on the path |
/// | `delete` | `Delete` on the path |
///
/// The decorator holds no locks of its own and never mutates the context.
#[derive(Debug, Default)]
pub struct AuthStorageTree<T> {
    tree: T,
}

impl<T: StorageTree> AuthStorageTree<T> {
    pub fn new(tree: T) -> Self {
        Self { tree }
    }

    /// The wrapped tree.
    pub fn inner(&self) -> &T {
        &self.tree
    }

    pub fn into_inner(self) -> T {
        self.tree
    }

    fn authorize(
        &self,
        context: &dyn AuthContext,
        path: &Path,
        action: Action,
    ) -> Result<(), StorageError> {
        if context.is_authorized(RESOURCE_TYPE_STORAGE, path, action) {
            Ok(())
        } else {
            tracing::debug!(path = %path, %action, "authorization denied");
            Err(StorageError::Unauthorized {
                path: path.clone(),
                action,
            })
        }
    }

    fn readable(&self, context: &dyn AuthContext, children: Vec<Path>) -> Vec<Path> {
        children
            .into_iter()
            .filter(|child| context.is_authorized(RESOURCE_TYPE_STORAGE, child, Action::Read))
            .collect()
    }

    pub fn exists(&self, context: &dyn AuthContext, path: &Path) -> Result<bool, StorageError> {
        self.authorize(context, path, Action::Read)?;
        self.tree.exists(path)
    }

    pub fn has_resource(
        &self,
        context: &dyn AuthContext,
        path: &Path,
    ) -> Result<bool, StorageError> {
        self.authorize(context, path, Action::Read)?;
        self.tree.has_resource(path)
    }

    pub fn has_directory(
        &self,
        context: &dyn AuthContext,
        path: &Path,
    ) -> Result<bool, StorageError> {
        self.authorize(context, path, Action::Read)?;
        self.tree.has_directory(path)
    }

    pub fn get(
        &self,
        context: &dyn AuthContext,
        path: &Path,
    ) -> Result<ResourceMeta, StorageError> {
        self.authorize(context, path, Action::Read)?;
        self.tree.get(path)
    }

    /// Children of `path` the caller may read.
    ///
    /// The caller must also be allowed to read `path` itself.
    pub fn list(&self, context: &dyn AuthContext, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.authorize(context, path, Action::Read)?;
        Ok(self.readable(context, self.tree.list(path)?))
    }

    pub fn list_resources(
        &self,
        context: &dyn AuthContext,
        path: &Path,
    ) -> Result<Vec<Path>, StorageError> {
        self.authorize(context, path, Action::Read)?;
        Ok(self.readable(context, self.tree.list_resources(path)?))
    }

    pub fn list_subdirs(
        &self,
        context: &dyn AuthContext,
        path: &Path,
    ) -> Result<Vec<Path>, StorageError> {
        self.authorize(context, path, Action::Read)?;
        Ok(self.readable(context, self.tree.list_subdirs(path)?))
    }

    pub fn create(
        &self,
        context: &dyn AuthContext,
        path: &Path,
        resource: ResourceMeta,
    ) -> Result<ResourceMeta, StorageError> {
        self.authorize(context, path, Action::Create)?;
        self.tree.create(path, resource)
    }

    pub fn update(
        &self,
        context: &dyn AuthContext,
        path: &Path,
        resource: ResourceMeta,
    ) -> Result<ResourceMeta, StorageError> {
        self.authorize(context, path, Action::Update)?;
        self.tree.update(path, resource)
    }

    pub fn delete(&self, context: &dyn AuthContext, path: &Path) -> Result<bool, StorageError> {
        self.authorize(context, path, Action::Delete)?;
        self.tree.delete(path)
    }
}

/// A shared [`AuthStorageTree`] bound to one caller's context.
pub struct ContextStorageTree<T, C> {
    tree: Arc<AuthStorageTree<T>>,
    context: C,
}

impl<T: StorageTree, C: AuthContext> ContextStorageTree<T, C> {
    pub fn new(tree: Arc<AuthStorageTree<T>>, context: C) -> Self {
        Self { tree, context }
    }

    /// The bound context.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// The shared decorator, for binding further contexts.
    pub fn shared(&self) -> &Arc<AuthStorageTree<T>> {
        &self.tree
    }
}

impl<T, C> fmt::Debug for ContextStorageTree<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextStorageTree").finish_non_exhaustive()
    }
}

impl<T: StorageTree, C: AuthContext> StorageTree for ContextStorageTree<T, C> {
    fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        self.tree.exists(&self.context, path)
    }

    fn has_resource(&self, path: &Path) -> Result<bool, StorageError> {
        self.tree.has_resource(&self.context, path)
    }

    fn has_directory(&self, path: &Path) -> Result<bool, StorageError> {
        self.tree.has_directory(&self.context, path)
    }

    fn get(&self, path: &Path) -> Result<ResourceMeta, StorageError> {
        self.tree.get(&self.context, path)
    }

    fn list(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.tree.list(&self.context, path)
    }

    fn list_resources(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.tree.list_resources(&self.context, path)
    }

    fn list_subdirs(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.tree.list_subdirs(&self.context, path)
    }

    fn create(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError> {
        self.tree.create(&self.context, path, resource)
    }

    fn update(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError> {
        self.tree.update(&self.context, path, resource)
    }

    fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        self.tree.delete(&self.context, path)
    }
}

/// Wrap `tree` so every operation is checked against `context`.
pub fn authorized_storage_tree<T, C>(context: C, tree: T) -> ContextStorageTree<T, C>
where
    T: StorageTree,
    C: AuthContext,
{
    ContextStorageTree::new(Arc::new(AuthStorageTree::new(tree)), context)
}
