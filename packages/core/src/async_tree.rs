//! Async storage tree interface.
//!
//! Enable the `async` feature to use it:
//!
//! ```toml
//! [dependencies]
//! storetree-core = { version = "0.1", features = ["async"] }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use storetree_content::Path;

use crate::meta::ResourceMeta;
use crate::storage_tree::StorageTree;
use crate::StorageError;

/// Async version of [`StorageTree`].
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn AsyncStorageTree>`.
///
/// # Example
///
/// ```rust,ignore
/// use storetree_core::{AsyncStorageTree, ResourceMeta, StorageError, path};
///
/// async fn fetch_log(tree: &dyn AsyncStorageTree) -> Result<ResourceMeta, StorageError> {
///     tree.get_async(&path!("jobs/123/log")).await
/// }
/// ```
#[async_trait]
pub trait AsyncStorageTree: Send + Sync {
    async fn exists_async(&self, path: &Path) -> Result<bool, StorageError>;

    async fn get_async(&self, path: &Path) -> Result<ResourceMeta, StorageError>;

    async fn list_async(&self, path: &Path) -> Result<Vec<Path>, StorageError>;

    async fn create_async(
        &self,
        path: &Path,
        resource: ResourceMeta,
    ) -> Result<ResourceMeta, StorageError>;

    async fn update_async(
        &self,
        path: &Path,
        resource: ResourceMeta,
    ) -> Result<ResourceMeta, StorageError>;

    async fn delete_async(&self, path: &Path) -> Result<bool, StorageError>;
}

#[async_trait]
impl<T: AsyncStorageTree + ?Sized> AsyncStorageTree for Box<T> {
    async fn exists_async(&self, path: &Path) -> Result<bool, StorageError> {
        self.as_ref().exists_async(path).await
    }

    async fn get_async(&self, path: &Path) -> Result<ResourceMeta, StorageError> {
        self.as_ref().get_async(path).await
    }

    async fn list_async(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.as_ref().list_async(path).await
    }

    async fn create_async(
        &self,
        path: &Path,
        resource: ResourceMeta,
    ) -> Result<ResourceMeta, StorageError> {
        self.as_ref().create_async(path, resource).await
    }

    async fn update_async(
        &self,
        path: &Path,
        resource: ResourceMeta,
    ) -> Result<ResourceMeta, StorageError> {
        self.as_ref().update_async(path, resource).await
    }

    async fn delete_async(&self, path: &Path) -> Result<bool, StorageError> {
        self.as_ref().delete_async(path).await
    }
}

/// Adapter running a sync tree on tokio's blocking pool.
///
/// Trees are already `Sync`, so the adapter only shares the tree through an
/// `Arc`; no lock is added and calls proceed in parallel.
///
/// # Example
///
/// ```rust,ignore
/// use storetree_content::MemoryTree;
/// use storetree_core::{StorageTreeImpl, SyncToAsync};
///
/// let tree = SyncToAsync::new(StorageTreeImpl::new(MemoryTree::new()));
/// ```
pub struct SyncToAsync<T> {
    inner: Arc<T>,
}

impl<T> SyncToAsync<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Wrap a tree that is already shared.
    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }

    /// The wrapped tree, for synchronous use.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T> Clone for SyncToAsync<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: StorageTree + 'static> SyncToAsync<T> {
    async fn run<R, F>(&self, path: &Path, op: F) -> Result<R, StorageError>
    where
        R: Send + 'static,
        F: FnOnce(&T, &Path) -> Result<R, StorageError> + Send + 'static,
    {
        let tree = Arc::clone(&self.inner);
        let owned = path.clone();
        tokio::task::spawn_blocking(move || op(&tree, &owned))
            .await
            .map_err(|e| StorageError::Io {
                path: path.clone(),
                message: format!("blocking task failed: {}", e),
            })?
    }
}

#[async_trait]
impl<T: StorageTree + 'static> AsyncStorageTree for SyncToAsync<T> {
    async fn exists_async(&self, path: &Path) -> Result<bool, StorageError> {
        self.run(path, |tree, path| tree.exists(path)).await
    }

    async fn get_async(&self, path: &Path) -> Result<ResourceMeta, StorageError> {
        self.run(path, |tree, path| tree.get(path)).await
    }

    async fn list_async(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.run(path, |tree, path| tree.list(path)).await
    }

    async fn create_async(
        &self,
        path: &Path,
        resource: ResourceMeta,
    ) -> Result<ResourceMeta, StorageError> {
        self.run(path, move |tree, path| tree.create(path, resource))
            .await
    }

    async fn update_async(
        &self,
        path: &Path,
        resource: ResourceMeta,
    ) -> Result<ResourceMeta, StorageError> {
        self.run(path, move |tree, path| tree.update(path, resource))
            .await
    }

    async fn delete_async(&self, path: &Path) -> Result<bool, StorageError> {
        self.run(path, |tree, path| tree.delete(path)).await
    }
}
