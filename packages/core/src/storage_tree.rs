//! The resource-aware storage tree contract and its facade over content trees.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use storetree_content::{ContentTree, Metadata, NodeKind, Path};

use crate::meta::{ResourceMeta, RES_META_CONTENT_LENGTH};
use crate::StorageError;

/// Hierarchical resource operations.
///
/// Paths name either a directory (children only) or a resource (content
/// only). Every method takes `&self`, and implementations are shared between
/// threads; each call is independently atomic, with no transactions across
/// paths.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn StorageTree>`.
pub trait StorageTree: Send + Sync {
    /// True if `path` is a directory or a resource.
    fn exists(&self, path: &Path) -> Result<bool, StorageError>;

    /// True if `path` is a resource.
    fn has_resource(&self, path: &Path) -> Result<bool, StorageError>;

    /// True if `path` is a directory.
    fn has_directory(&self, path: &Path) -> Result<bool, StorageError>;

    /// The resource at `path`.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if no resource exists there.
    fn get(&self, path: &Path) -> Result<ResourceMeta, StorageError>;

    /// Immediate children of `path` in lexical order.
    ///
    /// Missing or childless paths yield an empty list rather than an error;
    /// use [`StorageTree::exists`] to tell them apart.
    fn list(&self, path: &Path) -> Result<Vec<Path>, StorageError>;

    /// The children of `path` that are resources.
    fn list_resources(&self, path: &Path) -> Result<Vec<Path>, StorageError>;

    /// The children of `path` that are directories.
    fn list_subdirs(&self, path: &Path) -> Result<Vec<Path>, StorageError>;

    /// Store a new resource at `path` and return it as stored.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Conflict`] if a resource already exists there
    /// - [`StorageError::InvalidPath`] if an ancestor is a resource, or
    ///   `path` is the root or a directory
    fn create(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError>;

    /// Replace the resource at `path` and return it as stored.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if no resource exists there.
    fn update(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError>;

    /// Remove the resource at `path`. Returns `false` if there was none.
    fn delete(&self, path: &Path) -> Result<bool, StorageError>;
}

/// Facade adapting a raw [`ContentTree`] into a [`StorageTree`].
///
/// On write, metadata is recomputed rather than trusted: the creation time
/// comes from the incoming resource on create and from the stored resource
/// on update, the modification time is the write instant, and the content
/// length is whatever the backend actually stored. Content is streamed from
/// the resource straight into the backend.
///
/// # Example
///
/// ```rust
/// use storetree_content::{MemoryTree, path};
/// use storetree_core::{ResourceMeta, StorageTree, StorageTreeImpl};
///
/// let tree = StorageTreeImpl::new(MemoryTree::new());
/// let resource = ResourceMeta::builder().bytes("hello").build().unwrap();
/// tree.create(&path!("greetings/en"), resource).unwrap();
///
/// assert!(tree.has_directory(&path!("greetings")).unwrap());
/// assert_eq!(tree.get(&path!("greetings/en")).unwrap().content_length(), 5);
/// ```
#[derive(Debug, Default)]
pub struct StorageTreeImpl<T> {
    tree: T,
}

impl<T: ContentTree> StorageTreeImpl<T> {
    /// Wrap a content tree.
    pub fn new(tree: T) -> Self {
        Self { tree }
    }

    /// The wrapped content tree.
    pub fn inner(&self) -> &T {
        &self.tree
    }

    fn kind(&self, path: &Path) -> Result<Option<NodeKind>, StorageError> {
        self.tree
            .kind(path)
            .map_err(|e| StorageError::from_tree(path, e))
    }

    fn children_of_kind(
        &self,
        path: &Path,
        kind: Option<NodeKind>,
    ) -> Result<Vec<Path>, StorageError> {
        let children = self
            .tree
            .children(path)
            .map_err(|e| StorageError::from_tree(path, e))?;
        Ok(children
            .into_iter()
            .filter(|child| kind.is_none_or(|k| child.kind == k))
            .map(|child| child.path)
            .collect())
    }

    /// Metadata as handed to the backend: everything but the size, which the
    /// backend reports from the bytes it actually stored.
    fn stored_meta(resource: &ResourceMeta) -> Metadata {
        let mut meta = resource.metadata();
        meta.remove(RES_META_CONTENT_LENGTH);
        meta
    }

    fn write(
        &self,
        path: &Path,
        resource: ResourceMeta,
        creation_time: DateTime<Utc>,
        is_create: bool,
    ) -> Result<ResourceMeta, StorageError> {
        let stamped = ResourceMeta {
            creation_time,
            modification_time: Utc::now().trunc_subsecs(0),
            ..resource
        };
        let meta = Self::stored_meta(&stamped);
        let mut reader = stamped.open(path)?;

        let result = if is_create {
            self.tree.create(path, &meta, &mut reader)
        } else {
            self.tree.update(path, &meta, &mut reader)
        };
        let written = result.map_err(|e| StorageError::from_tree(path, e))?;
        tracing::debug!(path = %path, bytes = written, create = is_create, "stored resource");

        // A concurrent delete can remove the resource before it is re-read.
        match self.tree.read(path) {
            Ok(Some(stored)) => return Ok(ResourceMeta::with_content(stored.content, &stored.meta)),
            Ok(None) => {}
            Err(e) => tracing::debug!(path = %path, error = %e, "re-read after write failed"),
        }
        Ok(ResourceMeta {
            content_length: written,
            ..stamped
        })
    }
}

impl<T: ContentTree> StorageTree for StorageTreeImpl<T> {
    fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        Ok(self.kind(path)?.is_some())
    }

    fn has_resource(&self, path: &Path) -> Result<bool, StorageError> {
        Ok(self.kind(path)? == Some(NodeKind::Resource))
    }

    fn has_directory(&self, path: &Path) -> Result<bool, StorageError> {
        Ok(self.kind(path)? == Some(NodeKind::Directory))
    }

    fn get(&self, path: &Path) -> Result<ResourceMeta, StorageError> {
        let stored = self
            .tree
            .read(path)
            .map_err(|e| StorageError::from_tree(path, e))?
            .ok_or_else(|| StorageError::NotFound { path: path.clone() })?;
        Ok(ResourceMeta::with_content(stored.content, &stored.meta))
    }

    fn list(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.children_of_kind(path, None)
    }

    fn list_resources(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.children_of_kind(path, Some(NodeKind::Resource))
    }

    fn list_subdirs(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.children_of_kind(path, Some(NodeKind::Directory))
    }

    fn create(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError> {
        if path.is_root() {
            return Err(StorageError::InvalidPath {
                path: path.clone(),
                message: "cannot store a resource at the root".to_string(),
            });
        }
        let creation_time = resource.creation_time();
        self.write(path, resource, creation_time, true)
    }

    fn update(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError> {
        let existing = match self.tree.read(path) {
            Ok(Some(stored)) => ResourceMeta::with_content(stored.content, &stored.meta),
            Ok(None) => return Err(StorageError::NotFound { path: path.clone() }),
            Err(e) => return Err(StorageError::from_tree(path, e)),
        };
        self.write(path, resource, existing.creation_time(), false)
    }

    fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        let removed = self
            .tree
            .delete(path)
            .map_err(|e| StorageError::from_tree(path, e))?;
        if removed {
            tracing::debug!(path = %path, "deleted resource");
        }
        Ok(removed)
    }
}

/// Coerce a content tree into a [`StorageTree`].
pub fn as_storage_tree<T: ContentTree>(tree: T) -> StorageTreeImpl<T> {
    StorageTreeImpl::new(tree)
}

// Blanket implementations for references and smart pointers

impl<T: StorageTree + ?Sized> StorageTree for &T {
    fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        (**self).exists(path)
    }

    fn has_resource(&self, path: &Path) -> Result<bool, StorageError> {
        (**self).has_resource(path)
    }

    fn has_directory(&self, path: &Path) -> Result<bool, StorageError> {
        (**self).has_directory(path)
    }

    fn get(&self, path: &Path) -> Result<ResourceMeta, StorageError> {
        (**self).get(path)
    }

    fn list(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        (**self).list(path)
    }

    fn list_resources(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        (**self).list_resources(path)
    }

    fn list_subdirs(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        (**self).list_subdirs(path)
    }

    fn create(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError> {
        (**self).create(path, resource)
    }

    fn update(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError> {
        (**self).update(path, resource)
    }

    fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        (**self).delete(path)
    }
}

impl<T: StorageTree + ?Sized> StorageTree for Box<T> {
    fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        self.as_ref().exists(path)
    }

    fn has_resource(&self, path: &Path) -> Result<bool, StorageError> {
        self.as_ref().has_resource(path)
    }

    fn has_directory(&self, path: &Path) -> Result<bool, StorageError> {
        self.as_ref().has_directory(path)
    }

    fn get(&self, path: &Path) -> Result<ResourceMeta, StorageError> {
        self.as_ref().get(path)
    }

    fn list(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.as_ref().list(path)
    }

    fn list_resources(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.as_ref().list_resources(path)
    }

    fn list_subdirs(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.as_ref().list_subdirs(path)
    }

    fn create(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError> {
        self.as_ref().create(path, resource)
    }

    fn update(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError> {
        self.as_ref().update(path, resource)
    }

    fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        self.as_ref().delete(path)
    }
}

impl<T: StorageTree + ?Sized> StorageTree for Arc<T> {
    fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        self.as_ref().exists(path)
    }

    fn has_resource(&self, path: &Path) -> Result<bool, StorageError> {
        self.as_ref().has_resource(path)
    }

    fn has_directory(&self, path: &Path) -> Result<bool, StorageError> {
        self.as_ref().has_directory(path)
    }

    fn get(&self, path: &Path) -> Result<ResourceMeta, StorageError> {
        self.as_ref().get(path)
    }

    fn list(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.as_ref().list(path)
    }

    fn list_resources(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.as_ref().list_resources(path)
    }

    fn list_subdirs(&self, path: &Path) -> Result<Vec<Path>, StorageError> {
        self.as_ref().list_subdirs(path)
    }

    fn create(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError> {
        self.as_ref().create(path, resource)
    }

    fn update(&self, path: &Path, resource: ResourceMeta) -> Result<ResourceMeta, StorageError> {
        self.as_ref().update(path, resource)
    }

    fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        self.as_ref().delete(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date;
    use chrono::TimeZone;
    use std::io::Cursor;
    use storetree_content::{path, ChildEntry, MemoryTree, StoredContent, TreeError};

    fn tree() -> StorageTreeImpl<MemoryTree> {
        StorageTreeImpl::new(MemoryTree::new())
    }

    fn text(body: &str) -> ResourceMeta {
        ResourceMeta::builder()
            .content_type("text/plain")
            .bytes(body.to_string())
            .build()
            .unwrap()
    }

    fn read_all(resource: &ResourceMeta) -> Vec<u8> {
        let mut out = Vec::new();
        resource.write_content(&Path::root(), &mut out).unwrap();
        out
    }

    #[test]
    fn create_then_get() {
        let tree = tree();
        let created = tree.create(&path!("jobs/123/log"), text("0123456789")).unwrap();
        assert_eq!(created.content_length(), 10);
        assert_eq!(created.content_type(), Some("text/plain"));

        let fetched = tree.get(&path!("jobs/123/log")).unwrap();
        assert_eq!(fetched.content_length(), 10);
        assert_eq!(fetched.content_type(), Some("text/plain"));
        assert_eq!(fetched.creation_time(), created.creation_time());
        assert_eq!(read_all(&fetched), b"0123456789");
        assert!(fetched.is_rereadable());
    }

    #[test]
    fn exists_and_kinds() {
        let tree = tree();
        tree.create(&path!("a/b/c"), text("x")).unwrap();

        assert!(tree.exists(&Path::root()).unwrap());
        assert!(tree.exists(&path!("a/b")).unwrap());
        assert!(tree.has_directory(&path!("a/b")).unwrap());
        assert!(!tree.has_resource(&path!("a/b")).unwrap());
        assert!(tree.has_resource(&path!("a/b/c")).unwrap());
        assert!(!tree.exists(&path!("a/x")).unwrap());
    }

    #[test]
    fn get_directory_or_missing_is_not_found() {
        let tree = tree();
        tree.create(&path!("a/b"), text("x")).unwrap();
        assert!(matches!(
            tree.get(&path!("a")),
            Err(StorageError::NotFound { .. })
        ));
        assert!(matches!(
            tree.get(&path!("nope")),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn create_conflicts() {
        let tree = tree();
        tree.create(&path!("a/b"), text("x")).unwrap();

        assert!(matches!(
            tree.create(&path!("a/b"), text("y")),
            Err(StorageError::Conflict { .. })
        ));
        assert!(matches!(
            tree.create(&path!("a/b/c"), text("y")),
            Err(StorageError::InvalidPath { .. })
        ));
        assert!(matches!(
            tree.create(&path!("a"), text("y")),
            Err(StorageError::InvalidPath { .. })
        ));
        assert!(matches!(
            tree.create(&Path::root(), text("y")),
            Err(StorageError::InvalidPath { .. })
        ));
        assert_eq!(read_all(&tree.get(&path!("a/b")).unwrap()), b"x");
    }

    #[test]
    fn stored_length_comes_from_written_bytes() {
        let tree = tree();
        let resource = ResourceMeta::builder()
            .content_length(999)
            .stream(Cursor::new(b"four".to_vec()))
            .build()
            .unwrap();
        assert_eq!(resource.content_length(), 999);

        let stored = tree.create(&path!("s"), resource).unwrap();
        assert_eq!(stored.content_length(), 4);
    }

    #[test]
    fn update_keeps_creation_time() {
        let tree = tree();
        let created_at = Utc.timestamp_opt(1_500_000_000, 0).unwrap();
        let original = ResourceMeta::builder()
            .creation_time(created_at)
            .meta("owner", "a")
            .bytes("v1")
            .build()
            .unwrap();
        let stored = tree.create(&path!("doc"), original).unwrap();
        assert_eq!(stored.creation_time(), created_at);
        assert!(stored.modification_time() > created_at);

        let replacement = ResourceMeta::builder()
            .creation_time(Utc.timestamp_opt(0, 0).unwrap())
            .meta("owner", "b")
            .bytes("version two")
            .build()
            .unwrap();
        let updated = tree.update(&path!("doc"), replacement).unwrap();

        assert_eq!(updated.creation_time(), created_at);
        assert_eq!(updated.content_length(), 11);
        assert_eq!(updated.extra_meta()["owner"], "b");
        assert_eq!(read_all(&updated), b"version two");
        assert_eq!(
            tree.get(&path!("doc")).unwrap().metadata()[crate::RES_META_CREATION_TIME],
            date::format_date(&created_at)
        );
    }

    #[test]
    fn update_requires_existing_resource() {
        let tree = tree();
        assert!(matches!(
            tree.update(&path!("missing"), text("x")),
            Err(StorageError::NotFound { .. })
        ));

        tree.create(&path!("dir/leaf"), text("x")).unwrap();
        assert!(matches!(
            tree.update(&path!("dir"), text("x")),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn listing() {
        let tree = tree();
        for p in ["d/b", "d/a", "d/sub/x", "d/c/y"] {
            tree.create(&Path::parse(p).unwrap(), text(p)).unwrap();
        }

        assert_eq!(
            tree.list(&path!("d")).unwrap(),
            vec![path!("d/a"), path!("d/b"), path!("d/c"), path!("d/sub")]
        );
        assert_eq!(
            tree.list_resources(&path!("d")).unwrap(),
            vec![path!("d/a"), path!("d/b")]
        );
        assert_eq!(
            tree.list_subdirs(&path!("d")).unwrap(),
            vec![path!("d/c"), path!("d/sub")]
        );
        assert!(tree.list(&path!("d/a")).unwrap().is_empty());
        assert!(tree.list(&path!("nowhere")).unwrap().is_empty());
    }

    #[test]
    fn delete_reports_presence() {
        let tree = tree();
        tree.create(&path!("a/b"), text("x")).unwrap();

        assert!(!tree.delete(&path!("a/c")).unwrap());
        assert!(tree.delete(&path!("a/b")).unwrap());
        assert!(!tree.delete(&path!("a/b")).unwrap());
        assert!(!tree.exists(&path!("a")).unwrap());
    }

    #[test]
    fn consumed_stream_cannot_be_stored() {
        let tree = tree();
        let resource = ResourceMeta::builder()
            .stream(Cursor::new(b"once".to_vec()))
            .build()
            .unwrap();
        let mut sink = Vec::new();
        resource.write_content(&path!("a"), &mut sink).unwrap();

        assert!(matches!(
            tree.create(&path!("a"), resource),
            Err(StorageError::Io { .. })
        ));
        assert!(!tree.exists(&path!("a")).unwrap());
    }

    /// Loses every resource as soon as it is written.
    struct Vanishing(MemoryTree);

    impl ContentTree for Vanishing {
        fn kind(&self, path: &Path) -> Result<Option<NodeKind>, TreeError> {
            self.0.kind(path)
        }

        fn read(&self, _path: &Path) -> Result<Option<StoredContent>, TreeError> {
            Ok(None)
        }

        fn children(&self, path: &Path) -> Result<Vec<ChildEntry>, TreeError> {
            self.0.children(path)
        }

        fn create(
            &self,
            path: &Path,
            meta: &Metadata,
            content: &mut dyn std::io::Read,
        ) -> Result<u64, TreeError> {
            let written = self.0.create(path, meta, content)?;
            self.0.delete(path)?;
            Ok(written)
        }

        fn update(
            &self,
            path: &Path,
            meta: &Metadata,
            content: &mut dyn std::io::Read,
        ) -> Result<u64, TreeError> {
            self.0.update(path, meta, content)
        }

        fn delete(&self, path: &Path) -> Result<bool, TreeError> {
            self.0.delete(path)
        }
    }

    #[test]
    fn create_succeeds_when_resource_vanishes_after_write() {
        let tree = StorageTreeImpl::new(Vanishing(MemoryTree::new()));
        let created_at = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        let resource = ResourceMeta::builder()
            .creation_time(created_at)
            .content_type("text/plain")
            .content_length(999)
            .stream(Cursor::new(b"seven b".to_vec()))
            .build()
            .unwrap();

        let created = tree.create(&path!("gone/soon"), resource).unwrap();
        assert_eq!(created.content_length(), 7);
        assert_eq!(created.creation_time(), created_at);
        assert_eq!(created.content_type(), Some("text/plain"));
        assert!(created.modification_time() > created_at);
        assert!(!tree.exists(&path!("gone/soon")).unwrap());
    }

    #[test]
    fn boxed_trait_object() {
        let tree: Box<dyn StorageTree> = Box::new(tree());
        tree.create(&path!("x"), text("x")).unwrap();
        assert!(tree.has_resource(&path!("x")).unwrap());

        let shared: Arc<dyn StorageTree> = Arc::from(tree);
        assert!(shared.exists(&path!("x")).unwrap());
    }
}
