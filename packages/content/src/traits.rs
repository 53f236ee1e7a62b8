//! The raw content tree interface.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use crate::{Content, Path, TreeError};

/// String-keyed metadata stored alongside content.
pub type Metadata = BTreeMap<String, String>;

/// What lives at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Holds children only.
    Directory,
    /// Holds content and metadata.
    Resource,
}

/// A child entry returned by [`ContentTree::children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub path: Path,
    pub kind: NodeKind,
}

/// A resource as a backend stores it.
#[derive(Debug, Clone)]
pub struct StoredContent {
    /// The content, re-readable, with its byte count recorded.
    pub content: Content,
    /// Metadata exactly as it was written.
    pub meta: Metadata,
}

/// A hierarchical tree of raw content.
///
/// This is the persistence seam: a backend stores bytes plus an opaque
/// metadata map at leaf paths. It knows nothing about content types,
/// timestamps, or authorization.
///
/// Implementations must be safe to share between threads. Each call is
/// atomic on its own: a `create` or `update` whose content stream fails
/// partway leaves the previous state of the path untouched, and of several
/// concurrent `create` calls at one path exactly one succeeds.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn ContentTree>`.
pub trait ContentTree: Send + Sync {
    /// What exists at `path`, if anything. The root is always a directory.
    fn kind(&self, path: &Path) -> Result<Option<NodeKind>, TreeError>;

    /// Read the resource at `path`.
    ///
    /// Returns `Ok(None)` when nothing, or only a directory, exists there.
    fn read(&self, path: &Path) -> Result<Option<StoredContent>, TreeError>;

    /// Immediate children of `path` in lexical order.
    ///
    /// Missing paths and resources have no children.
    fn children(&self, path: &Path) -> Result<Vec<ChildEntry>, TreeError>;

    /// Store a new resource, returning the number of content bytes written.
    ///
    /// # Errors
    ///
    /// - [`TreeError::Exists`] if a resource is already at `path`
    /// - [`TreeError::IsADirectory`] if `path` is the root or a directory
    /// - [`TreeError::NotADirectory`] if an ancestor of `path` is a resource
    fn create(&self, path: &Path, meta: &Metadata, content: &mut dyn Read)
        -> Result<u64, TreeError>;

    /// Replace an existing resource, returning the number of content bytes written.
    ///
    /// # Errors
    ///
    /// - [`TreeError::Missing`] if no resource is at `path`
    fn update(&self, path: &Path, meta: &Metadata, content: &mut dyn Read)
        -> Result<u64, TreeError>;

    /// Remove the resource at `path`. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// - [`TreeError::IsADirectory`] if `path` is a directory
    fn delete(&self, path: &Path) -> Result<bool, TreeError>;
}

// Blanket implementations for references and smart pointers

impl<T: ContentTree + ?Sized> ContentTree for &T {
    fn kind(&self, path: &Path) -> Result<Option<NodeKind>, TreeError> {
        (**self).kind(path)
    }

    fn read(&self, path: &Path) -> Result<Option<StoredContent>, TreeError> {
        (**self).read(path)
    }

    fn children(&self, path: &Path) -> Result<Vec<ChildEntry>, TreeError> {
        (**self).children(path)
    }

    fn create(
        &self,
        path: &Path,
        meta: &Metadata,
        content: &mut dyn Read,
    ) -> Result<u64, TreeError> {
        (**self).create(path, meta, content)
    }

    fn update(
        &self,
        path: &Path,
        meta: &Metadata,
        content: &mut dyn Read,
    ) -> Result<u64, TreeError> {
        (**self).update(path, meta, content)
    }

    fn delete(&self, path: &Path) -> Result<bool, TreeError> {
        (**self).delete(path)
    }
}

impl<T: ContentTree + ?Sized> ContentTree for Box<T> {
    fn kind(&self, path: &Path) -> Result<Option<NodeKind>, TreeError> {
        self.as_ref().kind(path)
    }

    fn read(&self, path: &Path) -> Result<Option<StoredContent>, TreeError> {
        self.as_ref().read(path)
    }

    fn children(&self, path: &Path) -> Result<Vec<ChildEntry>, TreeError> {
        self.as_ref().children(path)
    }

    fn create(
        &self,
        path: &Path,
        meta: &Metadata,
        content: &mut dyn Read,
    ) -> Result<u64, TreeError> {
        self.as_ref().create(path, meta, content)
    }

    fn update(
        &self,
        path: &Path,
        meta: &Metadata,
        content: &mut dyn Read,
    ) -> Result<u64, TreeError> {
        self.as_ref().update(path, meta, content)
    }

    fn delete(&self, path: &Path) -> Result<bool, TreeError> {
        self.as_ref().delete(path)
    }
}

impl<T: ContentTree + ?Sized> ContentTree for Arc<T> {
    fn kind(&self, path: &Path) -> Result<Option<NodeKind>, TreeError> {
        self.as_ref().kind(path)
    }

    fn read(&self, path: &Path) -> Result<Option<StoredContent>, TreeError> {
        self.as_ref().read(path)
    }

    fn children(&self, path: &Path) -> Result<Vec<ChildEntry>, TreeError> {
        self.as_ref().children(path)
    }

    fn create(
        &self,
        path: &Path,
        meta: &Metadata,
        content: &mut dyn Read,
    ) -> Result<u64, TreeError> {
        self.as_ref().create(path, meta, content)
    }

    fn update(
        &self,
        path: &Path,
        meta: &Metadata,
        content: &mut dyn Read,
    ) -> Result<u64, TreeError> {
        self.as_ref().update(path, meta, content)
    }

    fn delete(&self, path: &Path) -> Result<bool, TreeError> {
        self.as_ref().delete(path)
    }
}
