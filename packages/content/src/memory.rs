//! In-memory content tree.

use std::collections::BTreeMap;
use std::io::Read;
use std::ops::Bound;
use std::sync::{PoisonError, RwLock};

use bytes::Bytes;

use crate::{ChildEntry, Content, ContentTree, Metadata, NodeKind, Path, StoredContent, TreeError};

#[derive(Debug, Clone)]
struct Entry {
    bytes: Bytes,
    meta: Metadata,
}

/// A content tree held entirely in memory.
///
/// Only resources are stored; directories exist implicitly while they have
/// at least one resource below them. Content is drained into a buffer before
/// the write lock is taken, so a failing stream never leaves a partial entry
/// and writers never hold the lock while waiting on caller I/O.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use storetree_content::{ContentTree, MemoryTree, NodeKind, path};
///
/// let tree = MemoryTree::new();
/// tree.create(&path!("jobs/1/log"), &BTreeMap::new(), &mut &b"hi"[..]).unwrap();
///
/// assert_eq!(tree.kind(&path!("jobs/1")).unwrap(), Some(NodeKind::Directory));
/// assert_eq!(tree.kind(&path!("jobs/1/log")).unwrap(), Some(NodeKind::Resource));
/// ```
#[derive(Debug, Default)]
pub struct MemoryTree {
    entries: RwLock<BTreeMap<Path, Entry>>,
}

impl MemoryTree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources held.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if the tree holds no resources.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn drain(content: &mut dyn Read) -> Result<Bytes, TreeError> {
        let mut buf = Vec::new();
        content.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    fn has_descendants(entries: &BTreeMap<Path, Entry>, path: &Path) -> bool {
        entries
            .range((Bound::Excluded(path.clone()), Bound::Unbounded))
            .next()
            .is_some_and(|(key, _)| path.is_ancestor_of(key))
    }

    fn kind_in(entries: &BTreeMap<Path, Entry>, path: &Path) -> Option<NodeKind> {
        if entries.contains_key(path) {
            Some(NodeKind::Resource)
        } else if path.is_root() || Self::has_descendants(entries, path) {
            Some(NodeKind::Directory)
        } else {
            None
        }
    }
}

impl ContentTree for MemoryTree {
    fn kind(&self, path: &Path) -> Result<Option<NodeKind>, TreeError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(Self::kind_in(&entries, path))
    }

    fn read(&self, path: &Path) -> Result<Option<StoredContent>, TreeError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(path).map(|entry| StoredContent {
            content: Content::bytes(entry.bytes.clone()),
            meta: entry.meta.clone(),
        }))
    }

    fn children(&self, path: &Path) -> Result<Vec<ChildEntry>, TreeError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let depth = path.len();
        let mut children: Vec<ChildEntry> = Vec::new();

        for (key, _) in entries.range((Bound::Excluded(path.clone()), Bound::Unbounded)) {
            if !path.is_ancestor_of(key) {
                break;
            }
            let child = key.slice(0, depth + 1);
            // Descendants of one child are contiguous, so only the last entry can repeat.
            if children.last().is_some_and(|last| last.path == child) {
                continue;
            }
            let kind = if key.len() == depth + 1 {
                NodeKind::Resource
            } else {
                NodeKind::Directory
            };
            children.push(ChildEntry { path: child, kind });
        }

        Ok(children)
    }

    fn create(
        &self,
        path: &Path,
        meta: &Metadata,
        content: &mut dyn Read,
    ) -> Result<u64, TreeError> {
        if path.is_root() {
            return Err(TreeError::IsADirectory { path: path.clone() });
        }
        let bytes = Self::drain(content)?;
        let len = bytes.len() as u64;

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match Self::kind_in(&entries, path) {
            Some(NodeKind::Resource) => return Err(TreeError::Exists { path: path.clone() }),
            Some(NodeKind::Directory) => {
                return Err(TreeError::IsADirectory { path: path.clone() })
            }
            None => {}
        }
        if let Some(ancestor) = path.ancestors().find(|a| entries.contains_key(a)) {
            return Err(TreeError::NotADirectory { ancestor });
        }

        entries.insert(
            path.clone(),
            Entry {
                bytes,
                meta: meta.clone(),
            },
        );
        tracing::debug!(path = %path, bytes = len, "memory tree created resource");
        Ok(len)
    }

    fn update(
        &self,
        path: &Path,
        meta: &Metadata,
        content: &mut dyn Read,
    ) -> Result<u64, TreeError> {
        let bytes = Self::drain(content)?;
        let len = bytes.len() as u64;

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .get_mut(path)
            .ok_or_else(|| TreeError::Missing { path: path.clone() })?;
        *entry = Entry {
            bytes,
            meta: meta.clone(),
        };
        tracing::debug!(path = %path, bytes = len, "memory tree updated resource");
        Ok(len)
    }

    fn delete(&self, path: &Path) -> Result<bool, TreeError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(path).is_some() {
            tracing::debug!(path = %path, "memory tree deleted resource");
            return Ok(true);
        }
        if Self::kind_in(&entries, path) == Some(NodeKind::Directory) {
            return Err(TreeError::IsADirectory { path: path.clone() });
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use std::io;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn put(tree: &MemoryTree, p: &str, data: &[u8]) {
        let mut reader = data;
        tree.create(&path!(p), &Metadata::new(), &mut reader).unwrap();
    }

    /// A reader that always fails.
    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "stream aborted"))
        }
    }

    #[test]
    fn create_then_read() {
        let tree = MemoryTree::new();
        let mut data = &b"hello"[..];
        let written = tree
            .create(&path!("a/b"), &meta(&[("k", "v")]), &mut data)
            .unwrap();
        assert_eq!(written, 5);

        let stored = tree.read(&path!("a/b")).unwrap().unwrap();
        assert_eq!(stored.content.to_bytes().unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(stored.content.known_len(), Some(5));
        assert_eq!(stored.meta.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn directories_are_implicit() {
        let tree = MemoryTree::new();
        assert_eq!(tree.kind(&Path::root()).unwrap(), Some(NodeKind::Directory));
        assert_eq!(tree.kind(&path!("a")).unwrap(), None);

        put(&tree, "a/b/c", b"x");
        assert_eq!(tree.kind(&path!("a")).unwrap(), Some(NodeKind::Directory));
        assert_eq!(tree.kind(&path!("a/b")).unwrap(), Some(NodeKind::Directory));
        assert!(tree.read(&path!("a/b")).unwrap().is_none());

        tree.delete(&path!("a/b/c")).unwrap();
        assert_eq!(tree.kind(&path!("a")).unwrap(), None);
    }

    #[test]
    fn children_are_immediate_and_sorted() {
        let tree = MemoryTree::new();
        put(&tree, "a/z", b"1");
        put(&tree, "a/b/deep/x", b"2");
        put(&tree, "a/b/y", b"3");
        put(&tree, "a/bc", b"4");
        put(&tree, "other", b"5");

        let children = tree.children(&path!("a")).unwrap();
        assert_eq!(
            children,
            vec![
                ChildEntry {
                    path: path!("a/b"),
                    kind: NodeKind::Directory
                },
                ChildEntry {
                    path: path!("a/bc"),
                    kind: NodeKind::Resource
                },
                ChildEntry {
                    path: path!("a/z"),
                    kind: NodeKind::Resource
                },
            ]
        );

        assert!(tree.children(&path!("missing")).unwrap().is_empty());
        assert!(tree.children(&path!("a/z")).unwrap().is_empty());
        assert_eq!(tree.children(&Path::root()).unwrap().len(), 2);
    }

    #[test]
    fn create_conflicts() {
        let tree = MemoryTree::new();
        put(&tree, "a/b", b"1");

        let mut data = &b"2"[..];
        assert!(matches!(
            tree.create(&path!("a/b"), &Metadata::new(), &mut data),
            Err(TreeError::Exists { .. })
        ));

        let mut data = &b"2"[..];
        assert!(matches!(
            tree.create(&path!("a/b/c"), &Metadata::new(), &mut data),
            Err(TreeError::NotADirectory { ancestor }) if ancestor == path!("a/b")
        ));

        let mut data = &b"2"[..];
        assert!(matches!(
            tree.create(&path!("a"), &Metadata::new(), &mut data),
            Err(TreeError::IsADirectory { .. })
        ));

        let mut data = &b"2"[..];
        assert!(matches!(
            tree.create(&Path::root(), &Metadata::new(), &mut data),
            Err(TreeError::IsADirectory { .. })
        ));
    }

    #[test]
    fn update_requires_existing_resource() {
        let tree = MemoryTree::new();
        let mut data = &b"new"[..];
        assert!(matches!(
            tree.update(&path!("a"), &Metadata::new(), &mut data),
            Err(TreeError::Missing { .. })
        ));

        put(&tree, "a", b"old");
        let mut data = &b"newer"[..];
        assert_eq!(tree.update(&path!("a"), &Metadata::new(), &mut data).unwrap(), 5);
        let stored = tree.read(&path!("a")).unwrap().unwrap();
        assert_eq!(stored.content.to_bytes().unwrap(), Bytes::from_static(b"newer"));
    }

    #[test]
    fn failed_stream_leaves_nothing_behind() {
        let tree = MemoryTree::new();
        assert!(matches!(
            tree.create(&path!("a"), &Metadata::new(), &mut Broken),
            Err(TreeError::Io(_))
        ));
        assert_eq!(tree.kind(&path!("a")).unwrap(), None);

        put(&tree, "b", b"keep");
        assert!(tree.update(&path!("b"), &Metadata::new(), &mut Broken).is_err());
        let stored = tree.read(&path!("b")).unwrap().unwrap();
        assert_eq!(stored.content.to_bytes().unwrap(), Bytes::from_static(b"keep"));
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let tree = MemoryTree::new();
        assert!(!tree.delete(&path!("nothing/here")).unwrap());

        put(&tree, "a/b", b"1");
        assert!(matches!(
            tree.delete(&path!("a")),
            Err(TreeError::IsADirectory { .. })
        ));
        assert!(tree.delete(&path!("a/b")).unwrap());
        assert!(!tree.delete(&path!("a/b")).unwrap());
        assert!(tree.is_empty());
    }

    #[test]
    fn concurrent_creates_have_one_winner() {
        let tree = MemoryTree::new();
        let results: Vec<Result<u64, TreeError>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let tree = &tree;
                    s.spawn(move || {
                        let data = vec![i as u8; 16];
                        tree.create(&path!("race"), &Metadata::new(), &mut data.as_slice())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, TreeError::Exists { .. })));
        assert_eq!(tree.len(), 1);
    }
}
