//! Content tree on the local filesystem.
//!
//! Each resource is one file under `<root>/data`. The file starts with a
//! single line holding the metadata as a JSON object, followed by the raw
//! content bytes. Keeping both in one file lets a single rename publish a
//! resource, so readers see the old version or the new one and never a mix.
//!
//! Writes stream into a temporary file under `<root>/staging` (same
//! filesystem) and are then renamed into place. A stream that fails partway
//! drops the temporary file and leaves the target untouched.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Component, PathBuf};

use tempfile::NamedTempFile;

use crate::{
    ChildEntry, Content, ContentReader, ContentTree, Metadata, NodeKind, Path, PathError,
    StoredContent, TreeError,
};

const DATA_DIR: &str = "data";
const STAGING_DIR: &str = "staging";

/// Append one tree segment to a filesystem path.
///
/// Only plain names are accepted, so no segment can climb out of the data
/// directory or replace it with an absolute path.
fn push_segment(file_path: &mut PathBuf, segment: &str, position: usize) -> Result<(), TreeError> {
    let mut parts = std::path::Path::new(segment).components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(name)), None) if name == segment => {
            file_path.push(name);
            Ok(())
        }
        _ => Err(PathError::InvalidComponent {
            component: segment.to_string(),
            position,
            message: "not a plain file name".to_string(),
        }
        .into()),
    }
}

/// A content tree rooted at a local directory.
#[derive(Debug)]
pub struct LocalTree {
    data: PathBuf,
    staging: PathBuf,
}

impl LocalTree {
    /// Open (or initialize) a tree under `root`.
    ///
    /// The root directory is created if missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, TreeError> {
        let root = root.into();
        let data = root.join(DATA_DIR);
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&data)?;
        fs::create_dir_all(&staging)?;

        tracing::debug!(root = %root.display(), "opened local tree");
        Ok(Self { data, staging })
    }

    fn file_path(&self, path: &Path) -> Result<PathBuf, TreeError> {
        let mut file_path = self.data.clone();
        for (position, segment) in path.iter().enumerate() {
            push_segment(&mut file_path, segment, position)?;
        }
        Ok(file_path)
    }

    fn stat(&self, path: &Path) -> Result<Option<fs::Metadata>, TreeError> {
        match fs::metadata(self.file_path(path)?) {
            Ok(attr) => Ok(Some(attr)),
            Err(e)
                if e.kind() == io::ErrorKind::NotFound
                    || e.kind() == io::ErrorKind::NotADirectory =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn check_ancestors(&self, path: &Path) -> Result<(), TreeError> {
        for ancestor in path.ancestors() {
            match self.stat(&ancestor)? {
                Some(attr) if attr.is_file() => {
                    return Err(TreeError::NotADirectory { ancestor });
                }
                Some(_) => {}
                // Nothing deeper can exist either.
                None => return Ok(()),
            }
        }
        Ok(())
    }

    /// Stream metadata and content into a staged file.
    fn stage(
        &self,
        meta: &Metadata,
        content: &mut dyn Read,
    ) -> Result<(NamedTempFile, u64), TreeError> {
        let mut staged = NamedTempFile::new_in(&self.staging)?;
        serde_json::to_writer(&mut staged, meta).map_err(io::Error::from)?;
        staged.write_all(b"\n")?;
        let len = io::copy(content, &mut staged)?;
        staged.as_file().sync_all()?;
        Ok((staged, len))
    }

    /// Read the metadata line, leaving the reader at the first content byte.
    fn read_header(
        path: &Path,
        reader: &mut BufReader<File>,
    ) -> Result<(Metadata, u64), TreeError> {
        let mut line = Vec::new();
        let header_len = reader.read_until(b'\n', &mut line)? as u64;
        let meta = serde_json::from_slice(&line).map_err(|e| TreeError::Corrupt {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok((meta, header_len))
    }

    /// Create the directories above `target`.
    ///
    /// An ancestor that turned into a resource since it was checked is
    /// reported as [`TreeError::NotADirectory`].
    fn make_parent_dirs(&self, path: &Path, target: &std::path::Path) -> Result<(), TreeError> {
        let Some(parent) = target.parent() else {
            return Ok(());
        };
        match fs::create_dir_all(parent) {
            Ok(()) => Ok(()),
            Err(e)
                if e.kind() == io::ErrorKind::NotADirectory
                    || e.kind() == io::ErrorKind::AlreadyExists =>
            {
                self.check_ancestors(path)?;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove now-empty directories between `path` and the data root.
    fn prune(&self, path: &Path) {
        let mut dir = path.parent();
        while let Some(current) = dir {
            let Ok(dir_path) = self.file_path(&current) else {
                break;
            };
            if current.is_root() || fs::remove_dir(dir_path).is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

impl ContentTree for LocalTree {
    fn kind(&self, path: &Path) -> Result<Option<NodeKind>, TreeError> {
        Ok(self.stat(path)?.map(|attr| {
            if attr.is_dir() {
                NodeKind::Directory
            } else {
                NodeKind::Resource
            }
        }))
    }

    fn read(&self, path: &Path) -> Result<Option<StoredContent>, TreeError> {
        match self.stat(path)? {
            Some(attr) if attr.is_file() => {}
            _ => return Ok(None),
        }

        let file_path = self.file_path(path)?;
        let file = match File::open(&file_path) {
            Ok(file) => file,
            // Deleted between stat and open.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let total = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let (meta, header_len) = Self::read_header(path, &mut reader)?;

        let owner = path.clone();
        let content = Content::reopen(move || -> io::Result<ContentReader> {
            let mut reader = BufReader::new(File::open(&file_path)?);
            Self::read_header(&owner, &mut reader)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            Ok(Box::new(reader))
        })
        .with_len(total.saturating_sub(header_len));

        Ok(Some(StoredContent { content, meta }))
    }

    fn children(&self, path: &Path) -> Result<Vec<ChildEntry>, TreeError> {
        match self.stat(path)? {
            Some(attr) if attr.is_dir() => {}
            _ => return Ok(Vec::new()),
        }

        let mut children = Vec::new();
        for entry in fs::read_dir(self.file_path(path)?)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!(dir = %path, "skipping non UTF-8 entry");
                continue;
            };
            let Ok(child) = path.child(&name) else {
                continue;
            };
            let kind = if entry.file_type()?.is_dir() {
                NodeKind::Directory
            } else {
                NodeKind::Resource
            };
            children.push(ChildEntry { path: child, kind });
        }
        children.sort_by(|a, b| a.path.cmp(&b.path));
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
        match self.kind(path)? {
            Some(NodeKind::Resource) => return Err(TreeError::Exists { path: path.clone() }),
            Some(NodeKind::Directory) => {
                return Err(TreeError::IsADirectory { path: path.clone() })
            }
            None => {}
        }
        self.check_ancestors(path)?;

        let (staged, len) = self.stage(meta, content)?;
        let target = self.file_path(path)?;
        self.make_parent_dirs(path, &target)?;

        match staged.persist_noclobber(&target) {
            Ok(_) => {
                tracing::debug!(path = %path, bytes = len, "local tree created resource");
                Ok(len)
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(TreeError::Exists { path: path.clone() })
            }
            Err(e) => Err(e.error.into()),
        }
    }

    fn update(
        &self,
        path: &Path,
        meta: &Metadata,
        content: &mut dyn Read,
    ) -> Result<u64, TreeError> {
        if self.kind(path)? != Some(NodeKind::Resource) {
            return Err(TreeError::Missing { path: path.clone() });
        }

        let (staged, len) = self.stage(meta, content)?;
        staged
            .persist(self.file_path(path)?)
            .map_err(|e| TreeError::Io(e.error))?;

        tracing::debug!(path = %path, bytes = len, "local tree updated resource");
        Ok(len)
    }

    fn delete(&self, path: &Path) -> Result<bool, TreeError> {
        match self.kind(path)? {
            None => return Ok(false),
            Some(NodeKind::Directory) => {
                return Err(TreeError::IsADirectory { path: path.clone() })
            }
            Some(NodeKind::Resource) => {}
        }

        match fs::remove_file(self.file_path(path)?) {
            Ok(()) => {
                self.prune(path);
                tracing::debug!(path = %path, "local tree deleted resource");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
