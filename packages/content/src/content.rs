//! Content sources and their re-readability contract.

use std::fmt;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;

use crate::TreeError;

/// A boxed reader over resource content.
pub type ContentReader = Box<dyn Read + Send>;

/// Something that can hand out a fresh reader every time it is asked.
///
/// Implemented for closures, so a backend can capture whatever it needs to
/// re-acquire the bytes (a file path, a handle, a key).
pub trait OpenContent: Send + Sync {
    /// Open a new reader positioned at the start of the content.
    fn open(&self) -> io::Result<ContentReader>;
}

impl<F> OpenContent for F
where
    F: Fn() -> io::Result<ContentReader> + Send + Sync,
{
    fn open(&self) -> io::Result<ContentReader> {
        self()
    }
}

#[derive(Clone)]
enum Source {
    Bytes(Bytes),
    Reopen(Arc<dyn OpenContent>),
    Once(Arc<Mutex<Option<ContentReader>>>),
}

/// The content of a resource.
///
/// Every `Content` states whether it can be read more than once:
///
/// - [`Content::bytes`] and [`Content::reopen`] are re-readable; each call
///   to [`Content::open`] starts from the beginning.
/// - [`Content::once`] wraps a plain reader. The first `open` takes it and
///   every later `open` fails with [`TreeError::StreamConsumed`]. Clones
///   share the same single-use reader.
///
/// # Example
///
/// ```rust
/// use std::io::Read;
/// use storetree_content::Content;
///
/// let content = Content::bytes("hello");
/// assert!(content.is_rereadable());
/// assert_eq!(content.known_len(), Some(5));
///
/// let mut s = String::new();
/// content.open().unwrap().read_to_string(&mut s).unwrap();
/// assert_eq!(s, "hello");
/// ```
#[derive(Clone)]
pub struct Content {
    source: Source,
    len: Option<u64>,
}

impl Content {
    /// In-memory content.
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Content {
            source: Source::Bytes(bytes.into()),
            len: None,
        }
    }

    /// Content that can be re-acquired by opening a new reader.
    pub fn reopen(opener: impl OpenContent + 'static) -> Self {
        Content {
            source: Source::Reopen(Arc::new(opener)),
            len: None,
        }
    }

    /// Single-use content backed by a plain reader.
    pub fn once(reader: impl Read + Send + 'static) -> Self {
        let reader: ContentReader = Box::new(reader);
        Content {
            source: Source::Once(Arc::new(Mutex::new(Some(reader)))),
            len: None,
        }
    }

    /// Record the byte count of a streamed source.
    ///
    /// Ignored for in-memory content, whose length is always exact.
    #[must_use]
    pub fn with_len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }

    /// The byte count, when it is known without reading.
    pub fn known_len(&self) -> Option<u64> {
        match &self.source {
            Source::Bytes(bytes) => Some(bytes.len() as u64),
            _ => self.len,
        }
    }

    /// Whether [`Content::open`] may be called more than once.
    pub fn is_rereadable(&self) -> bool {
        !matches!(self.source, Source::Once(_))
    }

    /// Open a reader over the content.
    pub fn open(&self) -> Result<ContentReader, TreeError> {
        match &self.source {
            Source::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            Source::Reopen(opener) => Ok(opener.open()?),
            Source::Once(slot) => slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .ok_or(TreeError::StreamConsumed),
        }
    }

    /// Copy the content into `out`, returning the number of bytes written.
    pub fn write_to(&self, out: &mut dyn Write) -> Result<u64, TreeError> {
        let mut reader = self.open()?;
        Ok(io::copy(&mut reader, out)?)
    }

    /// Read the whole content into memory.
    pub fn to_bytes(&self) -> Result<Bytes, TreeError> {
        if let Source::Bytes(bytes) = &self.source {
            return Ok(bytes.clone());
        }
        let mut buf = Vec::new();
        self.open()?.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.source {
            Source::Bytes(_) => "bytes",
            Source::Reopen(_) => "reopen",
            Source::Once(_) => "once",
        };
        f.debug_struct("Content")
            .field("kind", &kind)
            .field("len", &self.known_len())
            .finish()
    }
}

impl From<Bytes> for Content {
    fn from(bytes: Bytes) -> Self {
        Content::bytes(bytes)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::bytes(bytes)
    }
}
