//! The resource metadata model.

use std::fmt;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use storetree_content::{Bytes, Content, ContentReader, Metadata, Path};

use crate::builder::ResourceMetaBuilder;
use crate::date;
use crate::StorageError;

/// Metadata key for the content type.
pub const RES_META_CONTENT_TYPE: &str = "Rundeck-content-type";
/// Metadata key for the content size in bytes.
pub const RES_META_CONTENT_LENGTH: &str = "Rundeck-content-size";
/// Metadata key for the creation time.
pub const RES_META_CREATION_TIME: &str = "Rundeck-content-creation-time";
/// Metadata key for the modification time.
pub const RES_META_MODIFY_TIME: &str = "Rundeck-content-modify-time";

/// All keys that only the framework may write.
pub const RESERVED_KEYS: [&str; 4] = [
    RES_META_CONTENT_TYPE,
    RES_META_CONTENT_LENGTH,
    RES_META_CREATION_TIME,
    RES_META_MODIFY_TIME,
];

/// Whether `key` is one of the reserved metadata keys.
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// A resource: content plus normalized metadata.
///
/// Values are immutable once built. Reserved metadata (type, size, times) is
/// held in typed fields and only rendered back to strings by
/// [`ResourceMeta::metadata`]; caller-defined entries live in
/// [`ResourceMeta::extra_meta`].
///
/// # Example
///
/// ```rust
/// use storetree_core::ResourceMeta;
///
/// let resource = ResourceMeta::builder()
///     .content_type("text/plain")
///     .bytes("0123456789")
///     .build()
///     .unwrap();
///
/// assert_eq!(resource.content_type(), Some("text/plain"));
/// assert_eq!(resource.content_length(), 10);
/// ```
#[derive(Clone)]
pub struct ResourceMeta {
    pub(crate) content: Content,
    pub(crate) content_type: Option<String>,
    pub(crate) content_length: u64,
    pub(crate) creation_time: DateTime<Utc>,
    pub(crate) modification_time: DateTime<Utc>,
    pub(crate) extra: Metadata,
}

impl ResourceMeta {
    /// Start building a resource.
    pub fn builder() -> ResourceMetaBuilder {
        ResourceMetaBuilder::new()
    }

    /// Construct a resource from a content source and stored metadata.
    ///
    /// Reserved keys are validated; malformed values fall back to defaults
    /// (no type, length from the content or 0, epoch timestamps).
    pub fn with_content(content: Content, meta: &Metadata) -> Self {
        ResourceMetaBuilder::from_meta(meta)
            .default_time(date::epoch())
            .finish(content)
    }

    /// Construct a resource over in-memory bytes.
    pub fn with_bytes(bytes: impl Into<Bytes>, meta: &Metadata) -> Self {
        Self::with_content(Content::bytes(bytes), meta)
    }

    /// Construct a resource over a single-use reader.
    pub fn with_stream(reader: impl Read + Send + 'static, meta: &Metadata) -> Self {
        Self::with_content(Content::once(reader), meta)
    }

    /// The content source.
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Whether the content may be opened more than once.
    pub fn is_rereadable(&self) -> bool {
        self.content.is_rereadable()
    }

    /// The MIME type, if one was given.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Content length in bytes.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Creation time.
    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    /// Last modification time.
    pub fn modification_time(&self) -> DateTime<Utc> {
        self.modification_time
    }

    /// Caller-defined metadata, without reserved keys.
    pub fn extra_meta(&self) -> &Metadata {
        &self.extra
    }

    /// The full metadata map, reserved keys rendered by the framework.
    pub fn metadata(&self) -> Metadata {
        let mut meta = self.extra.clone();
        if let Some(content_type) = &self.content_type {
            meta.insert(RES_META_CONTENT_TYPE.to_string(), content_type.clone());
        }
        meta.insert(
            RES_META_CONTENT_LENGTH.to_string(),
            self.content_length.to_string(),
        );
        meta.insert(
            RES_META_CREATION_TIME.to_string(),
            date::format_date(&self.creation_time),
        );
        meta.insert(
            RES_META_MODIFY_TIME.to_string(),
            date::format_date(&self.modification_time),
        );
        meta
    }

    /// Open a reader over the content.
    pub fn open(&self, path: &Path) -> Result<ContentReader, StorageError> {
        self.content
            .open()
            .map_err(|e| StorageError::from_tree(path, e))
    }

    /// Copy the content into `out`, returning the number of bytes written.
    pub fn write_content(&self, path: &Path, out: &mut dyn Write) -> Result<u64, StorageError> {
        self.content
            .write_to(out)
            .map_err(|e| StorageError::from_tree(path, e))
    }
}

impl fmt::Debug for ResourceMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMeta")
            .field("content", &self.content)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("creation_time", &self.creation_time)
            .field("modification_time", &self.modification_time)
            .field("extra", &self.extra)
            .finish()
    }
}
