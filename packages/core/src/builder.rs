//! Stepwise construction of [`ResourceMeta`] values.

use std::io::Read;

use chrono::{DateTime, SubsecRound, Utc};
use storetree_content::{Bytes, Content, Metadata};

use crate::date;
use crate::meta::{
    ResourceMeta, RES_META_CONTENT_LENGTH, RES_META_CONTENT_TYPE, RES_META_CREATION_TIME,
    RES_META_MODIFY_TIME,
};
use crate::BuildError;

/// Builder for [`ResourceMeta`].
///
/// Setters chain by value. [`ResourceMetaBuilder::build`] fills in defaults
/// for anything left unset:
///
/// - content type: left absent, never guessed
/// - content length: the content's own byte count when known, otherwise the
///   explicit length, otherwise 0
/// - creation and modification time: the default time if one was set,
///   otherwise the instant `build` runs
///
/// The builder is `Clone`; building from a clone leaves the original free to
/// change without affecting resources already built.
///
/// # Example
///
/// ```rust
/// use storetree_core::{ResourceMeta, BuildError};
///
/// let missing = ResourceMeta::builder().content_type("text/plain").build();
/// assert_eq!(missing.unwrap_err(), BuildError::MissingContent);
///
/// let resource = ResourceMeta::builder()
///     .meta("owner", "ops")
///     .bytes(vec![0u8; 16])
///     .build()
///     .unwrap();
/// assert_eq!(resource.content_length(), 16);
/// assert_eq!(resource.content_type(), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ResourceMetaBuilder {
    content: Option<Content>,
    content_type: Option<String>,
    content_length: Option<u64>,
    creation_time: Option<DateTime<Utc>>,
    modification_time: Option<DateTime<Utc>>,
    default_time: Option<DateTime<Utc>>,
    extra: Metadata,
}

impl ResourceMetaBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder seeded from existing metadata.
    ///
    /// Reserved keys are parsed into their typed fields; malformed values are
    /// dropped. Every other entry is kept as caller metadata.
    pub fn from_meta(meta: &Metadata) -> Self {
        meta.iter()
            .fold(Self::new(), |builder, (key, value)| builder.meta(key, value))
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        let trimmed = content_type.trim();
        self.content_type = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    pub fn creation_time(mut self, time: DateTime<Utc>) -> Self {
        self.creation_time = Some(time);
        self
    }

    pub fn modification_time(mut self, time: DateTime<Utc>) -> Self {
        self.modification_time = Some(time);
        self
    }

    /// The time used for any timestamp left unset.
    pub fn default_time(mut self, time: DateTime<Utc>) -> Self {
        self.default_time = Some(time);
        self
    }

    /// Set one metadata entry.
    ///
    /// Reserved keys are routed through their typed setters, so their
    /// values are validated rather than stored verbatim.
    pub fn meta(self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let (key, value) = (key.as_ref(), value.as_ref());
        match key {
            RES_META_CONTENT_TYPE => self.content_type(value),
            RES_META_CONTENT_LENGTH => {
                // A malformed size leaves any earlier one in place.
                let fallback = self.content_length.unwrap_or(0);
                self.content_length(date::parse_long(value, fallback))
            }
            RES_META_CREATION_TIME => match date::try_parse_date(value) {
                Some(time) => self.creation_time(time),
                None => {
                    tracing::debug!(key, value, "ignoring malformed creation time");
                    self
                }
            },
            RES_META_MODIFY_TIME => match date::try_parse_date(value) {
                Some(time) => self.modification_time(time),
                None => {
                    tracing::debug!(key, value, "ignoring malformed modification time");
                    self
                }
            },
            _ => {
                let mut builder = self;
                builder.extra.insert(key.to_string(), value.to_string());
                builder
            }
        }
    }

    /// Set the content source.
    pub fn content(mut self, content: Content) -> Self {
        self.content = Some(content);
        self
    }

    /// Use in-memory bytes as the content.
    pub fn bytes(self, bytes: impl Into<Bytes>) -> Self {
        self.content(Content::bytes(bytes))
    }

    /// Use a single-use reader as the content.
    pub fn stream(self, reader: impl Read + Send + 'static) -> Self {
        self.content(Content::once(reader))
    }

    /// Build the resource.
    ///
    /// # Errors
    ///
    /// [`BuildError::MissingContent`] if no content source was set.
    pub fn build(mut self) -> Result<ResourceMeta, BuildError> {
        let content = self.content.take().ok_or(BuildError::MissingContent)?;
        Ok(self.finish(content))
    }

    pub(crate) fn finish(self, content: Content) -> ResourceMeta {
        let default = self.default_time.unwrap_or_else(Utc::now);
        let content_length = content
            .known_len()
            .or(self.content_length)
            .unwrap_or(0);

        // Stored timestamps carry whole seconds only.
        ResourceMeta {
            content,
            content_type: self.content_type,
            content_length,
            creation_time: self.creation_time.unwrap_or(default).trunc_subsecs(0),
            modification_time: self.modification_time.unwrap_or(default).trunc_subsecs(0),
            extra: self.extra,
        }
    }
}
