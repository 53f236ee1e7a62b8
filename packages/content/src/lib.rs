//! storetree content layer: raw trees of bytes plus metadata.
//!
//! This is the persistence seam of storetree. Everything here is about
//! where bytes live and how they are re-acquired:
//! - `Path`: validated hierarchical key
//! - `Content`: a content source with an explicit re-readability contract
//! - `ContentTree`: the backend trait (exists/read/list/create/update/delete)
//! - `MemoryTree` and `LocalTree`: the bundled backends
//!
//! Nothing at this level interprets metadata or checks permissions; see
//! `storetree-core` for resource semantics and authorization.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use storetree_content::{ContentTree, MemoryTree, path};
//!
//! let tree = MemoryTree::new();
//! let written = tree
//!     .create(&path!("keys/db/password"), &BTreeMap::new(), &mut &b"hunter2"[..])
//!     .unwrap();
//! assert_eq!(written, 7);
//!
//! let stored = tree.read(&path!("keys/db/password")).unwrap().unwrap();
//! assert_eq!(&stored.content.to_bytes().unwrap()[..], b"hunter2");
//! ```

pub use bytes::Bytes;

mod content;
mod error;
mod local;
mod memory;
mod path;
mod traits;

pub use content::{Content, ContentReader, OpenContent};
pub use error::TreeError;
pub use local::LocalTree;
pub use memory::MemoryTree;
pub use path::{Path, PathError};
pub use traits::{ChildEntry, ContentTree, Metadata, NodeKind, StoredContent};
