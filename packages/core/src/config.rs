//! Backend selection from configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use storetree_content::{LocalTree, MemoryTree, Path};

use crate::storage_tree::{StorageTree, StorageTreeImpl};
use crate::StorageError;

/// Which backend a storage tree runs on.
///
/// Deserializes from a tagged JSON object:
///
/// ```json
/// {"type": "memory"}
/// {"type": "local", "path": "/var/lib/storetree"}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeConfig {
    /// A process-local tree that is lost on drop.
    #[default]
    Memory,
    /// A tree of files under `path`.
    Local { path: PathBuf },
}

impl TreeConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        serde_json::from_str(json).map_err(|e| StorageError::Config {
            message: e.to_string(),
        })
    }

    /// Open the configured backend behind a [`StorageTreeImpl`] facade.
    pub fn open(&self) -> Result<Box<dyn StorageTree>, StorageError> {
        match self {
            TreeConfig::Memory => {
                tracing::debug!("opening in-memory tree");
                Ok(Box::new(StorageTreeImpl::new(MemoryTree::new())))
            }
            TreeConfig::Local { path } => {
                tracing::debug!(root = %path.display(), "opening local tree");
                let tree = LocalTree::open(path)
                    .map_err(|e| StorageError::from_tree(&Path::root(), e))?;
                Ok(Box::new(StorageTreeImpl::new(tree)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceMeta;
    use storetree_content::path;
    use tempfile::TempDir;

    #[test]
    fn parses_tagged_json() {
        assert_eq!(
            TreeConfig::from_json(r#"{"type": "memory"}"#).unwrap(),
            TreeConfig::Memory
        );
        assert_eq!(
            TreeConfig::from_json(r#"{"type": "local", "path": "/srv/tree"}"#).unwrap(),
            TreeConfig::Local {
                path: PathBuf::from("/srv/tree")
            }
        );
    }

    #[test]
    fn rejects_unknown_backends() {
        for bad in [r#"{"type": "s3"}"#, r#"{"type": "local"}"#, "not json"] {
            assert!(
                matches!(TreeConfig::from_json(bad), Err(StorageError::Config { .. })),
                "input {bad:?}"
            );
        }
    }

    #[test]
    fn serializes_back_to_the_same_shape() {
        let json = serde_json::to_value(TreeConfig::Local {
            path: PathBuf::from("data"),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "local", "path": "data"}));
    }

    #[test]
    fn opens_each_backend() {
        let dir = TempDir::new().unwrap();
        let configs = [
            TreeConfig::default(),
            TreeConfig::Local {
                path: dir.path().join("tree"),
            },
        ];
        for config in configs {
            let tree = config.open().unwrap();
            let resource = ResourceMeta::builder().bytes("abc").build().unwrap();
            tree.create(&path!("x/y"), resource).unwrap();
            assert_eq!(tree.get(&path!("x/y")).unwrap().content_length(), 3);
        }
    }
}
