use storetree::auth::{self, AllowAll};
use storetree::{open_authorized, Action, Path, ResourceMeta, StorageError, StorageTree, path};
use tempfile::TempDir;

#[test]
fn opens_memory_backend() {
    let tree = open_authorized(r#"{"type": "memory"}"#, AllowAll).unwrap();
    let resource = ResourceMeta::builder().bytes("abc").build().unwrap();
    tree.create(&path!("a/b"), resource).unwrap();
    assert_eq!(tree.list(&path!("a")).unwrap(), vec![path!("a/b")]);
}

#[test]
fn opens_local_backend_with_restricted_context() {
    let dir = TempDir::new().unwrap();
    let config = local_config(dir.path());

    let admin = open_authorized(&config, AllowAll).unwrap();
    for name in ["public", "private"] {
        let resource = ResourceMeta::builder()
            .content_type("text/plain")
            .bytes(name.to_string())
            .build()
            .unwrap();
        admin.create(&path!("docs").child(name).unwrap(), resource).unwrap();
    }

    let guest = open_authorized(
        &config,
        auth::from_fn(|_: &str, p: &Path, action| {
            action == Action::Read && p.name() != Some("private")
        }),
    )
    .unwrap();

    assert_eq!(guest.list(&path!("docs")).unwrap(), vec![path!("docs/public")]);
    assert_eq!(guest.get(&path!("docs/public")).unwrap().content_length(), 6);
    assert!(matches!(
        guest.get(&path!("docs/private")),
        Err(StorageError::Unauthorized { .. })
    ));
    assert!(matches!(
        guest.delete(&path!("docs/public")),
        Err(StorageError::Unauthorized { action: Action::Delete, .. })
    ));
}

#[test]
fn bad_config_is_reported() {
    assert!(matches!(
        open_authorized(r#"{"type": "tape"}"#, AllowAll),
        Err(StorageError::Config { .. })
    ));
}

fn local_config(root: &std::path::Path) -> String {
    format!(
        r#"{{"type": "local", "path": {:?}}}"#,
        root.to_string_lossy()
    )
}
