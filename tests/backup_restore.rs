//! Snapshot backup and restore through the runtime.

mod common;

use std::sync::Arc;

use serde_json::Value;

use common::RecordingChanges;
use mount_server::backup::{BackupError, SnapshotCodec};
use mount_server::config::{SchemeConfig, ServerConfig};
use mount_server::store::{
    EntityKind, EntitySet, Meta, MemoryStore, Mutation, Repository, SettingItem, Storage, Store, StoreError, User,
};
use mount_server::{HostController, ServerRuntime};

fn config(backup: EntitySet) -> ServerConfig {
    let mut config = common::config(SchemeConfig::disabled());
    config.backup.kinds = backup;
    config
}

fn seeded(store: Arc<MemoryStore>) -> ServerRuntime {
    let runtime = ServerRuntime::builder(config(EntitySet::all())).store(store).build();
    let repository = runtime.repository();

    let mut admin = User {
        id: 1,
        username: "admin".into(),
        role: 2,
        ..User::default()
    };
    admin.set_password("hunter2");
    repository.upsert_user(&admin).unwrap();
    repository
        .upsert_storage(&Storage {
            id: 1,
            mount_path: "/local".into(),
            driver: "Local".into(),
            addition: r#"{"root_folder_path":"/data"}"#.into(),
            ..Storage::default()
        })
        .unwrap();
    repository
        .upsert_setting(&SettingItem {
            key: "site_title".into(),
            value: "Mounts".into(),
            ..SettingItem::default()
        })
        .unwrap();
    repository
        .upsert_meta(&Meta {
            id: 1,
            path: "/local/private".into(),
            password: "letmein".into(),
            p_sub: true,
            ..Meta::default()
        })
        .unwrap();
    runtime
}

#[test]
fn backup_then_restore_into_empty_store() {
    let source_store = Arc::new(MemoryStore::new());
    let source = seeded(source_store.clone());
    let snapshot = source.backup().unwrap();

    let document: Value = serde_json::from_str(&snapshot).unwrap();
    for kind in EntityKind::RESTORE_ORDER {
        assert!(document.get(kind.document_key()).is_some(), "missing {kind}");
    }

    let target_store = Arc::new(MemoryStore::new());
    let target = ServerRuntime::builder(config(EntitySet::all()))
        .store(target_store.clone())
        .build();
    let report = target.restore(&snapshot);

    assert!(!report.aborted);
    assert!(report.skipped.is_empty());
    for kind in EntityKind::RESTORE_ORDER {
        assert_eq!(report.applied(kind), 1, "{kind}");
        assert_eq!(report.failed(kind), 0, "{kind}");
    }
    assert!(!report.cache_reloaded);

    let restored = target_store.user(1).unwrap();
    assert_eq!(restored, source_store.user(1).unwrap());
    assert!(restored.verify_password("hunter2"));
    assert_eq!(target.repository().storages().unwrap(), source.repository().storages().unwrap());
    assert_eq!(target.repository().metas().unwrap(), source.repository().metas().unwrap());
    assert_eq!(target.backup().unwrap(), snapshot);
}

#[test]
fn backup_includes_only_configured_kinds() {
    let store = Arc::new(MemoryStore::new());
    seeded(store.clone());
    let runtime = ServerRuntime::builder(config(EntitySet::default())).store(store).build();

    let document: Value = serde_json::from_str(&runtime.backup().unwrap()).unwrap();
    let keys: Vec<_> = document.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["storages".to_string()]);
}

#[test]
fn restore_upserts_over_existing_records() {
    let store = Arc::new(MemoryStore::new());
    let runtime = seeded(store);

    let report = runtime.restore(
        r#"{
            "storages": [
                {"id": 1, "mount_path": "/renamed", "driver": "Local"},
                {"id": 2, "mount_path": "/second", "driver": "Local"}
            ],
            "settings": [{"key": "site_title", "value": "Restored"}]
        }"#,
    );

    assert_eq!(report.applied(EntityKind::Storages), 2);
    assert_eq!(report.applied(EntityKind::Settings), 1);
    assert_eq!(report.applied(EntityKind::Users), 0);

    let storages = runtime.repository().storages().unwrap();
    let paths: Vec<_> = storages.iter().map(|s| s.mount_path.as_str()).collect();
    assert_eq!(paths, vec!["/renamed", "/second"]);
    assert!(storages[0].addition.is_empty(), "upsert must overwrite every column");

    let settings = runtime.repository().setting_items().unwrap();
    assert_eq!(settings.len(), 1);
    assert_eq!(settings[0].value, "Restored");
    assert_eq!(runtime.repository().users().unwrap().len(), 1);
}

#[test]
fn malformed_section_is_skipped_and_others_apply() {
    let runtime = ServerRuntime::builder(config(EntitySet::all())).build();

    let report = runtime.restore(
        r#"{
            "users": [{"id": "not a number"}],
            "storages": [{"id": 4, "mount_path": "/kept"}],
            "metas": [{"id": 1, "path": "/kept"}]
        }"#,
    );

    assert!(!report.aborted);
    assert_eq!(report.skipped, vec![EntityKind::Users]);
    assert_eq!(report.applied(EntityKind::Storages), 1);
    assert_eq!(report.applied(EntityKind::Metas), 1);
    assert!(runtime.repository().users().unwrap().is_empty());
}

#[test]
fn rejected_record_does_not_stop_the_rest() {
    let runtime = ServerRuntime::builder(config(EntitySet::all())).build();

    let report = runtime.restore(
        r#"{"storages": [
            {"id": 1, "mount_path": ""},
            {"id": 2, "mount_path": "/ok"}
        ]}"#,
    );

    assert_eq!(report.applied(EntityKind::Storages), 1);
    assert_eq!(report.failed(EntityKind::Storages), 1);
    let storages = runtime.repository().storages().unwrap();
    assert_eq!(storages.len(), 1);
    assert_eq!(storages[0].id, 2);
}

#[test]
fn unparseable_snapshot_changes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let runtime = seeded(store);
    let before = runtime.backup().unwrap();

    let report = runtime.restore("{ this is not json");

    assert!(report.aborted);
    assert!(report.applied.is_empty());
    assert_eq!(runtime.backup().unwrap(), before);
}

#[test]
fn plaintext_password_is_hashed_on_restore() {
    let store = Arc::new(MemoryStore::new());
    let runtime = ServerRuntime::builder(config(EntitySet::all()))
        .store(store.clone())
        .build();

    let report = runtime.restore(r#"{"users": [{"id": 9, "username": "ops", "password": "s3cret"}]}"#);
    assert_eq!(report.applied(EntityKind::Users), 1);

    let user = store.user(9).unwrap();
    assert!(user.password.is_empty());
    assert!(!user.salt.is_empty());
    assert!(user.verify_password("s3cret"));

    let document: Value = serde_json::from_str(&runtime.backup().unwrap()).unwrap();
    assert!(!document.to_string().contains("s3cret"));
}

#[tokio::test]
async fn restore_publishes_hooked_kinds_to_the_host() {
    let mut config = config(EntitySet::all());
    config.data_change.kinds = [EntityKind::Storages, EntityKind::Metas].into_iter().collect();
    let runtime = ServerRuntime::builder(config).build();
    let changes = Arc::new(RecordingChanges::default());
    runtime.start(changes.clone()).await.unwrap();

    runtime.restore(
        r#"{"storages": [{"id": 1, "mount_path": "/a"}, {"id": 2, "mount_path": "/b"}],
            "metas": [{"id": 1, "path": "/a"}]}"#,
    );

    assert_eq!(changes.models(), vec!["Storage", "Storage", "Meta"]);
    runtime.shutdown(std::time::Duration::from_secs(1)).await.unwrap();
}

#[test]
fn snapshot_survives_store_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = Arc::new(MemoryStore::open(&path).unwrap());
    let snapshot = seeded(store.clone()).backup().unwrap();
    store.save().unwrap();

    let reopened = Arc::new(MemoryStore::open(&path).unwrap());
    let runtime = ServerRuntime::builder(config(EntitySet::all())).store(reopened).build();
    assert_eq!(runtime.backup().unwrap(), snapshot);
}

/// A store backend that has gone away.
struct UnavailableStore;

fn unavailable<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("connection closed".into()))
}

impl Store for UnavailableStore {
    fn storages(&self) -> Result<Vec<Storage>, StoreError> {
        unavailable()
    }
    fn users(&self) -> Result<Vec<User>, StoreError> {
        unavailable()
    }
    fn setting_items(&self) -> Result<Vec<SettingItem>, StoreError> {
        unavailable()
    }
    fn metas(&self) -> Result<Vec<Meta>, StoreError> {
        unavailable()
    }
    fn upsert_storage(&self, _storage: &Storage) -> Result<Mutation, StoreError> {
        unavailable()
    }
    fn delete_storage(&self, _id: u32) -> Result<Mutation, StoreError> {
        unavailable()
    }
    fn upsert_user(&self, _user: &User) -> Result<Mutation, StoreError> {
        unavailable()
    }
    fn upsert_setting(&self, _item: &SettingItem) -> Result<Mutation, StoreError> {
        unavailable()
    }
    fn upsert_meta(&self, _meta: &Meta) -> Result<Mutation, StoreError> {
        unavailable()
    }
}

#[test]
fn unreadable_store_yields_empty_host_backup() {
    let repository = Repository::new(Arc::new(UnavailableStore), EntitySet::empty());
    let kinds = EntitySet::all();
    assert!(matches!(
        SnapshotCodec::new(&repository, &kinds).backup(),
        Err(BackupError::Read { kind: EntityKind::Users, source: StoreError::Unavailable(_) })
    ));

    let host = HostController::new(
        ServerRuntime::builder(config(EntitySet::default()))
            .store(Arc::new(UnavailableStore))
            .build(),
    )
    .unwrap();
    assert!(matches!(host.server().backup(), Err(BackupError::Read { .. })));
    assert_eq!(host.backup(), "");
}
