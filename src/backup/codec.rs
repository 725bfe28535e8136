//! Snapshot document encoding.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use serde_json::Value;

use super::BackupError;
use crate::store::{EntityKind, EntitySet, Repository};

/// Serializes the enabled entity kinds of a repository into one document.
pub struct SnapshotCodec<'a> {
    repository: &'a Repository,
    kinds: &'a EntitySet,
}

impl<'a> SnapshotCodec<'a> {
    pub fn new(repository: &'a Repository, kinds: &'a EntitySet) -> Self {
        Self { repository, kinds }
    }

    /// Read every enabled kind and encode them as a JSON object.
    ///
    /// Any read or encode failure aborts the whole backup.
    pub fn backup(&self) -> Result<String, BackupError> {
        let mut document = BTreeMap::new();
        for kind in self.kinds.iter() {
            let section = self.read(kind).inspect_err(|error| {
                tracing::error!(kind = %kind, error = %error, "Backup aborted");
            })?;
            document.insert(kind.document_key(), section);
        }

        let text = serde_json::to_string(&document).map_err(|error| {
            tracing::error!(error = %error, "Failed to encode snapshot");
            BackupError::Encode(error)
        })?;
        tracing::info!(kinds = document.len(), bytes = text.len(), "Snapshot created");
        Ok(text)
    }

    fn read(&self, kind: EntityKind) -> Result<Value, BackupError> {
        let read_error = |source| BackupError::Read { kind, source };
        let value = match kind {
            EntityKind::Users => serde_json::to_value(self.repository.users().map_err(read_error)?),
            EntityKind::Storages => serde_json::to_value(self.repository.storages().map_err(read_error)?),
            EntityKind::Settings => serde_json::to_value(self.repository.setting_items().map_err(read_error)?),
            EntityKind::Metas => serde_json::to_value(self.repository.metas().map_err(read_error)?),
        };
        value.map_err(BackupError::Encode)
    }

    /// Parse a snapshot produced by [`SnapshotCodec::backup`] (or written by hand).
    pub fn parse(text: &str) -> Result<SnapshotDocument, BackupError> {
        SnapshotDocument::parse(text)
    }
}

/// A parsed snapshot: each known kind's section kept as raw JSON until
/// the restorer asks for it.
#[derive(Debug)]
pub struct SnapshotDocument {
    sections: BTreeMap<String, Box<RawValue>>,
}

impl SnapshotDocument {
    /// Split `text` into sections. Unknown keys are ignored.
    pub fn parse(text: &str) -> Result<Self, BackupError> {
        let sections: BTreeMap<String, Box<RawValue>> =
            serde_json::from_str(text).map_err(BackupError::Parse)?;
        Ok(Self { sections })
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        self.sections.contains_key(kind.document_key())
    }

    /// Decode the section for `kind`; `None` when the document omits it.
    /// A `null` section decodes as an empty collection.
    pub fn section<T: DeserializeOwned>(&self, kind: EntityKind) -> Option<Result<Vec<T>, BackupError>> {
        let raw = self.sections.get(kind.document_key())?;
        let records = serde_json::from_str::<Option<Vec<T>>>(raw.get())
            .map(Option::unwrap_or_default)
            .map_err(|source| BackupError::Section { kind, source });
        Some(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Meta, Mutation, SettingItem, Storage, Store, StoreError, User};
    use std::sync::Arc;

    fn repository() -> Repository {
        let repository = Repository::new(Arc::new(MemoryStore::new()), EntitySet::empty());
        repository
            .upsert_storage(&Storage { id: 1, mount_path: "/local".into(), driver: "Local".into(), ..Storage::default() })
            .unwrap();
        repository.upsert_user(&User { id: 1, username: "admin".into(), ..User::default() }).unwrap();
        repository
    }

    #[test]
    fn default_backup_holds_only_storages() {
        let repository = repository();
        let kinds = EntitySet::default();
        let text = SnapshotCodec::new(&repository, &kinds).backup().unwrap();

        let value: Value = serde_json::from_str(&text).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object["storages"][0]["mount_path"], "/local");
    }

    #[test]
    fn enabled_kinds_are_all_written() {
        let repository = repository();
        let kinds = EntitySet::all();
        let text = SnapshotCodec::new(&repository, &kinds).backup().unwrap();

        let document = SnapshotCodec::parse(&text).unwrap();
        for kind in EntityKind::RESTORE_ORDER {
            assert!(document.contains(kind), "missing {kind}");
        }
        let users: Vec<User> = document.section(EntityKind::Users).unwrap().unwrap();
        assert_eq!(users[0].username, "admin");
    }

    #[test]
    fn parse_ignores_unknown_keys_and_reports_bad_sections() {
        let document = SnapshotDocument::parse(r#"{"storages": [], "users": "oops", "plugins": [1]}"#).unwrap();

        let storages: Vec<Storage> = document.section(EntityKind::Storages).unwrap().unwrap();
        assert!(storages.is_empty());
        assert!(matches!(
            document.section::<User>(EntityKind::Users),
            Some(Err(BackupError::Section { kind: EntityKind::Users, .. }))
        ));
        assert!(document.section::<Storage>(EntityKind::Metas).is_none());
    }

    #[test]
    fn null_section_is_empty() {
        let document = SnapshotDocument::parse(r#"{"storages": null}"#).unwrap();

        let storages: Vec<Storage> = document.section(EntityKind::Storages).unwrap().unwrap();
        assert!(storages.is_empty());
    }

    /// A store whose storage table cannot be read.
    struct UnavailableStore;

    impl Store for UnavailableStore {
        fn storages(&self) -> Result<Vec<Storage>, StoreError> {
            Err(StoreError::Unavailable("storage table locked".into()))
        }
        fn users(&self) -> Result<Vec<User>, StoreError> {
            Ok(Vec::new())
        }
        fn setting_items(&self) -> Result<Vec<SettingItem>, StoreError> {
            Ok(Vec::new())
        }
        fn metas(&self) -> Result<Vec<Meta>, StoreError> {
            Ok(Vec::new())
        }
        fn upsert_storage(&self, _storage: &Storage) -> Result<Mutation, StoreError> {
            Err(StoreError::Unavailable("read only".into()))
        }
        fn delete_storage(&self, _id: u32) -> Result<Mutation, StoreError> {
            Err(StoreError::Unavailable("read only".into()))
        }
        fn upsert_user(&self, _user: &User) -> Result<Mutation, StoreError> {
            Err(StoreError::Unavailable("read only".into()))
        }
        fn upsert_setting(&self, _item: &SettingItem) -> Result<Mutation, StoreError> {
            Err(StoreError::Unavailable("read only".into()))
        }
        fn upsert_meta(&self, _meta: &Meta) -> Result<Mutation, StoreError> {
            Err(StoreError::Unavailable("read only".into()))
        }
    }

    #[test]
    fn read_failure_aborts_backup() {
        let repository = Repository::new(Arc::new(UnavailableStore), EntitySet::empty());

        let result = SnapshotCodec::new(&repository, &EntitySet::all()).backup();
        assert!(matches!(
            result,
            Err(BackupError::Read { kind: EntityKind::Storages, source: StoreError::Unavailable(_) })
        ));

        // Readable kinds alone still back up.
        let users_only: EntitySet = [EntityKind::Users].into_iter().collect();
        assert!(SnapshotCodec::new(&repository, &users_only).backup().is_ok());
    }

    #[test]
    fn parse_rejects_non_object() {
        assert!(matches!(SnapshotDocument::parse("[1, 2]"), Err(BackupError::Parse(_))));
        assert!(matches!(SnapshotDocument::parse("{"), Err(BackupError::Parse(_))));
    }
}
