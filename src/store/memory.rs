//! In-process store with optional JSON file persistence.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::{EntityKind, Meta, Mutation, SettingItem, Storage, Store, StoreError, User};

/// On-disk layout of a persisted [`MemoryStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreFile {
    storages: Vec<Storage>,
    users: Vec<User>,
    settings: Vec<SettingItem>,
    metas: Vec<Meta>,
}

/// A thread-safe store keeping every table in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    storages: DashMap<u32, Storage>,
    users: DashMap<u32, User>,
    settings: DashMap<String, SettingItem>,
    metas: DashMap<String, Meta>,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty, memory-only store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by `path`, loading it if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let store = Self {
            persistence_path: Some(path.to_path_buf()),
            ..Self::default()
        };
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let file: StoreFile = serde_json::from_reader(reader)?;
            for storage in file.storages {
                store.storages.insert(storage.id, storage);
            }
            for user in file.users {
                store.users.insert(user.id, user);
            }
            for item in file.settings {
                store.settings.insert(item.key.clone(), item);
            }
            for meta in file.metas {
                store.metas.insert(meta.path.clone(), meta);
            }
            tracing::info!(
                path = %path.display(),
                storages = store.storages.len(),
                "Loaded store file"
            );
        }
        Ok(store)
    }

    /// Write every table to the backing file, if one was configured.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let file = StoreFile {
            storages: self.storages()?,
            users: sorted(&self.users),
            settings: self.setting_items()?,
            metas: self.metas()?,
        };
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &file)?;
        tracing::info!(path = %path.display(), "Saved store file");
        Ok(())
    }

    /// A stored user including its password hash.
    pub fn user(&self, id: u32) -> Option<User> {
        self.users.get(&id).map(|r| r.value().clone())
    }
}

fn sorted<K: Ord + Clone + std::hash::Hash + Eq, V: Clone>(table: &DashMap<K, V>) -> Vec<V> {
    let mut rows: Vec<(K, V)> = table
        .iter()
        .map(|r| (r.key().clone(), r.value().clone()))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows.into_iter().map(|(_, v)| v).collect()
}

impl Store for MemoryStore {
    fn storages(&self) -> Result<Vec<Storage>, StoreError> {
        Ok(sorted(&self.storages))
    }

    fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(sorted(&self.users))
    }

    fn setting_items(&self) -> Result<Vec<SettingItem>, StoreError> {
        Ok(sorted(&self.settings))
    }

    fn metas(&self) -> Result<Vec<Meta>, StoreError> {
        Ok(sorted(&self.metas))
    }

    fn upsert_storage(&self, storage: &Storage) -> Result<Mutation, StoreError> {
        if storage.mount_path.is_empty() {
            return Err(StoreError::Rejected {
                kind: EntityKind::Storages,
                key: storage.id.to_string(),
                reason: "mount_path is empty".into(),
            });
        }
        self.storages.insert(storage.id, storage.clone());
        Ok(Mutation::saved(EntityKind::Storages))
    }

    fn delete_storage(&self, id: u32) -> Result<Mutation, StoreError> {
        self.storages.remove(&id);
        Ok(Mutation::deleted(EntityKind::Storages))
    }

    fn upsert_user(&self, user: &User) -> Result<Mutation, StoreError> {
        self.users.insert(user.id, user.clone());
        Ok(Mutation::saved(EntityKind::Users))
    }

    fn upsert_setting(&self, item: &SettingItem) -> Result<Mutation, StoreError> {
        self.settings.insert(item.key.clone(), item.clone());
        Ok(Mutation::saved(EntityKind::Settings))
    }

    fn upsert_meta(&self, meta: &Meta) -> Result<Mutation, StoreError> {
        self.metas.insert(meta.path.clone(), meta.clone());
        Ok(Mutation::saved(EntityKind::Metas))
    }
}
