//! Bootstrap and storage-cache operations.
//!
//! The lifecycle layer runs these at start and after a storage restore. The
//! storage drivers themselves live outside this crate; [`MountOperations`]
//! keeps the in-memory mount table those drivers would be attached to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::store::{Repository, SettingItem, Storage, StoreError};

/// Error type for bootstrap and cache operations.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{step} failed: {reason}")]
    Failed { step: &'static str, reason: String },
}

/// Steps the runtime performs against the wider application.
pub trait Operations: Send + Sync {
    fn init_offline_download_tools(&self) -> Result<(), OperationError>;
    /// Mount every enabled storage from the store.
    fn load_storages(&self) -> Result<(), OperationError>;
    fn init_task_manager(&self) -> Result<(), OperationError>;
    /// Drop every mounted storage.
    fn clear_storage_cache(&self);
    /// Persist a whole settings collection.
    fn save_setting_items(&self, items: &[SettingItem]) -> Result<(), OperationError>;
}

/// Default operations backed by the repository.
#[derive(Debug)]
pub struct MountOperations {
    repository: Arc<Repository>,
    mounts: DashMap<String, Storage>,
    download_tools_ready: AtomicBool,
    task_manager_ready: AtomicBool,
}

impl MountOperations {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self {
            repository,
            mounts: DashMap::new(),
            download_tools_ready: AtomicBool::new(false),
            task_manager_ready: AtomicBool::new(false),
        }
    }

    /// The storage mounted at `mount_path`, if any.
    pub fn mounted(&self, mount_path: &str) -> Option<Storage> {
        self.mounts.get(mount_path).map(|entry| entry.value().clone())
    }

    pub fn mount_count(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.download_tools_ready.load(Ordering::Acquire) && self.task_manager_ready.load(Ordering::Acquire)
    }
}

impl Operations for MountOperations {
    fn init_offline_download_tools(&self) -> Result<(), OperationError> {
        self.download_tools_ready.store(true, Ordering::Release);
        tracing::debug!("Offline download tools initialized");
        Ok(())
    }

    fn load_storages(&self) -> Result<(), OperationError> {
        let storages = self.repository.storages()?;
        let mut loaded = 0usize;
        for storage in storages.into_iter().filter(|storage| !storage.disabled) {
            tracing::debug!(id = storage.id, mount_path = %storage.mount_path, driver = %storage.driver, "Mounting storage");
            self.mounts.insert(storage.mount_path.clone(), storage);
            loaded += 1;
        }
        tracing::info!(loaded, "Storages loaded");
        Ok(())
    }

    fn init_task_manager(&self) -> Result<(), OperationError> {
        self.task_manager_ready.store(true, Ordering::Release);
        tracing::debug!("Task manager initialized");
        Ok(())
    }

    fn clear_storage_cache(&self) {
        let dropped = self.mounts.len();
        self.mounts.clear();
        tracing::debug!(dropped, "Storage cache cleared");
    }

    fn save_setting_items(&self, items: &[SettingItem]) -> Result<(), OperationError> {
        for item in items {
            self.repository.upsert_setting(item)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EntitySet, MemoryStore};

    fn operations() -> (Arc<Repository>, MountOperations) {
        let repository = Arc::new(Repository::new(Arc::new(MemoryStore::new()), EntitySet::empty()));
        let operations = MountOperations::new(Arc::clone(&repository));
        (repository, operations)
    }

    #[test]
    fn load_storages_skips_disabled() {
        let (repository, operations) = operations();
        repository
            .upsert_storage(&Storage { id: 1, mount_path: "/local".into(), ..Storage::default() })
            .unwrap();
        repository
            .upsert_storage(&Storage { id: 2, mount_path: "/off".into(), disabled: true, ..Storage::default() })
            .unwrap();

        operations.load_storages().unwrap();
        assert_eq!(operations.mount_count(), 1);
        assert!(operations.mounted("/local").is_some());

        operations.clear_storage_cache();
        assert_eq!(operations.mount_count(), 0);
    }

    #[test]
    fn bootstrap_flags() {
        let (_, operations) = operations();
        assert!(!operations.is_bootstrapped());
        operations.init_offline_download_tools().unwrap();
        operations.init_task_manager().unwrap();
        assert!(operations.is_bootstrapped());
    }

    #[test]
    fn save_setting_items_upserts_each() {
        let (repository, operations) = operations();
        let items = vec![
            SettingItem { key: "site_title".into(), value: "Mount".into(), ..SettingItem::default() },
            SettingItem { key: "version".into(), value: "1".into(), ..SettingItem::default() },
        ];

        operations.save_setting_items(&items).unwrap();
        operations.save_setting_items(&items[..1]).unwrap();
        assert_eq!(repository.setting_items().unwrap().len(), 2);
    }
}
