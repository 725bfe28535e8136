//! Store access with data-change forwarding.

use std::sync::Arc;

use super::{
    DataChangeEvent, DataChangeNotifier, EntitySet, Meta, Mutation, SettingItem, Storage, Store,
    StoreError, User,
};

/// Wraps a [`Store`] and forwards every write of a hooked kind to the
/// data-change notifier, synchronously and before the write call returns.
pub struct Repository {
    store: Arc<dyn Store>,
    notifier: Arc<DataChangeNotifier>,
    hooks: EntitySet,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("hooks", &self.hooks)
            .field("notifier", &self.notifier)
            .finish()
    }
}

impl Repository {
    pub fn new(store: Arc<dyn Store>, hooks: EntitySet) -> Self {
        Self {
            store,
            notifier: DataChangeNotifier::new(),
            hooks,
        }
    }

    pub fn notifier(&self) -> &Arc<DataChangeNotifier> {
        &self.notifier
    }

    pub fn storages(&self) -> Result<Vec<Storage>, StoreError> {
        self.store.storages()
    }

    pub fn users(&self) -> Result<Vec<User>, StoreError> {
        self.store.users()
    }

    pub fn setting_items(&self) -> Result<Vec<SettingItem>, StoreError> {
        self.store.setting_items()
    }

    pub fn metas(&self) -> Result<Vec<Meta>, StoreError> {
        self.store.metas()
    }

    pub fn upsert_storage(&self, storage: &Storage) -> Result<(), StoreError> {
        let mutation = self.store.upsert_storage(storage)?;
        self.forward(mutation);
        Ok(())
    }

    pub fn delete_storage(&self, id: u32) -> Result<(), StoreError> {
        let mutation = self.store.delete_storage(id)?;
        self.forward(mutation);
        Ok(())
    }

    pub fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        let mutation = self.store.upsert_user(user)?;
        self.forward(mutation);
        Ok(())
    }

    pub fn upsert_setting(&self, item: &SettingItem) -> Result<(), StoreError> {
        let mutation = self.store.upsert_setting(item)?;
        self.forward(mutation);
        Ok(())
    }

    pub fn upsert_meta(&self, meta: &Meta) -> Result<(), StoreError> {
        let mutation = self.store.upsert_meta(meta)?;
        self.forward(mutation);
        Ok(())
    }

    fn forward(&self, mutation: Mutation) {
        if self.hooks.contains(mutation.kind) {
            crate::observability::metrics::record_data_change(mutation.kind.model_name());
            self.notifier.publish(&DataChangeEvent::from(mutation));
        }
    }
}
