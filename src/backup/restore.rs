//! Upsert restore of snapshot documents.

use std::collections::BTreeMap;

use super::codec::SnapshotDocument;
use crate::observability::metrics;
use crate::ops::Operations;
use crate::store::{EntityKind, Meta, Repository, SettingItem, Storage, StoreError, User};

/// What a restore did, per kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub applied: BTreeMap<EntityKind, usize>,
    pub failed: BTreeMap<EntityKind, usize>,
    /// Kinds present in the document whose section could not be decoded.
    pub skipped: Vec<EntityKind>,
    /// The storage cache was cleared and reloaded after the storages section.
    pub cache_reloaded: bool,
    /// The document itself could not be parsed; nothing was applied.
    pub aborted: bool,
}

impl RestoreReport {
    pub fn applied(&self, kind: EntityKind) -> usize {
        self.applied.get(&kind).copied().unwrap_or_default()
    }

    pub fn failed(&self, kind: EntityKind) -> usize {
        self.failed.get(&kind).copied().unwrap_or_default()
    }

    fn record(&mut self, kind: EntityKind, applied: usize, failed: usize) {
        self.applied.insert(kind, applied);
        self.failed.insert(kind, failed);
        metrics::record_restore(kind.document_key(), applied, failed);
    }
}

/// Applies snapshot documents to a repository.
pub struct Restorer<'a, R> {
    repository: &'a Repository,
    operations: &'a dyn Operations,
    is_running: R,
}

impl<'a, R> Restorer<'a, R>
where
    R: Fn() -> bool,
{
    /// `is_running` is asked after the storages section is applied; the
    /// storage cache is only reloaded when it returns `true`.
    pub fn new(repository: &'a Repository, operations: &'a dyn Operations, is_running: R) -> Self {
        Self {
            repository,
            operations,
            is_running,
        }
    }

    /// Apply `text` kind by kind in users, storages, settings, metas order.
    ///
    /// Failures are logged and skip only the affected kind or record.
    pub fn restore(&self, text: &str) -> RestoreReport {
        let mut report = RestoreReport::default();
        let document = match SnapshotDocument::parse(text) {
            Ok(document) => document,
            Err(error) => {
                tracing::error!(error = %error, "Restore aborted");
                report.aborted = true;
                return report;
            }
        };

        for kind in EntityKind::RESTORE_ORDER {
            match kind {
                EntityKind::Users => self.restore_users(&document, &mut report),
                EntityKind::Storages => self.restore_storages(&document, &mut report),
                EntityKind::Settings => self.restore_settings(&document, &mut report),
                EntityKind::Metas => self.restore_metas(&document, &mut report),
            }
        }

        tracing::info!(
            applied = report.applied.values().sum::<usize>(),
            failed = report.failed.values().sum::<usize>(),
            skipped = report.skipped.len(),
            "Restore finished"
        );
        report
    }

    fn restore_users(&self, document: &SnapshotDocument, report: &mut RestoreReport) {
        let Some(users) = section::<User>(document, EntityKind::Users, report) else {
            return;
        };
        let (applied, failed) = apply_each(EntityKind::Users, users, |mut user| {
            if !user.password.is_empty() {
                let password = std::mem::take(&mut user.password);
                user.set_password(&password);
            }
            self.repository.upsert_user(&user)
        });
        report.record(EntityKind::Users, applied, failed);
    }

    fn restore_storages(&self, document: &SnapshotDocument, report: &mut RestoreReport) {
        let Some(storages) = section::<Storage>(document, EntityKind::Storages, report) else {
            return;
        };
        let (applied, failed) = apply_each(EntityKind::Storages, storages, |storage| {
            self.repository.upsert_storage(&storage)
        });
        report.record(EntityKind::Storages, applied, failed);

        if (self.is_running)() {
            self.operations.clear_storage_cache();
            match self.operations.load_storages() {
                Ok(()) => report.cache_reloaded = true,
                Err(error) => tracing::error!(error = %error, "Failed to reload storages after restore"),
            }
        }
    }

    fn restore_settings(&self, document: &SnapshotDocument, report: &mut RestoreReport) {
        let Some(items) = section::<SettingItem>(document, EntityKind::Settings, report) else {
            return;
        };
        match self.operations.save_setting_items(&items) {
            Ok(()) => report.record(EntityKind::Settings, items.len(), 0),
            Err(error) => {
                tracing::error!(error = %error, "Failed to restore settings");
                report.record(EntityKind::Settings, 0, items.len());
            }
        }
    }

    fn restore_metas(&self, document: &SnapshotDocument, report: &mut RestoreReport) {
        let Some(metas) = section::<Meta>(document, EntityKind::Metas, report) else {
            return;
        };
        let (applied, failed) = apply_each(EntityKind::Metas, metas, |meta| self.repository.upsert_meta(&meta));
        report.record(EntityKind::Metas, applied, failed);
    }
}

fn section<T: serde::de::DeserializeOwned>(
    document: &SnapshotDocument,
    kind: EntityKind,
    report: &mut RestoreReport,
) -> Option<Vec<T>> {
    match document.section(kind)? {
        Ok(records) => Some(records),
        Err(error) => {
            tracing::error!(kind = %kind, error = %error, "Skipping section");
            report.skipped.push(kind);
            None
        }
    }
}

fn apply_each<T>(
    kind: EntityKind,
    records: Vec<T>,
    mut apply: impl FnMut(T) -> Result<(), StoreError>,
) -> (usize, usize) {
    let mut applied = 0;
    let mut failed = 0;
    for record in records {
        match apply(record) {
            Ok(()) => applied += 1,
            Err(error) => {
                tracing::error!(kind = %kind, error = %error, "Failed to restore record");
                failed += 1;
            }
        }
    }
    (applied, failed)
}
