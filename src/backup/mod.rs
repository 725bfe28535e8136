//! Configuration snapshot backup and restore.
//!
//! # Data Flow
//! ```text
//! backup:  Repository reads (enabled kinds) → codec.rs → JSON document
//! restore: JSON document → codec.rs (split by kind)
//!     → restore.rs (users → storages → settings → metas, upsert by key)
//!     → storage cache reload while the server runs
//! ```
//!
//! # Design Decisions
//! - Backup is all-or-nothing; restore is best-effort per kind and per record
//! - Kinds absent from a document are left untouched
//! - Restore order is fixed: users, storages, settings, metas

pub mod codec;
pub mod restore;

pub use codec::{SnapshotCodec, SnapshotDocument};
pub use restore::{RestoreReport, Restorer};

use crate::store::{EntityKind, StoreError};

/// Error type for snapshot operations.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("failed to read {kind}: {source}")]
    Read {
        kind: EntityKind,
        #[source]
        source: StoreError,
    },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed snapshot document: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("malformed {kind} section: {source}")]
    Section {
        kind: EntityKind,
        #[source]
        source: serde_json::Error,
    },
}
