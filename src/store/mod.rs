//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! Backup / Restore / bootstrap
//!     → repository.rs (reads, writes, mutation forwarding)
//!     → Store trait (external persistence engine, memory.rs in-process)
//!     → Mutation value returned by every write
//!     → notify.rs (single data-change subscriber)
//!     → host DataChangeCallback
//! ```
//!
//! # Design Decisions
//! - Writes return a `Mutation` instead of firing hooks from inside the store
//! - Which kinds notify is a configuration toggle, not code
//! - Upserts overwrite every column of the matching record

pub mod memory;
pub mod model;
pub mod notify;
pub mod repository;

pub use memory::MemoryStore;
pub use model::{EntityKind, EntitySet, Meta, SettingItem, Storage, User};
pub use notify::{DataChangeEvent, DataChangeNotifier, Subscription};
pub use repository::Repository;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} record {key} rejected: {reason}")]
    Rejected {
        kind: EntityKind,
        key: String,
        reason: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    Saved,
    Deleted,
}

/// Result of a successful write, forwarded to data-change observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub kind: EntityKind,
    pub op: MutationOp,
}

impl Mutation {
    pub fn saved(kind: EntityKind) -> Self {
        Self { kind, op: MutationOp::Saved }
    }

    pub fn deleted(kind: EntityKind) -> Self {
        Self { kind, op: MutationOp::Deleted }
    }
}

/// The persistent store backing the server's configuration database.
///
/// Implementations must be safe to call from listener tasks and the host
/// thread at the same time. Each write is individually atomic.
pub trait Store: Send + Sync {
    fn storages(&self) -> Result<Vec<Storage>, StoreError>;
    fn users(&self) -> Result<Vec<User>, StoreError>;
    fn setting_items(&self) -> Result<Vec<SettingItem>, StoreError>;
    fn metas(&self) -> Result<Vec<Meta>, StoreError>;

    /// Insert or overwrite by `id`.
    fn upsert_storage(&self, storage: &Storage) -> Result<Mutation, StoreError>;
    fn delete_storage(&self, id: u32) -> Result<Mutation, StoreError>;
    /// Insert or overwrite by `id`.
    fn upsert_user(&self, user: &User) -> Result<Mutation, StoreError>;
    /// Insert or overwrite by `key`.
    fn upsert_setting(&self, item: &SettingItem) -> Result<Mutation, StoreError>;
    /// Insert or overwrite by `path`.
    fn upsert_meta(&self, meta: &Meta) -> Result<Mutation, StoreError>;
}
