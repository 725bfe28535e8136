//! Persisted entity records and kind toggles.
//!
//! Records are carried in the store's native serialized shape; snapshot
//! documents embed them verbatim.

use std::collections::BTreeSet;
use std::fmt;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Salt mixed into every password before the per-user salt is applied.
const STATIC_SALT: &str = "mount-server";

/// Length of the random per-user salt.
const SALT_LEN: usize = 16;

/// The kinds of persisted entities that can be snapshotted or observed.
///
/// Declaration order is the order in which a restore applies kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Users,
    Storages,
    Settings,
    Metas,
}

impl EntityKind {
    /// Kinds in restore order.
    pub const RESTORE_ORDER: [EntityKind; 4] = [
        EntityKind::Users,
        EntityKind::Storages,
        EntityKind::Settings,
        EntityKind::Metas,
    ];

    /// Top-level key of this kind in a snapshot document.
    pub fn document_key(self) -> &'static str {
        match self {
            EntityKind::Users => "users",
            EntityKind::Storages => "storages",
            EntityKind::Settings => "settings",
            EntityKind::Metas => "metas",
        }
    }

    /// Model name reported to the host in data-change events.
    pub fn model_name(self) -> &'static str {
        match self {
            EntityKind::Users => "User",
            EntityKind::Storages => "Storage",
            EntityKind::Settings => "SettingItem",
            EntityKind::Metas => "Meta",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.document_key())
    }
}

/// A configurable set of entity kinds.
///
/// Defaults to storages only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitySet(BTreeSet<EntityKind>);

impl EntitySet {
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn all() -> Self {
        Self(EntityKind::RESTORE_ORDER.into_iter().collect())
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn insert(&mut self, kind: EntityKind) {
        self.0.insert(kind);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in restore order.
    pub fn iter(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.0.iter().copied()
    }
}

impl Default for EntitySet {
    fn default() -> Self {
        Self(BTreeSet::from([EntityKind::Storages]))
    }
}

impl FromIterator<EntityKind> for EntitySet {
    fn from_iter<I: IntoIterator<Item = EntityKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A backend mount descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Storage {
    pub id: u32,
    pub mount_path: String,
    pub order: i32,
    pub driver: String,
    pub cache_expiration: i32,
    pub status: String,
    /// Driver-specific settings, JSON encoded.
    pub addition: String,
    pub remark: String,
    pub modified: String,
    pub disabled: bool,
    pub disable_index: bool,
    pub enable_sign: bool,
    pub order_by: String,
    pub order_direction: String,
    pub extract_folder: String,
    pub web_proxy: bool,
    pub webdav_policy: String,
    pub proxy_range: bool,
    pub down_proxy_url: String,
}

/// An account.
///
/// A plaintext `password` only travels inside hand-written snapshots; the
/// store keeps the salted hash, which snapshots carry as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct User {
    pub id: u32,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pwd_hash: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub salt: String,
    pub base_path: String,
    pub role: i32,
    pub disabled: bool,
    pub permission: i32,
    pub otp_secret: String,
    pub sso_id: String,
}

impl User {
    /// Replace the plaintext password with a freshly salted hash.
    pub fn set_password(&mut self, password: &str) {
        self.salt = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SALT_LEN)
            .map(char::from)
            .collect();
        self.pwd_hash = hash_password(&static_hash(password), &self.salt);
        self.password.clear();
    }

    /// Check a plaintext password against the stored hash.
    pub fn verify_password(&self, password: &str) -> bool {
        !self.pwd_hash.is_empty() && hash_password(&static_hash(password), &self.salt) == self.pwd_hash
    }
}

fn static_hash(password: &str) -> String {
    format!("{:x}", Sha256::digest(format!("{password}-{STATIC_SALT}")))
}

fn hash_password(static_hash: &str, salt: &str) -> String {
    format!("{:x}", Sha256::digest(format!("{static_hash}-{salt}")))
}

/// A key/value setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SettingItem {
    pub key: String,
    pub value: String,
    pub help: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub options: String,
    pub group: i32,
    pub flag: i32,
    pub index: u32,
}

/// Per-path metadata (passwords, visibility, readme).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Meta {
    pub id: u32,
    pub path: String,
    pub password: String,
    pub p_sub: bool,
    pub write: bool,
    pub w_sub: bool,
    pub hide: String,
    pub h_sub: bool,
    pub readme: String,
    pub r_sub: bool,
    pub header: String,
    pub header_sub: bool,
}
