//! Node metadata, ACLs, and create modes.

use serde::{Deserialize, Serialize};

// ── Permission bits ──────────────────────────────────────────────────

pub const PERM_READ: u32 = 1 << 0;
pub const PERM_WRITE: u32 = 1 << 1;
pub const PERM_CREATE: u32 = 1 << 2;
pub const PERM_DELETE: u32 = 1 << 3;
pub const PERM_ADMIN: u32 = 1 << 4;
pub const PERM_ALL: u32 = PERM_READ | PERM_WRITE | PERM_CREATE | PERM_DELETE | PERM_ADMIN;

/// Metadata the coordination service tracks for every node.
///
/// Times are epoch milliseconds as the wire protocol reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    /// Transaction id that created the node.
    pub czxid: i64,
    /// Transaction id of the last modification.
    pub mzxid: i64,
    pub ctime: i64,
    pub mtime: i64,
    /// Data version, incremented on every `set`.
    pub version: i32,
    /// Child-list version.
    pub cversion: i32,
    /// ACL version.
    pub aversion: i32,
    /// Session id of the owner if the node is ephemeral, zero otherwise.
    pub ephemeral_owner: i64,
    pub data_length: i32,
    pub num_children: i32,
    /// Transaction id of the last child-list change.
    pub pzxid: i64,
}

/// A single access-control entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub perms: u32,
    pub scheme: String,
    pub id: String,
}

impl Acl {
    pub fn new(perms: u32, scheme: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            perms,
            scheme: scheme.into(),
            id: id.into(),
        }
    }
}

/// World-readable-and-writable. The service's conventional default.
pub fn open_acl_unsafe() -> Vec<Acl> {
    vec![Acl::new(PERM_ALL, "world", "anyone")]
}

/// World-readable only.
pub fn read_acl_unsafe() -> Vec<Acl> {
    vec![Acl::new(PERM_READ, "world", "anyone")]
}

/// Full permissions for the authenticated session that creates the node.
pub fn creator_all_acl() -> Vec<Acl> {
    vec![Acl::new(PERM_ALL, "auth", "")]
}

/// How a node is created: whether it outlives the session and whether
/// the service appends a monotonic sequence suffix to its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateMode {
    Persistent,
    Ephemeral,
    PersistentSequential,
    EphemeralSequential,
}

impl CreateMode {
    pub fn is_ephemeral(self) -> bool {
        matches!(self, CreateMode::Ephemeral | CreateMode::EphemeralSequential)
    }

    pub fn is_sequential(self) -> bool {
        matches!(
            self,
            CreateMode::PersistentSequential | CreateMode::EphemeralSequential
        )
    }

    /// Wire-level create flags.
    pub fn flags(self) -> i32 {
        let mut flags = 0;
        if self.is_ephemeral() {
            flags |= 1;
        }
        if self.is_sequential() {
            flags |= 2;
        }
        flags
    }
}

/// A credential forwarded verbatim to the driver's `add_auth`.
///
/// The client re-applies every configured credential after each redial,
/// since a fresh session starts unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub scheme: String,
    pub auth: Vec<u8>,
}

impl AuthInfo {
    pub fn new(scheme: impl Into<String>, auth: impl Into<Vec<u8>>) -> Self {
        Self {
            scheme: scheme.into(),
            auth: auth.into(),
        }
    }
}
