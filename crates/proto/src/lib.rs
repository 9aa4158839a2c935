//! `warden-proto` — data model and collaborator surface for the Warden
//! coordination-service client.
//!
//! This crate defines everything the fault-tolerant client layer in
//! `warden-client` consumes but does not own: node metadata and ACL types,
//! session/watch events, the [`Connection`] trait over the raw protocol
//! driver, and the pluggable collaborator traits (ACL source, payload
//! compression, tracing sink).
//!
//! The wire encoding itself lives behind the [`Connection`] trait — a
//! production driver implements it once, tests substitute in-process fakes.

pub mod connection;
pub mod data;
pub mod error;
pub mod event;
pub mod providers;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use connection::{Connection, MultiOp, MultiResult};
pub use data::{
    creator_all_acl, open_acl_unsafe, read_acl_unsafe, Acl, AuthInfo, CreateMode, Stat, PERM_ALL,
    PERM_ADMIN, PERM_CREATE, PERM_DELETE, PERM_READ, PERM_WRITE,
};
pub use error::{Error, Result};
pub use event::{SessionEvent, SessionState, Watch, WatchEventKind, WatchedEvent};
pub use providers::{
    AclProvider, CompressionProvider, DefaultAclProvider, GzipCompression, LoggingTracer,
    TracerDriver,
};
