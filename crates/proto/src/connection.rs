//! The `Connection` trait — the minimal surface the client layer needs
//! from a protocol driver.
//!
//! A production driver implements this once over the real wire protocol;
//! tests substitute in-process fakes. Watch variants return the same data
//! as their plain counterparts plus a one-shot [`Watch`] channel.

use async_trait::async_trait;

use crate::data::{Acl, CreateMode, Stat};
use crate::error::Result;
use crate::event::Watch;

/// One operation inside a multi-node transaction.
#[derive(Debug, Clone)]
pub enum MultiOp {
    Create {
        path: String,
        data: Vec<u8>,
        mode: CreateMode,
        acls: Vec<Acl>,
    },
    SetData {
        path: String,
        data: Vec<u8>,
        version: i32,
    },
    Delete {
        path: String,
        version: i32,
    },
    /// Assert a node is at the given version without modifying it.
    Check {
        path: String,
        version: i32,
    },
}

/// Per-operation outcome of a committed transaction, in submission order.
#[derive(Debug, Clone)]
pub enum MultiResult {
    Created { path: String },
    SetData { stat: Stat },
    Deleted,
    Checked,
}

/// Raw coordination-service operations over one live session.
///
/// Implementations must be safe to share across tasks; the client hands
/// out `Arc<dyn Connection>` clones and may close the instance from its
/// background loop while callers still hold references — operations on a
/// closed connection fail with a recoverable connection error.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Attach a credential to this session.
    async fn add_auth(&self, scheme: &str, auth: &[u8]) -> Result<()>;

    /// Create a node. Returns the created path, which differs from the
    /// requested one for sequential modes.
    async fn create(
        &self,
        path: &str,
        data: &[u8],
        mode: CreateMode,
        acls: &[Acl],
    ) -> Result<String>;

    async fn exists(&self, path: &str) -> Result<Option<Stat>>;

    async fn exists_watch(&self, path: &str) -> Result<(Option<Stat>, Watch)>;

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat)>;

    async fn get_watch(&self, path: &str) -> Result<(Vec<u8>, Stat, Watch)>;

    /// Overwrite a node's payload. `version` of `-1` bypasses the
    /// compare-and-set check.
    async fn set(&self, path: &str, data: &[u8], version: i32) -> Result<Stat>;

    async fn delete(&self, path: &str, version: i32) -> Result<()>;

    async fn children(&self, path: &str) -> Result<(Vec<String>, Stat)>;

    async fn children_watch(&self, path: &str) -> Result<(Vec<String>, Stat, Watch)>;

    async fn get_acl(&self, path: &str) -> Result<(Vec<Acl>, Stat)>;

    async fn set_acl(&self, path: &str, acls: &[Acl], version: i32) -> Result<Stat>;

    /// Commit every operation atomically; all succeed or none do.
    async fn multi(&self, ops: Vec<MultiOp>) -> Result<Vec<MultiResult>>;

    /// Flush the server's view of the path, so a subsequent read observes
    /// all writes acknowledged before the sync.
    async fn sync(&self, path: &str) -> Result<String>;

    /// Release the session. Infallible by contract, but the client still
    /// isolates panics from misbehaving implementations.
    async fn close(&self);
}
