//! The dial seam — how the client obtains a fresh connection plus the
//! session-event channel that reports its lifecycle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use warden_proto::{Connection, Result, SessionEvent};

/// Receiver half of the per-connection session-event channel. Owned by
/// the client's background loop for the lifetime of the connection and
/// considered invalid once that connection is replaced or closed.
pub type SessionEvents = mpsc::Receiver<SessionEvent>;

/// Opens a transport-level connection to the ensemble.
///
/// The returned event channel must deliver session-state transitions for
/// the returned connection only; the driver closes its sender half when
/// the connection dies permanently.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(
        &self,
        connection_string: &str,
        session_timeout: Duration,
        can_be_read_only: bool,
    ) -> Result<(Arc<dyn Connection>, SessionEvents)>;
}
