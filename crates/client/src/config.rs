//! Construction-time client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_CLOSE_WAIT: Duration = Duration::from_secs(1);

/// Plain-value configuration for a [`Client`](crate::Client), immutable
/// after construction. No environment or CLI coupling at this layer —
/// hosts embed this struct in their own config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Session timeout negotiated with the server on dial.
    pub session_timeout: Duration,
    /// How long to wait for a fresh connection to become usable.
    pub connection_timeout: Duration,
    /// Upper bound on how long `close()` blocks waiting for background
    /// work to settle before abandoning it.
    pub max_close_wait: Duration,
    /// Payload used by higher layers when a create supplies no data.
    pub default_data: Vec<u8>,
    /// Chroot-style prefix applied to application paths.
    pub namespace: Option<String>,
    /// Whether a read-only session is acceptable while the ensemble has
    /// no quorum.
    pub can_be_read_only: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            max_close_wait: DEFAULT_CLOSE_WAIT,
            default_data: Vec::new(),
            namespace: None,
            can_be_read_only: false,
        }
    }
}
