//! Session and watch events delivered by the protocol driver.

use serde::{Deserialize, Serialize};

/// Session lifecycle states as reported on the dial-time event channel.
///
/// `Disconnected` means the transport is temporarily unreachable but the
/// session may still be alive server-side; `Expired` is terminal for the
/// connection that reported it and forces a full redial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Connecting,
    Connected,
    Disconnected,
    Expired,
    ReadOnly,
    AuthFailed,
}

/// One discrete event on the session channel.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub state: SessionState,
    /// Driver-reported detail, when the transition was caused by an error.
    pub error: Option<String>,
}

impl SessionEvent {
    pub fn new(state: SessionState) -> Self {
        Self { state, error: None }
    }
}

/// What changed under a node watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEventKind {
    NodeCreated,
    NodeDeleted,
    NodeDataChanged,
    NodeChildrenChanged,
}

/// A one-shot notification that a watched node changed.
#[derive(Debug, Clone)]
pub struct WatchedEvent {
    pub kind: WatchEventKind,
    pub path: String,
}

/// Receiver half of a single-fire node watch. Fires at most once; the
/// watch is invalidated when the session that set it expires.
pub type Watch = tokio::sync::oneshot::Receiver<WatchedEvent>;
