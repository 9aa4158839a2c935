//! Shared error type used across all Warden crates.

/// Errors surfaced by the client layer and its collaborators.
///
/// The retry wrapper in `warden-client` treats [`Error::is_recoverable`]
/// as the single classification authority: connection-level failures may
/// be retried, everything else passes through to the caller unchanged.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // ── Bootstrap ────────────────────────────────────────────────

    /// The ensemble provider or dialer failed during `start()`.
    /// Fatal to that start call; the caller decides whether to retry.
    #[error("start: {0}")]
    Start(String),

    /// Invalid construction-time configuration.
    #[error("config: {0}")]
    Config(String),

    // ── Connection (recoverable) ─────────────────────────────────

    #[error("connection loss")]
    ConnectionLoss,

    #[error("operation timeout")]
    OperationTimeout,

    #[error("session expired")]
    SessionExpired,

    #[error("session moved to another server")]
    SessionMoved,

    // ── Precondition (never retried) ─────────────────────────────

    #[error("node already exists: {0}")]
    NodeExists(String),

    #[error("no node: {0}")]
    NoNode(String),

    #[error("bad version: {0}")]
    BadVersion(String),

    #[error("node has children: {0}")]
    NotEmpty(String),

    #[error("not authenticated")]
    NoAuth,

    #[error("invalid ACL: {0}")]
    InvalidAcl(String),

    #[error("invalid path: {0}")]
    BadPath(String),

    // ── Lifecycle ────────────────────────────────────────────────

    /// Operation attempted after the client was closed.
    #[error("client closed")]
    Closed,

    // ── Passthrough ──────────────────────────────────────────────

    #[error("compression: {0}")]
    Compression(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Whether this failure is about the channel rather than the
    /// operation's semantics, and may therefore be retried against a
    /// fresh (or recovered) connection.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ConnectionLoss
                | Error::OperationTimeout
                | Error::SessionExpired
                | Error::SessionMoved
        )
    }

    /// Whether this is a logical precondition failure (already-exists,
    /// no-node, bad-version, ...). Retrying these would mask bugs and
    /// risk duplicate side effects, so the retry wrapper never does.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::NodeExists(_)
                | Error::NoNode(_)
                | Error::BadVersion(_)
                | Error::NotEmpty(_)
                | Error::NoAuth
                | Error::InvalidAcl(_)
                | Error::BadPath(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_recoverable() {
        assert!(Error::ConnectionLoss.is_recoverable());
        assert!(Error::OperationTimeout.is_recoverable());
        assert!(Error::SessionExpired.is_recoverable());
        assert!(Error::SessionMoved.is_recoverable());
    }

    #[test]
    fn precondition_errors_are_not_recoverable() {
        for err in [
            Error::NodeExists("/a".into()),
            Error::NoNode("/a".into()),
            Error::BadVersion("/a".into()),
            Error::NotEmpty("/a".into()),
            Error::NoAuth,
        ] {
            assert!(!err.is_recoverable(), "{err} must not be retried");
            assert!(err.is_precondition());
        }
    }

    #[test]
    fn lifecycle_and_bootstrap_are_neither() {
        for err in [Error::Closed, Error::Start("boom".into())] {
            assert!(!err.is_recoverable());
            assert!(!err.is_precondition());
        }
    }
}
