//! `warden-client` — fault-tolerant client core for a tree-structured
//! coordination service.
//!
//! Turns a flaky, session-oriented connection into a dependable
//! primitive: the [`Client`] owns the physical connection, reacts to
//! session lifecycle events on a background task, retries recoverable
//! failures under a pluggable [`RetryPolicy`], and provides the
//! idempotent [`EnsurePath`] primitive that locks, elections, and
//! service discovery build on.
//!
//! # Architecture
//!
//! ```text
//! caller task                      background task
//! ───────────                      ───────────────
//! client.call(op) ──► retry loop   event loop ◄── session events
//!        │                │             │
//!        │     current connection ◄─ swap on expiry
//!        ▼                ▼             ▼
//!      result      Connection ◄──── Dialer.dial(EnsembleProvider)
//! ```
//!
//! # Connection flow
//!
//! 1. `start()`: EnsembleProvider.start → Dialer.dial → apply auth →
//!    spawn event loop → `Connected`
//! 2. Operations run through `call()`, which classifies failures:
//!    connection-level errors retry under the policy, precondition
//!    errors surface after one attempt
//! 3. On `Disconnected` the client suspends and keeps retrying; on
//!    `Expired` it closes the stale connection and redials with a
//!    freshly fetched connection string
//! 4. `close()` unblocks retrying callers, stops the event loop within
//!    `max_close_wait`, and releases every owned resource even when a
//!    collaborator's close panics

pub mod builder;
pub mod client;
pub mod config;
pub mod dialer;
pub mod ensemble;
pub mod ensure;
pub mod retry;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use builder::ClientBuilder;
pub use client::{Client, ConnectionState};
pub use config::{
    ClientConfig, DEFAULT_CLOSE_WAIT, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_SESSION_TIMEOUT,
};
pub use dialer::{Dialer, SessionEvents};
pub use ensemble::{EnsembleProvider, FixedEnsemble};
pub use ensure::EnsurePath;
pub use retry::{
    ExponentialBackoffRetry, RetryForever, RetryNTimes, RetryOneTime, RetryPolicy, RetrySleeper,
    RetryUntilElapsed, TokioSleeper,
};

// Re-export the protocol surface so hosts rarely import warden-proto
// directly.
pub use warden_proto as proto;
pub use warden_proto::{
    Acl, AclProvider, AuthInfo, CompressionProvider, Connection, CreateMode, Error, Result,
    SessionEvent, SessionState, Stat, TracerDriver, Watch, WatchedEvent,
};
