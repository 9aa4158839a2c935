//! Core client — owns the live connection, reacts to session lifecycle
//! events, and executes operations through the retry wrapper.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use warden_proto::{
    AclProvider, AuthInfo, CompressionProvider, Connection, Error, Result, SessionState,
    TracerDriver,
};

use crate::config::ClientConfig;
use crate::dialer::{Dialer, SessionEvents};
use crate::ensemble::EnsembleProvider;
use crate::retry::{RetryPolicy, TokioSleeper};

/// Delay between redial attempts while re-establishing an expired
/// session. The caller-facing RetryPolicy governs caller operations,
/// not this background cadence.
const REDIAL_DELAY: Duration = Duration::from_secs(1);

/// Client lifecycle states. `Suspended` means the transport reports the
/// session temporarily unreachable but not expired — operations keep
/// retrying under the policy rather than failing fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Stopped,
    Starting,
    Connected,
    Suspended,
}

/// The connection currently owned by the client. Replaced, never
/// mutated, on reconnect; the generation tag makes each swap observable
/// in logs.
#[derive(Clone)]
struct Current {
    generation: u64,
    conn: Arc<dyn Connection>,
}

pub(crate) struct ClientParts {
    pub(crate) config: ClientConfig,
    pub(crate) ensemble: Arc<dyn EnsembleProvider>,
    pub(crate) dialer: Arc<dyn Dialer>,
    pub(crate) retry_policy: Arc<dyn RetryPolicy>,
    pub(crate) acl_provider: Arc<dyn AclProvider>,
    pub(crate) compression: Arc<dyn CompressionProvider>,
    pub(crate) tracer: Arc<dyn TracerDriver>,
    pub(crate) auth_infos: Vec<AuthInfo>,
}

struct Shared {
    config: ClientConfig,
    ensemble: Arc<dyn EnsembleProvider>,
    dialer: Arc<dyn Dialer>,
    retry_policy: Arc<dyn RetryPolicy>,
    acl_provider: Arc<dyn AclProvider>,
    compression: Arc<dyn CompressionProvider>,
    tracer: Arc<dyn TracerDriver>,
    auth_infos: Vec<AuthInfo>,
    cancel: CancellationToken,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    current: RwLock<Option<Current>>,
    generation: AtomicU64,
    started: AtomicBool,
    closed: AtomicBool,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

/// Fault-tolerant handle to the coordination service.
///
/// Owns exactly one live [`Connection`] at a time, a background task
/// that drains its session events, and the retry-driven execution of
/// operations against it. Cheap to clone; all clones share the same
/// session.
///
/// Create via [`Client::builder`](crate::ClientBuilder), then `start()`
/// before issuing operations:
///
/// ```rust,no_run
/// # use warden_client::Client;
/// # async fn example(dialer: std::sync::Arc<dyn warden_client::Dialer>) -> warden_proto::Result<()> {
/// let client = Client::builder()
///     .connection_string("host1:2181,host2:2181")
///     .dialer(dialer)
///     .build()?;
/// client.start().await?;
/// let stat = client.call(|conn| async move { conn.exists("/services").await }).await?;
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish()
    }
}

impl Client {
    /// Start a new builder.
    pub fn builder() -> crate::builder::ClientBuilder {
        crate::builder::ClientBuilder::new()
    }

    pub(crate) fn from_parts(parts: ClientParts) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Stopped);
        Self {
            shared: Arc::new(Shared {
                config: parts.config,
                ensemble: parts.ensemble,
                dialer: parts.dialer,
                retry_policy: parts.retry_policy,
                acl_provider: parts.acl_provider,
                compression: parts.compression,
                tracer: parts.tracer,
                auth_infos: parts.auth_infos,
                cancel: CancellationToken::new(),
                state_tx,
                state_rx,
                current: RwLock::new(None),
                generation: AtomicU64::new(0),
                started: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                event_task: Mutex::new(None),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start the ensemble provider, dial the first connection, and spawn
    /// the background event loop.
    ///
    /// Failures here are fatal to this call and not retried internally;
    /// the caller decides whether to retry `start()` itself.
    pub async fn start(&self) -> Result<()> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Err(Error::Start("client already started".into()));
        }
        set_state(&self.shared, ConnectionState::Starting);

        if let Err(e) = self.shared.ensemble.start().await {
            return Err(Error::Start(format!("ensemble provider: {e}")));
        }

        let connection_string = self.shared.ensemble.connection_string();
        tracing::info!(connection_string = %connection_string, "connecting");

        let (conn, events) = match dial_once(&self.shared, &connection_string).await {
            Ok(pair) => pair,
            Err(e) => return Err(Error::Start(format!("dial: {e}"))),
        };

        if let Err(e) = apply_auth(&self.shared, conn.as_ref()).await {
            let _ = close_connection(conn).await;
            return Err(Error::Start(format!("add auth: {e}")));
        }

        install_connection(&self.shared, conn);
        let task = tokio::spawn(event_loop(self.shared.clone(), events));
        *self.shared.event_task.lock() = Some(task);
        set_state(&self.shared, ConnectionState::Connected);
        Ok(())
    }

    /// Shut down: stop the event loop (bounded by `max_close_wait`),
    /// close the connection, then the ensemble provider.
    ///
    /// Safe to call more than once. A panicking collaborator `close` is
    /// isolated so the remaining resources are still released; the first
    /// failure is reported after everything ran.
    pub async fn close(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!("closing client");
        set_state(&self.shared, ConnectionState::Stopped);
        self.shared.cancel.cancel();

        let task = self.shared.event_task.lock().take();
        if let Some(task) = task {
            let abort = task.abort_handle();
            if tokio::time::timeout(self.shared.config.max_close_wait, task)
                .await
                .is_err()
            {
                tracing::warn!("event loop did not stop within close wait, abandoning");
                abort.abort();
            }
        }

        let mut first_err: Option<Error> = None;

        let current = self.shared.current.write().take();
        if let Some(current) = current {
            if let Err(e) = close_connection(current.conn).await {
                tracing::error!(error = %e, "connection close failed");
                first_err.get_or_insert(e);
            }
        }

        match AssertUnwindSafe(self.shared.ensemble.close()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "ensemble provider close failed");
                first_err.get_or_insert(e);
            }
            Err(_) => {
                tracing::error!("ensemble provider close panicked");
                first_err
                    .get_or_insert(Error::Other(anyhow::anyhow!("ensemble provider close panicked")));
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ── Connection access ────────────────────────────────────────────

    /// The live connection. Safe to call concurrently with a reconnect
    /// swap — callers observe either the old or the new reference, never
    /// a half-updated one.
    pub fn connection(&self) -> Result<Arc<dyn Connection>> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        if !self.shared.started.load(Ordering::SeqCst) {
            return Err(Error::Start("client not started".into()));
        }
        match &*self.shared.current.read() {
            Some(current) => Ok(current.conn.clone()),
            // between expiry teardown and redial
            None => Err(Error::ConnectionLoss),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_rx.borrow()
    }

    /// Wait until the client reports `Connected`, bounded by `timeout`.
    /// Returns `Ok(false)` on timeout and `Error::Closed` if the client
    /// shuts down while waiting.
    pub async fn block_until_connected(&self, timeout: Duration) -> Result<bool> {
        let mut rx = self.shared.state_rx.clone();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.shared.closed.load(Ordering::SeqCst) {
                return Err(Error::Closed);
            }
            if *rx.borrow_and_update() == ConnectionState::Connected {
                return Ok(true);
            }
            tokio::select! {
                _ = self.shared.cancel.cancelled() => return Err(Error::Closed),
                changed = tokio::time::timeout_at(deadline, rx.changed()) => match changed {
                    Ok(Ok(())) => continue,
                    Ok(Err(_)) => return Err(Error::Closed),
                    Err(_) => return Ok(false),
                },
            }
        }
    }

    // ── Retry-driven execution ───────────────────────────────────────

    /// Execute one logical operation against the current connection,
    /// transparently retrying recoverable connection failures under the
    /// configured [`RetryPolicy`].
    ///
    /// Precondition failures (already-exists, no-node, bad-version, ...)
    /// are the operation's logical outcome and return after exactly one
    /// attempt. Closing the client unblocks a caller mid-retry with
    /// `Error::Closed`.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(Arc<dyn Connection>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let sleeper = TokioSleeper::new(self.shared.cancel.clone());
        let started_at = Instant::now();
        let mut retry_count: usize = 0;

        loop {
            if self.shared.closed.load(Ordering::SeqCst) {
                return Err(Error::Closed);
            }

            // A suspended session usually recovers on its own; give the
            // background loop a bounded window before burning an attempt.
            if retry_count > 0 && self.state() == ConnectionState::Suspended {
                if let Err(e @ Error::Closed) = self
                    .block_until_connected(self.shared.config.connection_timeout)
                    .await
                {
                    return Err(e);
                }
            }

            let attempt = match self.connection() {
                Ok(conn) => op(conn).await,
                Err(e) => Err(e),
            };

            match attempt {
                Ok(value) => {
                    self.shared.tracer.add_time("retry-loop", started_at.elapsed());
                    return Ok(value);
                }
                Err(Error::Closed) => return Err(Error::Closed),
                Err(e) if e.is_recoverable() => {
                    tracing::debug!(error = %e, retry_count, "connection-level failure");
                    let allowed = self
                        .shared
                        .retry_policy
                        .allow_retry(retry_count, started_at.elapsed(), &sleeper)
                        .await;
                    if self.shared.closed.load(Ordering::SeqCst) {
                        return Err(Error::Closed);
                    }
                    if !allowed {
                        self.shared.tracer.add_count("retries-disallowed", 1);
                        tracing::warn!(error = %e, retry_count, "giving up after retries");
                        return Err(e);
                    }
                    self.shared.tracer.add_count("retries-allowed", 1);
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ── Configuration & collaborators ────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Payload higher layers use when a create supplies no data.
    pub fn default_data(&self) -> &[u8] {
        &self.shared.config.default_data
    }

    pub fn acl_provider(&self) -> Arc<dyn AclProvider> {
        self.shared.acl_provider.clone()
    }

    pub fn compression_provider(&self) -> Arc<dyn CompressionProvider> {
        self.shared.compression.clone()
    }

    pub fn tracer(&self) -> Arc<dyn TracerDriver> {
        self.shared.tracer.clone()
    }

    /// Prefix an application path with the configured namespace.
    pub fn namespaced_path(&self, path: &str) -> String {
        apply_namespace(self.shared.config.namespace.as_deref(), path)
    }
}

pub(crate) fn apply_namespace(namespace: Option<&str>, path: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => {
            if path == "/" {
                format!("/{ns}")
            } else {
                format!("/{ns}{path}")
            }
        }
        _ => path.to_string(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Background event loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Single consumer of the session-event channel for the life of the
/// current connection. Reconnecting swaps in the next channel in place.
async fn event_loop(shared: Arc<Shared>, mut events: SessionEvents) {
    loop {
        let event = tokio::select! {
            _ = shared.cancel.cancelled() => return,
            event = events.recv() => event,
        };

        match event {
            None => {
                // Driver dropped its sender half: the connection is gone
                // and no further events, including Expired, can arrive.
                tracing::warn!("session event channel closed, treating as session loss");
                shared.tracer.add_count("session-lost", 1);
                set_state(&shared, ConnectionState::Suspended);
                teardown_current(&shared).await;
                match reconnect(&shared).await {
                    Some(next) => events = next,
                    None => return,
                }
            }
            Some(event) => {
                tracing::debug!(state = ?event.state, error = ?event.error, "session event");
                match event.state {
                    SessionState::Connected | SessionState::ReadOnly => {
                        set_state(&shared, ConnectionState::Connected);
                    }
                    SessionState::Connecting | SessionState::Disconnected => {
                        shared.tracer.add_count("connection-suspended", 1);
                        set_state(&shared, ConnectionState::Suspended);
                    }
                    SessionState::Expired => {
                        tracing::warn!("session expired, establishing a fresh session");
                        shared.tracer.add_count("session-expired", 1);
                        set_state(&shared, ConnectionState::Suspended);
                        teardown_current(&shared).await;
                        match reconnect(&shared).await {
                            Some(next) => events = next,
                            None => return,
                        }
                    }
                    SessionState::AuthFailed => {
                        tracing::error!("session authentication failed");
                    }
                }
            }
        }
    }
}

async fn teardown_current(shared: &Shared) {
    let stale = shared.current.write().take();
    if let Some(stale) = stale {
        tracing::debug!(generation = stale.generation, "discarding stale connection");
        if let Err(e) = close_connection(stale.conn).await {
            tracing::warn!(error = %e, "stale connection close failed");
        }
    }
}

/// Redial until success or shutdown. Returns the new event channel, or
/// `None` when the client is shutting down.
async fn reconnect(shared: &Arc<Shared>) -> Option<SessionEvents> {
    loop {
        if shared.cancel.is_cancelled() {
            return None;
        }

        // Membership may have changed while the session was away.
        let connection_string = shared.ensemble.connection_string();
        tracing::info!(connection_string = %connection_string, "redialing");

        match dial_once(shared, &connection_string).await {
            Ok((conn, events)) => {
                if let Err(e) = apply_auth(shared, conn.as_ref()).await {
                    tracing::warn!(error = %e, "auth on fresh session failed, redialing");
                    let _ = close_connection(conn).await;
                } else {
                    install_connection(shared, conn);
                    set_state(shared, ConnectionState::Connected);
                    shared.tracer.add_count("session-reestablished", 1);
                    return Some(events);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "redial failed");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(REDIAL_DELAY) => {}
            _ = shared.cancel.cancelled() => return None,
        }
    }
}

// ── Shared helpers ───────────────────────────────────────────────────

async fn dial_once(
    shared: &Shared,
    connection_string: &str,
) -> Result<(Arc<dyn Connection>, SessionEvents)> {
    match tokio::time::timeout(
        shared.config.connection_timeout,
        shared.dialer.dial(
            connection_string,
            shared.config.session_timeout,
            shared.config.can_be_read_only,
        ),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(Error::OperationTimeout),
    }
}

/// A fresh session starts unauthenticated; re-apply every configured
/// credential.
async fn apply_auth(shared: &Shared, conn: &dyn Connection) -> Result<()> {
    for auth in &shared.auth_infos {
        conn.add_auth(&auth.scheme, &auth.auth).await?;
    }
    Ok(())
}

fn install_connection(shared: &Shared, conn: Arc<dyn Connection>) {
    let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::debug!(generation, "installing connection");
    *shared.current.write() = Some(Current { generation, conn });
}

/// Close a connection, isolating a panicking implementation so cleanup
/// of the remaining resources can proceed.
async fn close_connection(conn: Arc<dyn Connection>) -> Result<()> {
    match AssertUnwindSafe(conn.close()).catch_unwind().await {
        Ok(()) => Ok(()),
        Err(_) => Err(Error::Other(anyhow::anyhow!("connection close panicked"))),
    }
}

fn set_state(shared: &Shared, state: ConnectionState) {
    shared.state_tx.send_if_modified(|current| {
        if *current == state {
            false
        } else {
            tracing::debug!(from = ?*current, to = ?state, "state change");
            *current = state;
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_prefixes_paths() {
        assert_eq!(apply_namespace(Some("tenant"), "/a/b"), "/tenant/a/b");
        assert_eq!(apply_namespace(Some("tenant"), "/"), "/tenant");
        assert_eq!(apply_namespace(None, "/a/b"), "/a/b");
        assert_eq!(apply_namespace(Some(""), "/a/b"), "/a/b");
    }
}
