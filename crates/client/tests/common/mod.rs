//! In-process fakes for driving the real client: a scriptable
//! connection, a dialer that hands session handles back to the test,
//! and a membership-switchable ensemble provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use warden_client::{Dialer, EnsembleProvider, RetryPolicy, RetrySleeper, SessionEvents};
use warden_proto::{
    open_acl_unsafe, Acl, Connection, CreateMode, Error, MultiOp, MultiResult, Result,
    SessionEvent, Stat, Watch,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// FakeConnection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Scriptable in-memory connection. Tests can inject connection losses,
/// make `exists` lie, or deny creates to exercise specific retry paths.
#[derive(Default)]
pub struct FakeConnection {
    pub nodes: Mutex<HashMap<String, Vec<u8>>>,
    pub create_calls: Mutex<Vec<String>>,
    pub exists_calls: Mutex<Vec<String>>,
    pub auth_calls: Mutex<Vec<(String, Vec<u8>)>>,
    /// Upcoming operations that fail with `ConnectionLoss`.
    fail_next: AtomicUsize,
    /// Upcoming `exists` calls that report "not found" regardless.
    exists_lies: AtomicUsize,
    /// While set, every create is denied with `NoAuth`.
    pub deny_creates: AtomicBool,
    pub closed: AtomicBool,
    pub panic_on_close: AtomicBool,
}

impl FakeConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `n` operations with `ConnectionLoss`.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` `exists` calls report "not found" even for
    /// nodes that exist — simulates losing a create race.
    pub fn lie_about_exists(&self, n: usize) {
        self.exists_lies.store(n, Ordering::SeqCst);
    }

    fn gate(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ConnectionLoss);
        }
        let failed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            Err(Error::ConnectionLoss)
        } else {
            Ok(())
        }
    }

    fn never_firing_watch() -> Watch {
        let (tx, rx) = oneshot::channel();
        std::mem::forget(tx);
        rx
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn add_auth(&self, scheme: &str, auth: &[u8]) -> Result<()> {
        self.gate()?;
        self.auth_calls.lock().push((scheme.into(), auth.to_vec()));
        Ok(())
    }

    async fn create(
        &self,
        path: &str,
        data: &[u8],
        _mode: CreateMode,
        _acls: &[Acl],
    ) -> Result<String> {
        self.gate()?;
        if self.deny_creates.load(Ordering::SeqCst) {
            return Err(Error::NoAuth);
        }
        let mut nodes = self.nodes.lock();
        if nodes.contains_key(path) {
            return Err(Error::NodeExists(path.into()));
        }
        nodes.insert(path.into(), data.to_vec());
        self.create_calls.lock().push(path.into());
        Ok(path.into())
    }

    async fn exists(&self, path: &str) -> Result<Option<Stat>> {
        self.gate()?;
        self.exists_calls.lock().push(path.into());
        let lied = self
            .exists_lies
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lied {
            return Ok(None);
        }
        Ok(self.nodes.lock().contains_key(path).then(Stat::default))
    }

    async fn exists_watch(&self, path: &str) -> Result<(Option<Stat>, Watch)> {
        let stat = self.exists(path).await?;
        Ok((stat, Self::never_firing_watch()))
    }

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat)> {
        self.gate()?;
        match self.nodes.lock().get(path) {
            Some(data) => Ok((data.clone(), Stat::default())),
            None => Err(Error::NoNode(path.into())),
        }
    }

    async fn get_watch(&self, path: &str) -> Result<(Vec<u8>, Stat, Watch)> {
        let (data, stat) = self.get(path).await?;
        Ok((data, stat, Self::never_firing_watch()))
    }

    async fn set(&self, path: &str, data: &[u8], _version: i32) -> Result<Stat> {
        self.gate()?;
        match self.nodes.lock().get_mut(path) {
            Some(existing) => {
                *existing = data.to_vec();
                Ok(Stat::default())
            }
            None => Err(Error::NoNode(path.into())),
        }
    }

    async fn delete(&self, path: &str, _version: i32) -> Result<()> {
        self.gate()?;
        match self.nodes.lock().remove(path) {
            Some(_) => Ok(()),
            None => Err(Error::NoNode(path.into())),
        }
    }

    async fn children(&self, path: &str) -> Result<(Vec<String>, Stat)> {
        self.gate()?;
        let nodes = self.nodes.lock();
        if path != "/" && !nodes.contains_key(path) {
            return Err(Error::NoNode(path.into()));
        }
        let prefix = if path == "/" { String::from("/") } else { format!("{path}/") };
        let children = nodes
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(String::from)
            .collect();
        Ok((children, Stat::default()))
    }

    async fn children_watch(&self, path: &str) -> Result<(Vec<String>, Stat, Watch)> {
        let (children, stat) = self.children(path).await?;
        Ok((children, stat, Self::never_firing_watch()))
    }

    async fn get_acl(&self, path: &str) -> Result<(Vec<Acl>, Stat)> {
        self.gate()?;
        if self.nodes.lock().contains_key(path) {
            Ok((open_acl_unsafe(), Stat::default()))
        } else {
            Err(Error::NoNode(path.into()))
        }
    }

    async fn set_acl(&self, path: &str, _acls: &[Acl], _version: i32) -> Result<Stat> {
        self.gate()?;
        if self.nodes.lock().contains_key(path) {
            Ok(Stat::default())
        } else {
            Err(Error::NoNode(path.into()))
        }
    }

    async fn multi(&self, ops: Vec<MultiOp>) -> Result<Vec<MultiResult>> {
        self.gate()?;
        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                MultiOp::Create { path, data, mode, acls } => {
                    let created = self.create(&path, &data, mode, &acls).await?;
                    results.push(MultiResult::Created { path: created });
                }
                MultiOp::SetData { path, data, version } => {
                    let stat = self.set(&path, &data, version).await?;
                    results.push(MultiResult::SetData { stat });
                }
                MultiOp::Delete { path, version } => {
                    self.delete(&path, version).await?;
                    results.push(MultiResult::Deleted);
                }
                MultiOp::Check { path, .. } => {
                    if !self.nodes.lock().contains_key(&path) {
                        return Err(Error::NoNode(path));
                    }
                    results.push(MultiResult::Checked);
                }
            }
        }
        Ok(results)
    }

    async fn sync(&self, path: &str) -> Result<String> {
        self.gate()?;
        Ok(path.into())
    }

    async fn close(&self) {
        if self.panic_on_close.load(Ordering::SeqCst) {
            panic!("intentional panic in connection close");
        }
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// FakeDialer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Handle to one dialed session: the connection the client received and
/// the sender half of its event channel.
pub struct DialedSession {
    pub conn: Arc<FakeConnection>,
    pub events: mpsc::Sender<SessionEvent>,
    pub connection_string: String,
}

impl DialedSession {
    pub fn auth_calls(&self) -> Vec<(String, Vec<u8>)> {
        self.conn.auth_calls.lock().clone()
    }
}

/// Dialer that mints a fresh [`FakeConnection`] per dial and hands the
/// test a [`DialedSession`] for each one.
pub struct FakeDialer {
    notify: mpsc::Sender<DialedSession>,
    fail_dials: AtomicUsize,
}

impl FakeDialer {
    pub fn new() -> (Arc<Self>, mpsc::Receiver<DialedSession>) {
        let (notify, dialed) = mpsc::channel(8);
        (
            Arc::new(Self {
                notify,
                fail_dials: AtomicUsize::new(0),
            }),
            dialed,
        )
    }

    /// Fail the next `n` dial attempts.
    pub fn fail_dials(&self, n: usize) {
        self.fail_dials.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl Dialer for FakeDialer {
    async fn dial(
        &self,
        connection_string: &str,
        _session_timeout: Duration,
        _can_be_read_only: bool,
    ) -> Result<(Arc<dyn Connection>, SessionEvents)> {
        let failed = self
            .fail_dials
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::ConnectionLoss);
        }
        let conn = FakeConnection::new();
        let (events_tx, events_rx) = mpsc::channel(16);
        let _ = self
            .notify
            .send(DialedSession {
                conn: conn.clone(),
                events: events_tx,
                connection_string: connection_string.into(),
            })
            .await;
        Ok((conn, events_rx))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TrackingEnsemble
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Ensemble provider whose connection string the test can change
/// mid-flight, recording lifecycle calls.
pub struct TrackingEnsemble {
    connection_string: Mutex<String>,
    pub started: AtomicBool,
    pub closed: AtomicBool,
}

impl TrackingEnsemble {
    pub fn new(connection_string: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            connection_string: Mutex::new(connection_string.into()),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    pub fn set_connection_string(&self, connection_string: impl Into<String>) {
        *self.connection_string.lock() = connection_string.into();
    }
}

#[async_trait]
impl EnsembleProvider for TrackingEnsemble {
    async fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn connection_string(&self) -> String {
        self.connection_string.lock().clone()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CountingPolicy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Wraps a policy and counts how often the client consults it.
pub struct CountingPolicy<P> {
    pub consulted: AtomicUsize,
    inner: P,
}

impl<P: RetryPolicy> CountingPolicy<P> {
    pub fn new(inner: P) -> Arc<Self> {
        Arc::new(Self {
            consulted: AtomicUsize::new(0),
            inner,
        })
    }
}

#[async_trait]
impl<P: RetryPolicy> RetryPolicy for CountingPolicy<P> {
    async fn allow_retry(
        &self,
        retry_count: usize,
        elapsed: Duration,
        sleeper: &dyn RetrySleeper,
    ) -> bool {
        self.consulted.fetch_add(1, Ordering::SeqCst);
        self.inner.allow_retry(retry_count, elapsed, sleeper).await
    }
}

// ── Misc helpers ─────────────────────────────────────────────────────

/// Install a subscriber once so `RUST_LOG=debug cargo test` shows the
/// client's tracing output.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
