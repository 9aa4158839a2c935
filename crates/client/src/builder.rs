//! Builder pattern for constructing a [`Client`].

use std::sync::Arc;
use std::time::Duration;

use warden_proto::{
    AclProvider, AuthInfo, CompressionProvider, DefaultAclProvider, Error, GzipCompression,
    LoggingTracer, Result, TracerDriver,
};

use crate::client::{Client, ClientParts};
use crate::config::ClientConfig;
use crate::dialer::Dialer;
use crate::ensemble::{EnsembleProvider, FixedEnsemble};
use crate::retry::{ExponentialBackoffRetry, RetryPolicy};

/// Fluent builder for [`Client`].
///
/// Every collaborator except the dialer and the connection target has a
/// default: jittered exponential back-off, open ACLs, gzip payload
/// compression, and a `tracing`-backed tracer.
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use warden_client::Client;
/// # fn example(dialer: Arc<dyn warden_client::Dialer>) -> warden_proto::Result<Client> {
/// Client::builder()
///     .connection_string("host1:2181,host2:2181")
///     .dialer(dialer)
///     .session_timeout(std::time::Duration::from_secs(30))
///     .namespace("tenant-a")
///     .build()
/// # }
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    ensemble: Option<Arc<dyn EnsembleProvider>>,
    dialer: Option<Arc<dyn Dialer>>,
    retry_policy: Arc<dyn RetryPolicy>,
    acl_provider: Arc<dyn AclProvider>,
    compression: Arc<dyn CompressionProvider>,
    tracer: Arc<dyn TracerDriver>,
    auth_infos: Vec<AuthInfo>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            ensemble: None,
            dialer: None,
            retry_policy: Arc::new(ExponentialBackoffRetry::default()),
            acl_provider: Arc::new(DefaultAclProvider),
            compression: Arc::new(GzipCompression),
            tracer: Arc::new(LoggingTracer),
            auth_infos: Vec::new(),
        }
    }

    // ── Connection target ────────────────────────────────────────────

    /// Dial a fixed set of hosts (shorthand for a [`FixedEnsemble`]).
    pub fn connection_string(mut self, hosts: impl Into<String>) -> Self {
        self.ensemble = Some(Arc::new(FixedEnsemble::new(hosts)));
        self
    }

    /// Supply a provider that tracks ensemble membership itself.
    pub fn ensemble_provider(mut self, provider: Arc<dyn EnsembleProvider>) -> Self {
        self.ensemble = Some(provider);
        self
    }

    /// Set the transport dialer. Required.
    pub fn dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    // ── Timeouts & behavior ──────────────────────────────────────────

    /// Replace the whole config in one call.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Session timeout negotiated on dial (default 60s).
    pub fn session_timeout(mut self, d: Duration) -> Self {
        self.config.session_timeout = d;
        self
    }

    /// How long to wait for a fresh connection (default 15s).
    pub fn connection_timeout(mut self, d: Duration) -> Self {
        self.config.connection_timeout = d;
        self
    }

    /// Upper bound on shutdown waiting for background work (default 1s).
    pub fn max_close_wait(mut self, d: Duration) -> Self {
        self.config.max_close_wait = d;
        self
    }

    /// Payload for creates that supply no data (default empty).
    pub fn default_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.config.default_data = data.into();
        self
    }

    /// Chroot-style prefix applied to application paths.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// Accept a read-only session while the ensemble has no quorum.
    pub fn can_be_read_only(mut self, value: bool) -> Self {
        self.config.can_be_read_only = value;
        self
    }

    /// Add a credential applied to every session, including redials.
    pub fn add_auth(mut self, scheme: impl Into<String>, auth: impl Into<Vec<u8>>) -> Self {
        self.auth_infos.push(AuthInfo::new(scheme, auth));
        self
    }

    // ── Collaborators ────────────────────────────────────────────────

    pub fn retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn acl_provider(mut self, provider: Arc<dyn AclProvider>) -> Self {
        self.acl_provider = provider;
        self
    }

    pub fn compression_provider(mut self, provider: Arc<dyn CompressionProvider>) -> Self {
        self.compression = provider;
        self
    }

    pub fn tracer(mut self, tracer: Arc<dyn TracerDriver>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Build the [`Client`].
    pub fn build(self) -> Result<Client> {
        let dialer = self
            .dialer
            .ok_or_else(|| Error::Config("a dialer is required".into()))?;
        let ensemble = self.ensemble.ok_or_else(|| {
            Error::Config("an ensemble provider or connection string is required".into())
        })?;

        if let Some(ns) = &self.config.namespace {
            if ns.is_empty() || ns.starts_with('/') || ns.ends_with('/') {
                return Err(Error::Config(format!("invalid namespace: {ns:?}")));
            }
        }

        Ok(Client::from_parts(ClientParts {
            config: self.config,
            ensemble,
            dialer,
            retry_policy: self.retry_policy,
            acl_provider: self.acl_provider,
            compression: self.compression,
            tracer: self.tracer,
            auth_infos: self.auth_infos,
        }))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
