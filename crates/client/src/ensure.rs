//! Idempotent recursive node creation — the primitive almost every
//! higher-level recipe leans on before it creates its own nodes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use warden_proto::{AclProvider, CreateMode, Error, Result};

use crate::client::Client;

/// Guarantees a path and all its ancestors exist, tolerating races with
/// other clients creating the same nodes.
///
/// Clones share the ensured-marker, so callers referencing the same
/// logical path short-circuit together once any of them succeeds. The
/// marker is a lazily-confirmed existence cache, not a guard against
/// concurrent external deletion.
#[derive(Clone)]
pub struct EnsurePath {
    path: String,
    make_last_node: bool,
    acl_provider: Option<Arc<dyn AclProvider>>,
    ensured: Arc<AtomicBool>,
}

impl EnsurePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            make_last_node: true,
            acl_provider: None,
            ensured: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use a specific ACL source instead of the client's.
    pub fn with_acl_provider(mut self, provider: Arc<dyn AclProvider>) -> Self {
        self.acl_provider = Some(provider);
        self
    }

    /// Variant over the same path whose `ensure` stops one component
    /// short — for callers about to create the final node themselves
    /// with specific data and ACLs.
    ///
    /// The variant carries its own fresh marker: an ancestors-only walk
    /// confirms a different prefix than the full walk.
    pub fn excluding_last(&self) -> Self {
        Self {
            path: self.path.clone(),
            make_last_node: false,
            acl_provider: self.acl_provider.clone(),
            ensured: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Walk the path parents-first, creating whatever is missing.
    ///
    /// `NodeExists` from the create call counts as success — a
    /// concurrent ensurer won the race. Nobody verifies the winner wrote
    /// compatible content; the existing node stands as-is.
    ///
    /// Only a fully successful walk populates the cache. Any other
    /// failure aborts, surfaces to the caller, and leaves the marker
    /// unset so a later call retries the whole path.
    pub async fn ensure(&self, client: &Client) -> Result<()> {
        if self.ensured.load(Ordering::Acquire) {
            return Ok(());
        }

        let components = split_path(&self.path)?;
        let upto = if self.make_last_node {
            components.len()
        } else {
            components.len().saturating_sub(1)
        };

        let acl_provider = self
            .acl_provider
            .clone()
            .unwrap_or_else(|| client.acl_provider());

        let mut node = String::new();
        for component in &components[..upto] {
            node.push('/');
            node.push_str(component);
            ensure_node(client, acl_provider.as_ref(), &node).await?;
        }

        self.ensured.store(true, Ordering::Release);
        Ok(())
    }
}

/// Existence check, then create-if-absent, through the retry wrapper.
async fn ensure_node(client: &Client, acl_provider: &dyn AclProvider, path: &str) -> Result<()> {
    let acls = acl_provider.acl_for_path(path);
    client
        .call(|conn| {
            let path = path.to_string();
            let acls = acls.clone();
            async move {
                if conn.exists(&path).await?.is_some() {
                    return Ok(());
                }
                match conn.create(&path, &[], CreateMode::Persistent, &acls).await {
                    Ok(_) => Ok(()),
                    // a concurrent creator won the race
                    Err(Error::NodeExists(_)) => Ok(()),
                    Err(e) => Err(e),
                }
            }
        })
        .await
}

/// Split an absolute path into its components. The parent-before-child
/// walk depends on the ordering this produces.
pub(crate) fn split_path(path: &str) -> Result<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(Error::BadPath(format!("path must be absolute: {path:?}")));
    }
    if path.len() > 1 && path.ends_with('/') {
        return Err(Error::BadPath(format!(
            "path must not end with a slash: {path:?}"
        )));
    }
    if path == "/" {
        return Ok(Vec::new());
    }
    let components: Vec<&str> = path[1..].split('/').collect();
    if components.iter().any(|c| c.is_empty()) {
        return Err(Error::BadPath(format!("empty path component: {path:?}")));
    }
    Ok(components)
}
