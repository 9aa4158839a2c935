//! Ensemble providers — where the client learns which hosts to dial.

use async_trait::async_trait;

use warden_proto::Result;

/// Supplies the current connection string for the coordination cluster.
///
/// Implementations may be static or may watch cluster membership and
/// return different strings over time; the client re-reads the string
/// before every redial. Has an explicit lifecycle: `start` is called
/// during client start, `close` during client close.
#[async_trait]
pub trait EnsembleProvider: Send + Sync {
    async fn start(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    fn connection_string(&self) -> String;
}

/// Ensemble provider backed by a fixed connection string.
#[derive(Debug, Clone)]
pub struct FixedEnsemble {
    connection_string: String,
}

impl FixedEnsemble {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }
}

#[async_trait]
impl EnsembleProvider for FixedEnsemble {
    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn connection_string(&self) -> String {
        self.connection_string.clone()
    }
}
