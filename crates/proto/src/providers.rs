//! Pluggable collaborators: ACL source, payload compression, and the
//! observability sink.
//!
//! The client core stores these and exposes them to higher layers; it
//! never interprets their output itself (except the retry wrapper, which
//! publishes timings to the [`TracerDriver`]).

use std::io::{Read, Write};
use std::time::Duration;

use crate::data::{open_acl_unsafe, Acl};
use crate::error::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ACL provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Supplies ACLs for node creation. Consulted per path so policies can
/// vary across the tree.
pub trait AclProvider: Send + Sync {
    fn default_acl(&self) -> Vec<Acl>;

    fn acl_for_path(&self, path: &str) -> Vec<Acl>;
}

/// Open-to-the-world ACLs everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAclProvider;

impl AclProvider for DefaultAclProvider {
    fn default_acl(&self) -> Vec<Acl> {
        open_acl_unsafe()
    }

    fn acl_for_path(&self, _path: &str) -> Vec<Acl> {
        open_acl_unsafe()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Compression provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-path payload transform applied by layers above the client core.
/// The path is passed so providers can compress selectively.
pub trait CompressionProvider: Send + Sync {
    fn compress(&self, path: &str, data: &[u8]) -> Result<Vec<u8>>;

    fn decompress(&self, path: &str, data: &[u8]) -> Result<Vec<u8>>;
}

/// Gzip for every path.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipCompression;

impl CompressionProvider for GzipCompression {
    fn compress(&self, _path: &str, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, _path: &str, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = flate2::read::GzDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tracer driver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fire-and-forget observability sink. Implementations must not block.
pub trait TracerDriver: Send + Sync {
    fn add_time(&self, name: &str, d: Duration);

    fn add_count(&self, name: &str, n: i64);
}

/// Default sink: emit trace points as `tracing` debug events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTracer;

impl TracerDriver for LoggingTracer {
    fn add_time(&self, name: &str, d: Duration) {
        tracing::debug!(name, elapsed_ms = d.as_millis() as u64, "trace time");
    }

    fn add_count(&self, name: &str, n: i64) {
        tracing::debug!(name, count = n, "trace count");
    }
}
