//! Durable record of confirmed servers.
//!
//! The store is a plain text file with one `ip:port` line per confirmed
//! server. It is append-only: entries are never rewritten or removed by the
//! scan itself, and every read goes back to the file so that records written
//! by a concurrent worker, an earlier run, or a manual edit are always
//! visible. Storage failures are logged and degraded (empty read, dropped
//! write) rather than aborting a scan that may be hours into a large block.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use itertools::Itertools;
use log::{debug, warn};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// File-backed set of confirmed `ip:port` records.
#[derive(Debug)]
pub struct ServerStore {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl ServerStore {
    /// Creates a handle for the record file at `path`. The file itself is
    /// created lazily on the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one `ip:port` record.
    ///
    /// Concurrent callers are serialized through a single writer lane so two
    /// simultaneous hits cannot interleave halves of their lines. A failed
    /// append is logged and dropped; the next run will rediscover the server.
    pub async fn record_valid(&self, ip: Ipv4Addr, port: u16) {
        let _writer = self.append_lock.lock().await;
        let result = async {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(format!("{ip}:{port}\n").as_bytes()).await
        }
        .await;

        match result {
            Ok(()) => debug!("recorded {ip}:{port} in {}", self.path.display()),
            Err(e) => warn!(
                "failed to record {ip}:{port} in {}: {e}",
                self.path.display()
            ),
        }
    }

    /// Re-reads the file and returns every address with at least one record,
    /// ports ignored. An unreadable file reads as empty.
    pub async fn known_valid_addresses(&self) -> HashSet<Ipv4Addr> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(
                    "could not read {}, treating as empty: {e}",
                    self.path.display()
                );
                return HashSet::new();
            }
        };

        content
            .lines()
            .filter_map(|line| line.split(':').next())
            .filter_map(|ip| Ipv4Addr::from_str(ip.trim()).ok())
            .collect()
    }

    /// Number of records currently in the file.
    pub async fn record_count(&self) -> usize {
        match fs::read_to_string(&self.path).await {
            Ok(content) => content.lines().filter(|l| !l.trim().is_empty()).count(),
            Err(_) => 0,
        }
    }

    /// Housekeeping pass: collapses duplicate lines, whole line as the key.
    pub async fn dedup(&self) {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                debug!("nothing to dedup in {}: {e}", self.path.display());
                return;
            }
        };

        let mut deduped = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unique()
            .join("\n");
        if !deduped.is_empty() {
            deduped.push('\n');
        }

        if let Err(e) = fs::write(&self.path, deduped).await {
            warn!("failed to dedup {}: {e}", self.path.display());
        }
    }
}
