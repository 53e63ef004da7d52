//! Core functionality for actual scanning behaviour.
//!
//! The scanner walks the target list one entry at a time. Each entry is
//! expanded to concrete addresses, filtered against the servers already on
//! record, fanned out across a bounded pool of per-address workers, and then
//! resolved: entries that produced no server are pruned from the target file,
//! entries with at least one hit stay for a future, deeper look.

mod probe;
pub use probe::{
    is_info_reply, SourceProbe, A2S_CHALLENGE, A2S_INFO, INFO_REPLY_HEADER, PORT_WINDOW,
};

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::debug;
use tokio::time;

use crate::store::ServerStore;
use crate::target::WorkItem;
use crate::worklist::WorkList;
use crate::{detail, output, warning};

/// Pause between two ports of the same address. Keeps a worker from
/// bursting 70 datagrams into the network stack back to back.
const INTER_PORT_PAUSE: Duration = Duration::from_micros(100);

/// Follow-up hook invoked for every confirmed server, e.g. a player-list
/// query. The scan does not depend on what it does.
#[async_trait]
pub trait ServerSink: Send + Sync {
    /// Called after `ip:port` answered with an info reply and was recorded.
    async fn on_valid_server(&self, ip: Ipv4Addr, port: u16);
}

/// The default [`ServerSink`]: does nothing.
#[derive(Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl ServerSink for NoopSink {
    async fn on_valid_server(&self, _ip: Ipv4Addr, _port: u16) {}
}

/// How a work item left the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// At least one of the entry's addresses has a server on record; the
    /// entry stays in the target file.
    Retained,
    /// No address produced a server; the entry was removed from the file.
    Pruned,
    /// The token never parsed; the entry is left alone for a future run.
    Skipped,
}

/// The scan orchestrator.
///
/// `batch_size` is the number of addresses probed concurrently within one
/// entry; each worker owns its address for the entire port window. Entries
/// themselves run strictly one after another, so peak concurrency stays at
/// one pool's width no matter how long the target file is.
pub struct Scanner {
    store: Arc<ServerStore>,
    worklist: WorkList,
    probe: SourceProbe,
    sink: Arc<dyn ServerSink>,
    batch_size: u16,
    ports: (u16, u16),
    greppable: bool,
    accessible: bool,
}

#[allow(clippy::too_many_arguments)]
impl Scanner {
    /// Builds a scanner over the given store and target list. `ports` is the
    /// inclusive window probed on every address; the production window is
    /// [`PORT_WINDOW`].
    pub fn new(
        store: Arc<ServerStore>,
        worklist: WorkList,
        batch_size: u16,
        timeout: Duration,
        ports: (u16, u16),
        greppable: bool,
        accessible: bool,
        sink: Arc<dyn ServerSink>,
    ) -> Self {
        Self {
            store,
            worklist,
            probe: SourceProbe::new(timeout),
            sink,
            batch_size: batch_size.max(1),
            ports,
            greppable,
            accessible,
        }
    }

    /// Scans every token in input order, one entry fully resolved before the
    /// next one starts. Returns each token with its resolution.
    pub async fn run(&self, tokens: &[String]) -> Vec<(String, Resolution)> {
        let mut outcomes = Vec::with_capacity(tokens.len());
        for token in tokens {
            let resolution = self.scan_item(token).await;
            debug!("{token} resolved as {resolution:?}");
            outcomes.push((token.clone(), resolution));
        }
        outcomes
    }

    /// Expand, filter, probe and resolve a single entry.
    async fn scan_item(&self, token: &str) -> Resolution {
        let item = match token.parse::<WorkItem>() {
            Ok(item) => item,
            Err(e) => {
                warning!(
                    format!("Skipping '{token}': {e}"),
                    self.greppable,
                    self.accessible
                );
                return Resolution::Skipped;
            }
        };

        let expanded = item.expand();
        let known = self.store.known_valid_addresses().await;
        let pending: Vec<Ipv4Addr> = expanded
            .iter()
            .copied()
            .filter(|ip| !known.contains(ip))
            .collect();

        if pending.is_empty() {
            detail!(
                format!("Skipping {token} (already scanned or contains valid servers)."),
                self.greppable,
                self.accessible
            );
        } else {
            detail!(
                format!("Scanning {token} ({} addresses).", pending.len()),
                self.greppable,
                self.accessible
            );
            stream::iter(pending)
                .for_each_concurrent(usize::from(self.batch_size), |ip| self.scan_address(ip))
                .await;
        }

        self.resolve(token, &expanded).await
    }

    /// Walks one address through the whole port window, ascending. Runs on a
    /// single worker; hits are recorded as they happen.
    async fn scan_address(&self, ip: Ipv4Addr) {
        let (first, last) = self.ports;
        for port in first..=last {
            match self.probe.probe(ip, port).await {
                Ok(true) => {
                    self.fmt_hit(ip, port);
                    self.store.record_valid(ip, port).await;
                    self.sink.on_valid_server(ip, port).await;
                }
                Ok(false) => {}
                Err(e) => {
                    // Transport trouble; the rest of this address's window
                    // would fail the same way.
                    warning!(
                        format!("Probe failed for {ip}: {e}"),
                        self.greppable,
                        self.accessible
                    );
                    return;
                }
            }
            time::sleep(INTER_PORT_PAUSE).await;
        }
    }

    /// Formats and prints a confirmed server. Greppable mode gets the bare
    /// machine-readable `ip:port` line; everything else stays silent there.
    fn fmt_hit(&self, ip: Ipv4Addr, port: u16) {
        if self.greppable {
            println!("{ip}:{port}");
        } else {
            output!(format!("Valid server at {ip}:{port}"), false, self.accessible);
        }
    }

    /// Decides retention against a fresh read of the store, matched on the
    /// entry's original address set.
    async fn resolve(&self, token: &str, expanded: &[Ipv4Addr]) -> Resolution {
        let known = self.store.known_valid_addresses().await;
        if expanded.iter().any(|ip| known.contains(ip)) {
            Resolution::Retained
        } else {
            warning!(
                format!("No valid servers found in {token}. Removing from list."),
                self.greppable,
                self.accessible
            );
            self.worklist.remove(token).await;
            Resolution::Pruned
        }
    }
}
