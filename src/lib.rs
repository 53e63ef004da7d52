//! This crate exposes the internal functionality of the sourcescan
//! Source Engine server discovery tool.
//!
//! sourcescan probes candidate IPv4 addresses over UDP with the Source
//! Engine Query protocol (A2S_INFO) and keeps two plain text files between
//! runs: a target file of addresses, ranges and CIDR blocks still worth
//! scanning, and a record file of every `ip:port` that answered. Entries
//! whose whole expansion came up empty are pruned from the target file, so
//! the address space left to examine shrinks run over run.
//!
//! ## Architecture Overview
//!
//! The scan is driven by [`Scanner`](crate::scanner::Scanner):
//!
//! 1. **Target expansion**: each token of the target file becomes a list of
//!    concrete addresses ([`target`]).
//! 2. **Filtering**: addresses already present in the record file are
//!    subtracted ([`store`]).
//! 3. **Probing**: the remainder is fanned out across a bounded worker pool;
//!    every worker walks one address through the full query port window
//!    ([`scanner`]).
//! 4. **Resolution**: entries with no confirmed server are removed from the
//!    target file ([`worklist`]).
//!
//! ## Basic Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use sourcescan::scanner::{NoopSink, Scanner, PORT_WINDOW};
//! use sourcescan::store::ServerStore;
//! use sourcescan::worklist::WorkList;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(ServerStore::new("validservers.txt"));
//!     let worklist = WorkList::new("ips.txt");
//!
//!     let scanner = Scanner::new(
//!         store,                        // Record of confirmed servers
//!         worklist,                     // Target file being shrunk
//!         25,                           // Addresses probed concurrently
//!         Duration::from_millis(200),   // Per-probe receive timeout
//!         PORT_WINDOW,                  // Ports probed on every address
//!         false,                        // Greppable output
//!         false,                        // Accessibility mode
//!         Arc::new(NoopSink),           // Follow-up hook for hits
//!     );
//!
//!     let outcomes = scanner.run(&["192.0.2.0/30".to_owned()]).await;
//!     for (token, resolution) in outcomes {
//!         println!("{token}: {resolution:?}");
//!     }
//! }
//! ```
#![warn(missing_docs)]

pub mod tui;

pub mod input;

pub mod target;

pub mod store;

pub mod worklist;

pub mod scanner;
