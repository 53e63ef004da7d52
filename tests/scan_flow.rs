//! End-to-end scan scenarios against local UDP responders.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;

use sourcescan::scanner::{NoopSink, Resolution, Scanner, ServerSink, A2S_INFO};
use sourcescan::store::ServerStore;
use sourcescan::worklist::WorkList;

/// Binds a responder on loopback that answers every query with `reply` and
/// counts the datagrams it saw.
async fn spawn_responder(reply: &'static [u8]) -> (u16, Arc<AtomicUsize>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        loop {
            let Ok((n, peer)) = socket.recv_from(&mut buf).await else {
                break;
            };
            assert_eq!(&buf[..n], A2S_INFO);
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = socket.send_to(reply, peer).await;
        }
    });
    (port, hits)
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new(targets: &str, servers: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ips.txt"), targets).unwrap();
        std::fs::write(dir.path().join("validservers.txt"), servers).unwrap();
        Self { dir }
    }

    fn scanner(&self, ports: (u16, u16), sink: Arc<dyn ServerSink>) -> Scanner {
        Scanner::new(
            Arc::new(ServerStore::new(self.dir.path().join("validservers.txt"))),
            WorkList::new(self.dir.path().join("ips.txt")),
            25,
            Duration::from_millis(100),
            ports,
            true,
            true,
            sink,
        )
    }

    fn targets(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("ips.txt")).unwrap()
    }

    fn servers(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("validservers.txt")).unwrap()
    }
}

/// A known-valid address is retained without a single probe being sent.
#[tokio::test]
async fn known_address_is_not_probed_again() {
    let (port, hits) = spawn_responder(b"\xFF\xFF\xFF\xFFI\x11fixture\x00").await;
    let fixture = Fixture::new("127.0.0.1\n", "127.0.0.1:27015\n");
    let scanner = fixture.scanner((port, port), Arc::new(NoopSink));

    let outcomes = scanner.run(&["127.0.0.1".to_owned()]).await;

    assert_eq!(outcomes, [("127.0.0.1".to_owned(), Resolution::Retained)]);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.targets(), "127.0.0.1\n");
    assert_eq!(fixture.servers(), "127.0.0.1:27015\n");
}

/// A block where nothing answers on any port disappears from the target file.
#[tokio::test]
async fn unanswered_block_is_pruned() {
    let fixture = Fixture::new("127.81.0.0/30\n10.99.99.1-10.99.99.2\n", "");
    // Closed loopback ports answer with ICMP refusals, so this is quick.
    let scanner = fixture.scanner((27015, 27017), Arc::new(NoopSink));

    let outcomes = scanner.run(&["127.81.0.0/30".to_owned()]).await;

    assert_eq!(outcomes, [("127.81.0.0/30".to_owned(), Resolution::Pruned)]);
    // The untouched entry keeps its place.
    assert_eq!(fixture.targets(), "10.99.99.1-10.99.99.2\n");
    assert_eq!(fixture.servers(), "");
}

/// An info reply gets the server recorded and its entry retained.
#[tokio::test]
async fn answering_server_is_recorded_and_retained() {
    let (port, hits) = spawn_responder(b"\xFF\xFF\xFF\xFFI\x11fixture\x00").await;
    let fixture = Fixture::new("127.0.0.1\n", "");
    let scanner = fixture.scanner((port, port), Arc::new(NoopSink));

    let outcomes = scanner.run(&["127.0.0.1".to_owned()]).await;

    assert_eq!(outcomes, [("127.0.0.1".to_owned(), Resolution::Retained)]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.targets(), "127.0.0.1\n");
    assert_eq!(fixture.servers(), format!("127.0.0.1:{port}\n"));
}

/// A reply with the wrong header byte is not a server.
#[tokio::test]
async fn non_info_reply_is_pruned() {
    let (port, hits) = spawn_responder(b"\xFF\xFF\xFF\xFFA\x00\x00\x00\x00").await;
    let fixture = Fixture::new("127.0.0.1\n", "");
    let scanner = fixture.scanner((port, port), Arc::new(NoopSink));

    let outcomes = scanner.run(&["127.0.0.1".to_owned()]).await;

    assert_eq!(outcomes, [("127.0.0.1".to_owned(), Resolution::Pruned)]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.targets(), "");
    assert_eq!(fixture.servers(), "");
}

struct RecordingSink {
    seen: Mutex<Vec<(Ipv4Addr, u16)>>,
}

#[async_trait::async_trait]
impl ServerSink for RecordingSink {
    async fn on_valid_server(&self, ip: Ipv4Addr, port: u16) {
        self.seen.lock().await.push((ip, port));
    }
}

/// The follow-up hook fires once per confirmed server, after recording.
#[tokio::test]
async fn sink_is_invoked_for_hits() {
    let (port, _) = spawn_responder(b"\xFF\xFF\xFF\xFFI\x11fixture\x00").await;
    let fixture = Fixture::new("127.0.0.1\n", "");
    let sink = Arc::new(RecordingSink {
        seen: Mutex::new(Vec::new()),
    });
    let scanner = fixture.scanner((port, port), Arc::clone(&sink) as Arc<dyn ServerSink>);

    scanner.run(&["127.0.0.1".to_owned()]).await;

    let seen = sink.seen.lock().await;
    assert_eq!(*seen, [(Ipv4Addr::LOCALHOST, port)]);
}

/// Binds a blocking responder somewhere inside the production port window.
fn window_responder(reply: &'static [u8]) -> u16 {
    let socket = (27040..27070)
        .find_map(|port| std::net::UdpSocket::bind(("127.0.0.1", port)).ok())
        .expect("no free port in the query window");
    let port = socket.local_addr().unwrap().port();
    std::thread::spawn(move || {
        let mut buf = [0u8; 1024];
        while let Ok((_, peer)) = socket.recv_from(&mut buf) {
            let _ = socket.send_to(reply, peer);
        }
    });
    port
}

/// Greppable mode prints the bare `ip:port` line per hit and nothing else.
#[test]
fn greppable_mode_prints_only_hit_lines() {
    let port = window_responder(b"\xFF\xFF\xFF\xFFI\x11fixture\x00");
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ips.txt"), "127.0.0.1\n").unwrap();
    std::fs::write(dir.path().join("validservers.txt"), "").unwrap();

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_sourcescan"))
        .args(["--greppable", "--no-config", "--timeout", "50"])
        .arg("--targets-file")
        .arg(dir.path().join("ips.txt"))
        .arg("--servers-file")
        .arg(dir.path().join("validservers.txt"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim(), format!("127.0.0.1:{port}"));

    let servers = std::fs::read_to_string(dir.path().join("validservers.txt")).unwrap();
    assert_eq!(servers, format!("127.0.0.1:{port}\n"));
}

/// Entries resolve strictly in input order, each one settled before the next.
#[tokio::test]
async fn mixed_entries_resolve_in_order() {
    let (port, _) = spawn_responder(b"\xFF\xFF\xFF\xFFI\x11fixture\x00").await;
    let fixture = Fixture::new("127.0.0.1\n127.82.0.1\n", "");
    let scanner = fixture.scanner((port, port), Arc::new(NoopSink));

    let tokens = vec!["127.0.0.1".to_owned(), "127.82.0.1".to_owned()];
    let outcomes = scanner.run(&tokens).await;

    assert_eq!(
        outcomes,
        [
            ("127.0.0.1".to_owned(), Resolution::Retained),
            ("127.82.0.1".to_owned(), Resolution::Pruned),
        ]
    );
    assert_eq!(fixture.targets(), "127.0.0.1\n");
}
