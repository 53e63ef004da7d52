//! The single-round-trip Source Engine query.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use log::debug;
use tokio::net::UdpSocket;
use tokio::time;

/// A2S_INFO request: the simple-query prefix `FF FF FF FF`, the `T` command
/// byte and the fixed challenge string every Source server recognises.
pub const A2S_INFO: &[u8] = b"\xFF\xFF\xFF\xFFTSource Engine Query\x00";

/// A2S challenge request. Reserved protocol vocabulary; the discovery path
/// never sends it.
pub const A2S_CHALLENGE: &[u8] = b"\xFF\xFF\xFF\xFF\x55\xFF\xFF\xFF\xFF";

/// Header byte of an A2S_INFO reply, found at offset 4 of the datagram.
pub const INFO_REPLY_HEADER: u8 = 0x49;

/// First and last port of the window probed on every address. Source
/// dedicated servers bound off the default query port cluster here.
pub const PORT_WINDOW: (u16, u16) = (27010, 27079);

/// Whether a datagram is a Source Engine info reply.
///
/// A datagram too short to carry the header byte fails closed.
#[must_use]
pub fn is_info_reply(datagram: &[u8]) -> bool {
    datagram.len() > 4 && datagram[4] == INFO_REPLY_HEADER
}

/// Sends one A2S_INFO query per call and classifies whatever comes back.
#[derive(Debug)]
pub struct SourceProbe {
    timeout: Duration,
}

impl SourceProbe {
    /// Creates a probe with the given receive timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Queries `ip:port` and waits up to the timeout for a reply.
    ///
    /// `Ok(true)` means the endpoint answered with an info reply. A timeout,
    /// a non-reply datagram or a refused port all mean `Ok(false)`; only
    /// socket setup and send failures surface as errors.
    pub async fn probe(&self, ip: Ipv4Addr, port: u16) -> io::Result<bool> {
        let target = SocketAddr::V4(SocketAddrV4::new(ip, port));
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(target).await?;
        socket.send(A2S_INFO).await?;

        let mut buf = [0u8; 4096];
        match time::timeout(self.timeout, socket.recv(&mut buf)).await {
            Ok(Ok(size)) => {
                debug!("{target} answered with {size} bytes");
                Ok(is_info_reply(&buf[..size]))
            }
            // The connected socket surfaces ICMP port-unreachable as an
            // error; that is a definitive "no server here".
            Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => Ok(false),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(false),
        }
    }
}
