//! The datagram transport boundary.
//!
//! The query engine needs exactly one network capability: send one datagram
//! to a server and wait for one datagram back, bounded by a timeout. The
//! [`Transport`] trait captures that seam; [`UdpTransport`] is the production
//! implementation, and tests substitute an in-memory server.

use async_trait::async_trait;
use log::debug;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

use sntp_proto::protocol;

/// A time server's identity: hostname plus UDP port.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ServerAddress {
    host: String,
    port: u16,
}

impl ServerAddress {
    /// A server address on the default NTP port (123).
    pub fn new(host: impl Into<String>) -> ServerAddress {
        ServerAddress {
            host: host.into(),
            port: protocol::PORT,
        }
    }

    /// A server address on a specific port.
    pub fn with_port(host: impl Into<String>, port: u16) -> ServerAddress {
        ServerAddress {
            host: host.into(),
            port,
        }
    }

    /// The server hostname or IP literal.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The server UDP port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One request/response datagram exchange against a time server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` to `server` and return the first response datagram.
    ///
    /// Both the send and the wait for a response are bounded by `timeout`;
    /// expiry surfaces as [`io::ErrorKind::TimedOut`].
    async fn exchange(
        &self,
        request: &[u8],
        server: &ServerAddress,
        timeout: Duration,
    ) -> io::Result<Vec<u8>>;
}

/// Select the appropriate bind address based on the target address family.
///
/// Returns `0.0.0.0:0` for IPv4 targets and `[::]:0` for IPv6 targets.
fn bind_addr_for(target: &SocketAddr) -> SocketAddr {
    match target {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}

/// The production UDP transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpTransport;

#[async_trait]
impl Transport for UdpTransport {
    async fn exchange(
        &self,
        request: &[u8],
        server: &ServerAddress,
        timeout: Duration,
    ) -> io::Result<Vec<u8>> {
        // Resolve eagerly so the response source can be verified.
        let resolved: Vec<SocketAddr> =
            tokio::net::lookup_host((server.host(), server.port()))
                .await?
                .collect();
        let Some(&target) = resolved.first() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("address resolved to no socket addresses: {server}"),
            ));
        };

        let sock = UdpSocket::bind(bind_addr_for(&target)).await?;
        debug!("{:?}", sock.local_addr());

        let sz = tokio::time::timeout(timeout, sock.send_to(request, target))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "send timed out"))??;
        debug!("sent: {}", sz);

        let mut recv_buf = [0u8; 1024];
        let (recv_len, src_addr) = tokio::time::timeout(timeout, sock.recv_from(&mut recv_buf))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "recv timed out"))??;
        debug!("recv: {} bytes from {:?}", recv_len, src_addr);

        // Verify the response came from the resolved server (IP only, the
        // source port may differ).
        if !resolved.iter().any(|a| a.ip() == src_addr.ip()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "response from unexpected source address",
            ));
        }

        Ok(recv_buf[..recv_len].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_address_defaults_to_ntp_port() {
        let addr = ServerAddress::new("pool.ntp.org");
        assert_eq!(addr.port(), 123);
        assert_eq!(addr.to_string(), "pool.ntp.org:123");
    }

    #[test]
    fn server_address_with_port() {
        let addr = ServerAddress::with_port("127.0.0.1", 4123);
        assert_eq!(addr.to_string(), "127.0.0.1:4123");
    }

    #[test]
    fn bind_addr_matches_family() {
        let v4: SocketAddr = "192.0.2.1:123".parse().unwrap();
        assert!(bind_addr_for(&v4).is_ipv4());
        let v6: SocketAddr = "[2001:db8::1]:123".parse().unwrap();
        assert!(bind_addr_for(&v6).is_ipv6());
    }

    #[tokio::test]
    async fn exchange_times_out_when_nothing_answers() {
        // Bind a socket that never replies.
        let silent = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = silent.local_addr().unwrap().port();
        let server = ServerAddress::with_port("127.0.0.1", port);

        let err = UdpTransport
            .exchange(&[0u8; 48], &server, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
