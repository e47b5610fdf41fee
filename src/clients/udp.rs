use crate::clients::Exchanger;
use log::trace;
use std::io;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::net::SocketAddr;
use std::net::UdpSocket;
use std::time::Duration;

/// A UDP DNS transport.
///
/// Each exchange binds a fresh ephemeral socket, so a late answer to one
/// exchange can never be read by another.
///
/// See <https://datatracker.ietf.org/doc/html/rfc1035#section-4.2.1>
#[derive(Clone, Debug)]
pub struct UdpClient {
    /// Size of the receive buffer. Longer datagrams are truncated by the OS.
    pub max_response_size: usize,
}

impl Default for UdpClient {
    fn default() -> Self {
        UdpClient {
            max_response_size: 4096,
        }
    }
}

impl Exchanger for UdpClient {
    /// Sends the request to `server` via UDP and returns the datagram received.
    fn exchange(
        &self,
        server: SocketAddr,
        request: &[u8],
        timeout: Duration,
    ) -> io::Result<Vec<u8>> {
        let local: SocketAddr = match server {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(local)?;
        socket.set_read_timeout(Some(timeout))?;
        socket.set_write_timeout(Some(timeout))?;

        // Connect us to the server, meaning recv will only receive directly
        // from the server.
        socket.connect(server)?;
        socket.send(request)?;

        let mut buf = vec![0; self.max_response_size];
        let len = socket.recv(&mut buf)?;
        buf.truncate(len);

        trace!("received {} byte datagram from {}", len, server);

        Ok(buf)
    }
}
