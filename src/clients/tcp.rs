use crate::clients::Exchanger;
use log::trace;
use std::io;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::time::Duration;

/// A TCP DNS transport. Every message is prefixed with its two byte length.
///
/// See <https://datatracker.ietf.org/doc/html/rfc1035#section-4.2.2>
#[derive(Clone, Debug, Default)]
pub struct TcpClient {}

impl Exchanger for TcpClient {
    /// Sends the request to `server` via TCP and returns the response.
    fn exchange(
        &self,
        server: SocketAddr,
        request: &[u8],
        timeout: Duration,
    ) -> io::Result<Vec<u8>> {
        if request.len() > u16::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} byte message does not fit a TCP frame", request.len()),
            ));
        }

        let mut stream = TcpStream::connect_timeout(&server, timeout)?;
        stream.set_nodelay(true)?; // We send discrete packets, so we can send as soon as possible.
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        // Two byte length prefix followed by the message, in a single write.
        let mut message = Vec::with_capacity(request.len() + 2);
        message.extend_from_slice(&(request.len() as u16).to_be_bytes());
        message.extend_from_slice(request);
        stream.write_all(&message)?;

        // Now receive a two byte length
        let buf = &mut [0; 2];
        stream.read_exact(buf)?;
        let len = u16::from_be_bytes(*buf);

        // and finally the message
        let mut buf = vec![0; len.into()];
        stream.read_exact(&mut buf)?;

        trace!("received {} byte message from {}", len, server);

        Ok(buf)
    }
}
