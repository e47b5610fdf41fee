use std::fmt;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// The transport a single exchange was attempted over.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Tcp => write!(f, "TCP"),
        }
    }
}

/// Errors returned while encoding, decoding or exchanging DNS messages.
#[derive(Error, Debug)]
pub enum Error {
    /// The caller supplied something unusable, for example an empty name or
    /// a configuration without servers.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed wire or text input.
    #[error("format error: {0}")]
    Format(String),

    /// A label length byte used one of the extended label types (other than
    /// the binary label type).
    #[error("unsupported label type 0x{0:02X}")]
    UnsupportedLabelType(u8),

    /// The record type has no decoder.
    #[error("unsupported record type {0}")]
    UnsupportedRecordType(u16),

    /// The RDLENGTH field points past the end of the message.
    #[error("record data length {rdlength} exceeds the {remaining} bytes remaining")]
    TruncatedRecord { rdlength: u16, remaining: usize },

    /// A response did not belong to the query it was received for.
    #[error("invalid response: {0}")]
    Validation(String),

    /// The server answered, but with a status that was not accepted.
    #[error("server responded with {0}")]
    Status(crate::types::Rcode),

    /// Connecting, sending or receiving failed (including timeouts).
    #[error("{protocol} exchange with {server} failed: {source}")]
    Transport {
        server: SocketAddr,
        protocol: Protocol,
        #[source]
        source: io::Error,
    },

    /// The query is too large for UDP and TCP is disabled.
    #[error("query is {size} bytes, larger than the {limit} byte UDP limit, and TCP is disabled")]
    Capacity { size: usize, limit: usize },

    /// Every attempt failed. Holds the cause of each attempt.
    #[error("all {} attempts failed{}", .0.len(), AggregateCauses(.0))]
    Aggregate(Vec<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Short reads from a message cursor end up as io errors, and always mean the
/// message was malformed.
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Format(e.to_string())
    }
}

impl Error {
    /// Returns true if this is a transport (socket or timeout) failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}

struct AggregateCauses<'a>(&'a [Error]);

impl fmt::Display for AggregateCauses<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, e)?;
        }
        Ok(())
    }
}

/// Returns early with an [`Error`] built from a format string.
///
/// `bail!(Format, "bad label {}", x)` expands to
/// `return Err(Error::Format(format!("bad label {}", x)))`.
#[macro_export]
macro_rules! bail {
    ($kind:ident, $($arg:tt)*) => {{
        return Err($crate::Error::$kind(format!($($arg)*)))
    }}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_aggregate_display() {
        let e = Error::Aggregate(vec![
            Error::Validation("id mismatch".to_string()),
            Error::Format("short read".to_string()),
        ]);
        assert_eq!(
            e.to_string(),
            "all 2 attempts failed: invalid response: id mismatch; format error: short read"
        );
    }

    #[test]
    fn test_io_is_format() {
        let e: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(e, Error::Format(_)));
        assert!(!e.is_transport());
    }
}
