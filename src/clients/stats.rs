use crate::Protocol;
use std::net::SocketAddr;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;

/// How and from where a response was obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    /// When the request was sent.
    pub start: SystemTime,

    /// How long the exchange took.
    pub duration: Duration,

    /// The server that answered.
    pub server: SocketAddr,

    pub protocol: Protocol,

    pub request_size: usize,
    pub response_size: usize,
}

/// Builder class to aid in the construction of Stats objects.
pub(crate) struct StatsBuilder {
    start: SystemTime,
    timer: Instant,
    request_size: usize,
}

impl StatsBuilder {
    /// Call just before the request is sent, with the payload size.
    pub fn start(request_size: usize) -> StatsBuilder {
        StatsBuilder {
            start: SystemTime::now(),
            timer: Instant::now(),

            request_size,
        }
    }

    /// Call just after the response is received. Consumes the StatsBuilder and returns a Stats.
    pub fn end(self, server: SocketAddr, protocol: Protocol, response_size: usize) -> Stats {
        Stats {
            start: self.start,
            duration: self.timer.elapsed(),

            server,
            protocol,

            request_size: self.request_size,
            response_size,
        }
    }
}
