use std::io;
use std::net::SocketAddr;
use std::time::Duration;

pub use self::conf::{ResolvConf, GOOGLE};
pub use self::resolver::{Config, Resolver, MIN_TIMEOUT, UDP_MAX_QUERY_LEN};
pub use self::stats::Stats;
pub(crate) use self::stats::StatsBuilder;

mod conf;
mod resolver;
mod stats;

cfg_feature! {
    #![feature = "tcp"]

    mod tcp;
    pub use self::tcp::TcpClient;
}

cfg_feature! {
    #![feature = "udp"]

    mod udp;
    pub use self::udp::UdpClient;
}

/// Exchanger sends one encoded request to a server and returns the raw
/// response. Implementations are expected to bound every network operation
/// by `timeout`.
pub trait Exchanger: Send + Sync {
    fn exchange(&self, server: SocketAddr, request: &[u8], timeout: Duration)
        -> io::Result<Vec<u8>>;
}
