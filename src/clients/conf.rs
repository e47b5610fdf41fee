//! Reads the operating system's resolver configuration.

use crate::Name;
use log::debug;
use std::fs;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Google's public DNS servers, used when the system has none configured.
/// See <https://developers.google.com/speed/public-dns/docs/using>
pub const GOOGLE: [IpAddr; 4] = [
    IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
    IpAddr::V4(Ipv4Addr::new(8, 8, 4, 4)),
    IpAddr::V6(Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888)),
    IpAddr::V6(Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8844)),
];

const RESOLV_CONF: &str = "/etc/resolv.conf";

/// The subset of `resolv.conf(5)` the resolver understands.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvConf {
    /// Servers in the order they were listed.
    pub servers: Vec<IpAddr>,

    /// Suffixes to try for single label names.
    pub search: Vec<Name>,

    /// From `options timeout:N`.
    pub timeout: Option<Duration>,
}

impl ResolvConf {
    /// Parses text in the format of `/etc/resolv.conf`.
    ///
    /// Unknown keywords and unparsable values are skipped, as the C library
    /// does. A later `search` or `domain` line replaces an earlier one.
    pub fn parse(text: &str) -> ResolvConf {
        let mut conf = ResolvConf::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let mut words = line.split_whitespace();
            match words.next() {
                Some("nameserver") => match words.next().map(parse_server) {
                    Some(Some(ip)) => conf.servers.push(ip),
                    _ => debug!("skipping resolv.conf line '{}'", line),
                },
                Some("domain") => {
                    conf.search = words.next().and_then(parse_name).into_iter().collect();
                }
                Some("search") => {
                    conf.search = words.filter_map(parse_name).collect();
                }
                Some("options") => {
                    for word in words {
                        if let Some(secs) = word.strip_prefix("timeout:") {
                            match secs.parse() {
                                Ok(secs) => conf.timeout = Some(Duration::from_secs(secs)),
                                Err(_) => debug!("skipping resolv.conf option '{}'", word),
                            }
                        }
                    }
                }
                _ => debug!("skipping resolv.conf line '{}'", line),
            }
        }

        conf
    }

    /// Reads the configuration from `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<ResolvConf> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Reads the system configuration, falling back to [`GOOGLE`] if it
    /// cannot be read or lists no servers.
    pub fn system() -> ResolvConf {
        Self::load(RESOLV_CONF)
    }

    fn load<P: AsRef<Path>>(path: P) -> ResolvConf {
        let path = path.as_ref();
        let mut conf = match Self::from_file(path) {
            Ok(conf) => conf,
            Err(e) => {
                debug!("unable to read {}: {}", path.display(), e);
                ResolvConf::default()
            }
        };

        if conf.servers.is_empty() {
            debug!("no system DNS servers, using Google Public DNS");
            conf.servers = GOOGLE.to_vec();
        }

        conf
    }
}

fn parse_server(s: &str) -> Option<IpAddr> {
    // Link local IPv6 addresses may carry a zone, which IpAddr can't hold.
    let s = s.split('%').next().unwrap_or(s);
    IpAddr::from_str(s).ok()
}

fn parse_name(s: &str) -> Option<Name> {
    Name::from_str(s).ok().filter(|name| !name.is_root())
}
