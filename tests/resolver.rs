#![cfg(all(feature = "udp", feature = "tcp"))]

mod common;

use dnsquery::clients::{Config, Resolver};
use dnsquery::resource::MX;
use dnsquery::{Error, Name, Protocol, Rcode, Resource, Type};
use pretty_assertions::assert_eq;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::str::FromStr;
use std::time::Duration;
use test_env_log::test;

fn resolver(server: SocketAddr, udp: bool, tcp: bool) -> Resolver {
    Resolver::new(Config {
        servers: vec![server.ip()],
        port: server.port(),
        udp,
        tcp,
        timeout: Duration::from_secs(2),
        ..Default::default()
    })
}

#[test]
fn test_a() {
    let server = common::start(false);
    let m = resolver(server, true, false)
        .query("example.com", Type::A)
        .expect("query failed");

    assert_eq!(m.rcode, Rcode::NoError);
    assert_eq!(
        m.answers
            .iter()
            .map(|r| r.resource.clone())
            .collect::<Vec<_>>(),
        vec![Resource::A("192.0.2.1".parse().unwrap())]
    );

    let stats = m.stats.expect("missing stats");
    assert_eq!(stats.server, server);
    assert_eq!(stats.protocol, Protocol::Udp);
}

#[test]
fn test_mx_over_tcp() {
    let server = common::start(false);
    let m = resolver(server, false, true)
        .query("example.com", Type::MX)
        .expect("query failed");

    let got: Vec<(u16, String)> = m
        .answers
        .iter()
        .filter_map(|r| match &r.resource {
            Resource::MX(MX {
                preference,
                exchange,
            }) => Some((*preference, exchange.to_string())),
            _ => None,
        })
        .collect();

    assert_eq!(
        got,
        vec![
            (10, "mail.example.com.".to_string()),
            (20, "mail2.example.com.".to_string()),
            (50, "mail3.example.com.".to_string()),
        ]
    );
    assert_eq!(m.stats.unwrap().protocol, Protocol::Tcp);
}

#[test]
fn test_txt() {
    let server = common::start(false);
    let m = resolver(server, true, true)
        .query("example.com", Type::TXT)
        .expect("query failed");

    assert_eq!(m.answers.len(), 1);
    assert_eq!(m.answers[0].resource.to_string(), "\"v=spf1 mx -all\"");
}

#[test]
fn test_truncated_retries_over_tcp() {
    let server = common::start(true);
    let m = resolver(server, true, true)
        .query("example.com", Type::A)
        .expect("query failed");

    assert!(!m.tc);
    assert_eq!(m.answers.len(), 1);
    assert_eq!(m.stats.unwrap().protocol, Protocol::Tcp);
}

#[test]
fn test_nxdomain() {
    let server = common::start(false);
    let m = resolver(server, true, true)
        .query("missing.example.com", Type::A)
        .expect("query failed");

    assert_eq!(m.rcode, Rcode::NXDomain);
    assert_eq!(m.questions[0].name, Name::from_str("missing.example.com").unwrap());
    assert!(m.answers.is_empty());
}

#[test]
fn test_lookup() {
    let server = common::start(false);
    let ips = resolver(server, true, true)
        .lookup("example.com")
        .expect("lookup failed");

    assert_eq!(ips, vec!["192.0.2.1".parse::<IpAddr>().unwrap()]);
}

#[test]
fn test_unreachable() {
    // Find a port nothing is listening on.
    let port = UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let resolver = Resolver::new(Config {
        servers: vec!["127.0.0.1".parse().unwrap()],
        port,
        tcp: false,
        timeout: Duration::from_millis(200),
        ..Default::default()
    });

    match resolver.query("example.com", Type::A) {
        Err(Error::Aggregate(errors)) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].is_transport(), "unexpected error {}", errors[0]);
        }
        other => panic!("expected Aggregate, got {:?}", other),
    }
}
