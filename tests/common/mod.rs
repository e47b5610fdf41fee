//! A tiny authoritative server for `example.com`, listening on localhost.

use dnsquery::resource::{MX, TXT};
use dnsquery::{Class, Message, Name, Question, Rcode, Record, Resource, Type, QR};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

fn records(question: &Question) -> Vec<Resource> {
    match question.r#type {
        Type::A => vec![Resource::A("192.0.2.1".parse().unwrap())],
        Type::MX => vec![
            Resource::MX(MX {
                preference: 10,
                exchange: name("mail.example.com"),
            }),
            Resource::MX(MX {
                preference: 20,
                exchange: name("mail2.example.com"),
            }),
            Resource::MX(MX {
                preference: 50,
                exchange: name("mail3.example.com"),
            }),
        ],
        Type::TXT => vec![Resource::TXT(TXT::from("v=spf1 mx -all"))],
        _ => vec![],
    }
}

/// Answers the request, or with only the header and TC set if `truncate`.
pub fn respond(request: &[u8], truncate: bool) -> Option<Vec<u8>> {
    let req = Message::from_slice(request).ok()?;
    let question = req.questions.first()?.clone();

    let mut m = Message {
        id: req.id,
        qr: QR::Response,
        rd: req.rd,
        ra: true,
        aa: true,
        questions: req.questions.clone(),
        ..Default::default()
    };

    if truncate {
        m.tc = true;
    } else if question.name == name("example.com") {
        m.answers = records(&question)
            .into_iter()
            .map(|resource| Record {
                name: question.name.clone(),
                class: Class::Internet,
                ttl: Duration::from_secs(300),
                resource,
            })
            .collect();
    } else {
        m.rcode = Rcode::NXDomain;
    }

    m.to_vec().ok()
}

fn serve_tcp(mut stream: TcpStream) {
    let mut len = [0; 2];
    if stream.read_exact(&mut len).is_err() {
        return;
    }
    let mut request = vec![0; u16::from_be_bytes(len).into()];
    if stream.read_exact(&mut request).is_err() {
        return;
    }

    if let Some(response) = respond(&request, false) {
        let mut buf = (response.len() as u16).to_be_bytes().to_vec();
        buf.extend_from_slice(&response);
        let _ = stream.write_all(&buf);
    }
}

/// Starts a server on a free localhost port, on both UDP and TCP. The UDP
/// side only sends truncated responses if `truncate_udp` is set.
///
/// The server threads run until the test process exits.
pub fn start(truncate_udp: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind TCP");
    let addr = listener.local_addr().unwrap();
    let socket = UdpSocket::bind(addr).expect("failed to bind UDP");

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || serve_tcp(stream));
        }
    });

    thread::spawn(move || {
        let mut buf = [0; 512];
        while let Ok((len, peer)) = socket.recv_from(&mut buf) {
            if let Some(response) = respond(&buf[..len], truncate_udp) {
                let _ = socket.send_to(&response, peer);
            }
        }
    });

    addr
}
