use crate::bail;
use crate::clients::conf::{ResolvConf, GOOGLE};
use crate::clients::{Exchanger, Stats, StatsBuilder};
use crate::errors::{Error, Protocol, Result};
use crate::types::*;
use crate::Name;
use log::{debug, trace, warn};
use std::net::IpAddr;
use std::net::SocketAddr;
use std::panic;
use std::str::FromStr;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

cfg_feature! {
    #![all(feature = "udp", feature = "tcp")]

    use crate::clients::{TcpClient, UdpClient};
}

/// Queries larger than this are never sent over UDP. [rfc1035#section-4.2.1]
///
/// [rfc1035#section-4.2.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.2.1
pub const UDP_MAX_QUERY_LEN: usize = 512;

/// No exchange is given less time than this, whatever the configuration says.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

/// How a [`Resolver`] talks to its servers.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Servers to query, all of them in parallel for [`Resolver::resolve`],
    /// or in this order for [`Resolver::resolve_sequential`].
    pub servers: Vec<IpAddr>,

    /// Allow UDP. Queries too large for UDP always use TCP.
    pub udp: bool,

    /// Allow TCP, for large queries, truncated responses, and as a fallback
    /// when UDP fails.
    pub tcp: bool,

    pub port: u16,

    /// Time allowed for each exchange. Values below [`MIN_TIMEOUT`] are raised.
    pub timeout: Duration,

    /// Randomise the letter case of each outgoing name, see
    /// <https://datatracker.ietf.org/doc/html/draft-vixie-dnsext-dns0x20-00>
    pub dns0x20: bool,

    /// Suffixes tried, in order, for single label names.
    pub search: Vec<Name>,
}

impl Default for Config {
    /// Google's public resolvers, over UDP and TCP, with a 5 second timeout.
    fn default() -> Self {
        Config {
            servers: GOOGLE.to_vec(),
            udp: true,
            tcp: true,
            port: 53,
            timeout: Duration::from_secs(5),
            dns0x20: false,
            search: Vec::new(),
        }
    }
}

impl Config {
    /// The servers, search suffixes and timeout from the system's `resolv.conf`.
    pub fn system() -> Config {
        let conf = ResolvConf::system();
        let defaults = Config::default();

        Config {
            servers: conf.servers,
            search: conf.search,
            timeout: conf.timeout.unwrap_or(defaults.timeout),
            ..defaults
        }
    }

    fn effective_timeout(&self) -> Duration {
        self.timeout.max(MIN_TIMEOUT)
    }
}

/// Resolver sends queries to a set of servers, and picks the answer.
///
/// # Example
///
/// ```rust,no_run
/// use dnsquery::clients::{Config, Resolver};
/// use dnsquery::Type;
///
/// let resolver = Resolver::new(Config::system());
/// let response = resolver.query("example.com", Type::MX)?;
///
/// for answer in &response.answers {
///     println!("{}", answer);
/// }
/// # Ok::<(), dnsquery::Error>(())
/// ```
#[derive(Clone)]
pub struct Resolver {
    config: Config,

    udp: Arc<dyn Exchanger>,
    tcp: Arc<dyn Exchanger>,
}

#[cfg(all(feature = "udp", feature = "tcp"))]
impl Default for Resolver {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Resolver {
    /// Creates a new Resolver that uses the standard library's sockets.
    #[cfg(all(feature = "udp", feature = "tcp"))]
    pub fn new(config: Config) -> Resolver {
        Self::with_exchangers(
            config,
            Arc::new(UdpClient::default()),
            Arc::new(TcpClient::default()),
        )
    }

    /// Creates a new Resolver with the given UDP and TCP transports.
    pub fn with_exchangers(
        config: Config,
        udp: Arc<dyn Exchanger>,
        tcp: Arc<dyn Exchanger>,
    ) -> Resolver {
        Resolver { config, udp, tcp }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Sends the query to every server at once, and returns the first
    /// `NoError` response.
    ///
    /// If no server responds with `NoError`, the first response with answers
    /// is returned, else the first response. If no server responds at all,
    /// every error is returned as an [`Error::Aggregate`].
    pub fn resolve(&self, query: &Query) -> Result<Message> {
        let call = self.prepare(query)?;
        let servers = call.servers();
        let rx = spawn_attempts(&call, &servers);

        let mut responses = Vec::new();
        let mut errors = Vec::new();

        // Each attempt sends exactly one result, unless its thread died.
        for result in rx.iter().take(servers.len()) {
            match result {
                Ok(m) if m.rcode == Rcode::NoError => {
                    debug!("{} answered {} first", fmt_server(&m), query.name);
                    return Ok(m);
                }
                Ok(m) => responses.push(m),
                Err(e) => {
                    debug!("{}", e);
                    push_error(&mut errors, e)
                }
            }
        }

        select(responses, errors)
    }

    /// Sends the query to every server at once, and returns every response
    /// in the order they arrived.
    pub fn resolve_all(&self, query: &Query) -> Result<Vec<Message>> {
        let call = self.prepare(query)?;
        let servers = call.servers();
        let rx = spawn_attempts(&call, &servers);

        let mut responses = Vec::new();
        let mut errors = Vec::new();

        for result in rx.iter().take(servers.len()) {
            match result {
                Ok(m) => responses.push(m),
                Err(e) => push_error(&mut errors, e),
            }
        }

        if responses.is_empty() {
            return Err(Error::Aggregate(errors));
        }
        Ok(responses)
    }

    /// Tries each server in turn, returning the first `NoError` response.
    pub fn resolve_sequential(&self, query: &Query) -> Result<Message> {
        self.resolve_sequential_with(query, |m| m.rcode == Rcode::NoError)
    }

    /// Tries each server in turn, returning the first response `accept`
    /// returns true for. Later servers are not contacted.
    pub fn resolve_sequential_with<P>(&self, query: &Query, accept: P) -> Result<Message>
    where
        P: Fn(&Message) -> bool,
    {
        let call = self.prepare(query)?;

        let mut errors = Vec::new();
        for server in call.servers() {
            match call.attempt(server) {
                Ok(m) if accept(&m) => return Ok(m),
                Ok(m) => {
                    debug!("{} responded with {}, trying next server", server, m.rcode);
                    errors.push(Error::Status(m.rcode))
                }
                Err(e) => {
                    debug!("{}", e);
                    push_error(&mut errors, e)
                }
            }
        }

        Err(Error::Aggregate(errors))
    }

    /// Resolves a single label name by appending each search suffix, and
    /// picking between the answers as [`Resolver::resolve`] does, preferring
    /// earlier suffixes. Other names are resolved as is.
    pub fn resolve_search(&self, query: &Query) -> Result<Message> {
        let search = &self.config.search;
        if !query.name.is_single_label() || search.is_empty() {
            return self.resolve(query);
        }

        let results: Vec<Result<Message>> = thread::scope(|s| {
            let handles: Vec<_> = search
                .iter()
                .map(|suffix| {
                    let query = query.with_name(query.name.join(suffix));
                    trace!("searching for {}", query.name);
                    s.spawn(move || self.resolve(&query))
                })
                .collect();

            handles.into_iter().map(join).collect()
        });

        let mut responses = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(m) => responses.push(m),
                Err(e) => errors.push(e),
            }
        }

        select(responses, errors)
    }

    /// Resolves `name` (which may be Unicode) for the given type, expanding
    /// single label names with the configured search suffixes.
    pub fn query(&self, name: &str, r#type: Type) -> Result<Message> {
        let name = name.trim();
        if name.is_empty() {
            bail!(InvalidArgument, "no name to resolve");
        }

        let query = Query::new(Name::from_str(name)?, r#type);
        self.resolve_search(&query)
    }

    /// Resolves a name into one or more IP address, by querying for its A
    /// and AAAA records at the same time.
    ///
    /// See [rfc1035#section-7] and [rfc1034#section-5].
    ///
    /// [rfc1035#section-7]: https://datatracker.ietf.org/doc/html/rfc1035#section-7
    /// [rfc1034#section-5]: https://datatracker.ietf.org/doc/html/rfc1034#section-5
    pub fn lookup(&self, name: &str) -> Result<Vec<IpAddr>> {
        let results = thread::scope(|s| {
            let a = s.spawn(|| self.query(name, Type::A));
            let aaaa = s.spawn(|| self.query(name, Type::AAAA));
            [join(a), join(aaaa)]
        });

        let mut ips = Vec::new();
        let mut errors = Vec::new();

        for result in results {
            match result {
                Ok(m) if m.rcode == Rcode::NoError => {
                    for answer in m.answers {
                        let ip = match answer.resource {
                            Resource::A(ip4) => IpAddr::V4(ip4),
                            Resource::AAAA(ip6) => IpAddr::V6(ip6),
                            _ => continue, // Ignore other types, e.g CNAMEs
                        };
                        if !ips.contains(&ip) {
                            ips.push(ip);
                        }
                    }
                }
                Ok(m) => errors.push(Error::Status(m.rcode)),
                Err(e) => errors.push(e),
            }
        }

        if ips.is_empty() && !errors.is_empty() {
            return Err(Error::Aggregate(errors));
        }
        Ok(ips)
    }

    // Checks the query can be sent at all, before any I/O is started.
    fn prepare(&self, query: &Query) -> Result<Arc<Call>> {
        let config = &self.config;

        if config.servers.is_empty() {
            bail!(InvalidArgument, "no servers configured");
        }
        if !config.udp && !config.tcp {
            bail!(InvalidArgument, "both UDP and TCP are disabled");
        }

        let size = query.len();
        let use_udp = config.udp && size <= UDP_MAX_QUERY_LEN;
        if !use_udp && !config.tcp {
            return Err(Error::Capacity {
                size,
                limit: UDP_MAX_QUERY_LEN,
            });
        }
        if size > u16::MAX as usize {
            return Err(Error::Capacity {
                size,
                limit: u16::MAX as usize,
            });
        }

        Ok(Arc::new(Call {
            query: query.clone(),
            id: rand::random(),
            config: config.clone(),
            use_udp,
            udp: Arc::clone(&self.udp),
            tcp: Arc::clone(&self.tcp),
        }))
    }
}

/// Picks one of the responses: the first `NoError`, else the first with
/// answers, else the first. Fails with all the errors if there are no
/// responses.
pub(crate) fn select(mut responses: Vec<Message>, errors: Vec<Error>) -> Result<Message> {
    if responses.is_empty() {
        return Err(Error::Aggregate(errors));
    }

    let i = responses
        .iter()
        .position(|m| m.rcode == Rcode::NoError)
        .or_else(|| responses.iter().position(|m| !m.answers.is_empty()))
        .unwrap_or(0);

    Ok(responses.swap_remove(i))
}

// Starts one attempt per server, each reporting into the returned channel.
fn spawn_attempts(call: &Arc<Call>, servers: &[SocketAddr]) -> mpsc::Receiver<Result<Message>> {
    let (tx, rx) = mpsc::channel();

    for &server in servers {
        let attempt = Arc::clone(call);
        let attempt_tx = tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("dns {}", server))
            .spawn(move || {
                // The receiver is gone if another server already answered.
                let _ = attempt_tx.send(attempt.attempt(server));
            });

        if let Err(source) = spawned {
            warn!("unable to start a thread for {}: {}", server, source);
            let _ = tx.send(Err(Error::Transport {
                server,
                protocol: call.first_protocol(),
                source,
            }));
        }
    }

    rx
}

// An attempt that failed over both UDP and TCP contributes both causes.
fn push_error(errors: &mut Vec<Error>, e: Error) {
    match e {
        Error::Aggregate(causes) => errors.extend(causes),
        e => errors.push(e),
    }
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|e| panic::resume_unwind(e))
}

fn fmt_server(m: &Message) -> String {
    match &m.stats {
        Some(stats) => format!("{} ({})", stats.server, stats.protocol),
        None => "server".to_string(),
    }
}

/// The immutable state shared by every attempt of one call.
struct Call {
    query: Query,

    /// Used by every attempt, so any server's response can be matched.
    id: u16,

    config: Config,

    /// False when UDP is disabled, or the query is too large for it.
    use_udp: bool,

    udp: Arc<dyn Exchanger>,
    tcp: Arc<dyn Exchanger>,
}

impl Call {
    fn servers(&self) -> Vec<SocketAddr> {
        self.config
            .servers
            .iter()
            .map(|ip| SocketAddr::new(*ip, self.config.port))
            .collect()
    }

    fn first_protocol(&self) -> Protocol {
        if self.use_udp {
            Protocol::Udp
        } else {
            Protocol::Tcp
        }
    }

    /// Queries one server, over UDP if possible, and then TCP if the UDP
    /// response was truncated or UDP failed.
    fn attempt(&self, server: SocketAddr) -> Result<Message> {
        if !self.use_udp {
            return self.exchange(server, Protocol::Tcp);
        }

        let (buf, stats) = match self.send(server, Protocol::Udp) {
            Ok(response) => response,
            Err(udp) if self.config.tcp => {
                debug!("{}, retrying over TCP", udp);
                return self
                    .exchange(server, Protocol::Tcp)
                    .map_err(|tcp| Error::Aggregate(vec![udp, tcp]));
            }
            Err(e) => return Err(e),
        };

        // Checked on the raw bytes, as a truncated response may not parse.
        if self.config.tcp && Message::is_truncated(&buf) {
            debug!("truncated response from {}, retrying over TCP", server);
            return self.exchange(server, Protocol::Tcp);
        }

        self.accept(&buf, stats)
    }

    fn exchange(&self, server: SocketAddr, protocol: Protocol) -> Result<Message> {
        let (buf, stats) = self.send(server, protocol)?;
        self.accept(&buf, stats)
    }

    fn send(&self, server: SocketAddr, protocol: Protocol) -> Result<(Vec<u8>, Stats)> {
        let request = if self.config.dns0x20 {
            self.query
                .randomize_case(&mut rand::thread_rng())
                .to_vec(self.id)
        } else {
            self.query.to_vec(self.id)
        };

        let exchanger = match protocol {
            Protocol::Udp => &self.udp,
            Protocol::Tcp => &self.tcp,
        };

        trace!(
            "sending {} byte query for {} {} to {} ({})",
            request.len(),
            self.query.name,
            self.query.r#type,
            server,
            protocol
        );

        let stats = StatsBuilder::start(request.len());
        match exchanger.exchange(server, &request, self.config.effective_timeout()) {
            Ok(buf) => {
                let stats = stats.end(server, protocol, buf.len());
                Ok((buf, stats))
            }
            Err(source) => Err(Error::Transport {
                server,
                protocol,
                source,
            }),
        }
    }

    // Decodes the response and checks it answers this call's query.
    fn accept(&self, buf: &[u8], stats: Stats) -> Result<Message> {
        let mut m = Message::from_slice(buf)?;

        if m.id != self.id {
            bail!(
                Validation,
                "{} responded with id {}, expected {}",
                stats.server,
                m.id,
                self.id
            );
        }
        if m.qr != QR::Response {
            bail!(Validation, "{} sent a query, not a response", stats.server);
        }
        if m.questions.len() != 1 || self.query != m.questions[0] {
            bail!(
                Validation,
                "{} responded to a different question than {} {} {}",
                stats.server,
                self.query.name,
                self.query.class,
                self.query.r#type
            );
        }

        m.stats = Some(stats);
        Ok(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::Mutex;

    type Handler = dyn Fn(SocketAddr, &[u8]) -> io::Result<Vec<u8>> + Send + Sync;

    /// An Exchanger that answers from a closure, and records every call.
    struct MockExchanger {
        handler: Box<Handler>,
        calls: Mutex<Vec<(SocketAddr, Duration)>>,
    }

    impl MockExchanger {
        fn new<F>(handler: F) -> Arc<MockExchanger>
        where
            F: Fn(SocketAddr, &[u8]) -> io::Result<Vec<u8>> + Send + Sync + 'static,
        {
            Arc::new(MockExchanger {
                handler: Box::new(handler),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn unused() -> Arc<MockExchanger> {
            Self::new(|_, _| Err(io::Error::new(io::ErrorKind::Other, "unexpected exchange")))
        }

        fn calls(&self) -> Vec<SocketAddr> {
            self.calls.lock().unwrap().iter().map(|(s, _)| *s).collect()
        }

        fn timeouts(&self) -> Vec<Duration> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }
    }

    impl Exchanger for MockExchanger {
        fn exchange(
            &self,
            server: SocketAddr,
            request: &[u8],
            timeout: Duration,
        ) -> io::Result<Vec<u8>> {
            self.calls.lock().unwrap().push((server, timeout));
            (self.handler)(server, request)
        }
    }

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn server(ip: &str) -> SocketAddr {
        SocketAddr::new(ip.parse().unwrap(), 53)
    }

    fn config(servers: &[&str]) -> Config {
        Config {
            servers: servers.iter().map(|s| s.parse().unwrap()).collect(),
            timeout: Duration::from_millis(100),
            ..Default::default()
        }
    }

    fn a_record(name: &Name, ip: &str) -> Record {
        Record {
            name: name.clone(),
            class: Class::Internet,
            ttl: Duration::from_secs(60),
            resource: Resource::A(ip.parse().unwrap()),
        }
    }

    /// Builds a response to the request, echoing its id and question.
    fn response(request: &[u8], rcode: Rcode, answers: Vec<Record>) -> Message {
        let req = Message::from_slice(request).unwrap();
        Message {
            id: req.id,
            qr: QR::Response,
            rd: req.rd,
            ra: true,
            rcode,
            questions: req.questions,
            answers,
            ..Default::default()
        }
    }

    fn respond(request: &[u8], rcode: Rcode, answers: Vec<Record>) -> io::Result<Vec<u8>> {
        Ok(response(request, rcode, answers).to_vec().unwrap())
    }

    // Answers "NoError 192.0.2.200" for every question.
    fn answer_all(_: SocketAddr, request: &[u8]) -> io::Result<Vec<u8>> {
        let req = Message::from_slice(request).unwrap();
        let answer = a_record(&req.questions[0].name, "192.0.2.200");
        respond(request, Rcode::NoError, vec![answer])
    }

    fn query() -> Query {
        Query::new(name("example.com"), Type::A)
    }

    #[test]
    fn test_resolve_prefers_noerror() {
        let udp = MockExchanger::new(|server, request| match server.ip().to_string().as_str() {
            "192.0.2.1" => respond(request, Rcode::ServFail, vec![]),
            "192.0.2.2" => respond(request, Rcode::NXDomain, vec![]),
            _ => answer_all(server, request),
        });
        let tcp = MockExchanger::unused();

        let resolver = Resolver::with_exchangers(
            config(&["192.0.2.1", "192.0.2.2", "192.0.2.3"]),
            udp.clone(),
            tcp.clone(),
        );

        let m = resolver.resolve(&query()).unwrap();
        assert_eq!(m.rcode, Rcode::NoError);
        assert_eq!(m.server(), Some(server("192.0.2.3")));
        assert_eq!(m.stats.as_ref().unwrap().protocol, Protocol::Udp);
        assert_eq!(m.answers.len(), 1);
        assert!(tcp.calls().is_empty());
    }

    #[test]
    fn test_resolve_without_noerror() {
        let udp = MockExchanger::new(|server, request| match server.ip().to_string().as_str() {
            "192.0.2.1" => respond(request, Rcode::ServFail, vec![]),
            _ => respond(request, Rcode::Refused, vec![]),
        });

        let resolver = Resolver::with_exchangers(
            config(&["192.0.2.1", "192.0.2.2"]),
            udp,
            MockExchanger::unused(),
        );

        let m = resolver.resolve(&query()).unwrap();
        assert!(m.rcode == Rcode::ServFail || m.rcode == Rcode::Refused);
    }

    #[test]
    fn test_select() {
        let m = |rcode, answers: usize| Message {
            rcode,
            answers: (0..answers)
                .map(|_| a_record(&name("example.com"), "192.0.2.1"))
                .collect(),
            ..Default::default()
        };

        let got = select(
            vec![m(Rcode::ServFail, 0), m(Rcode::NXDomain, 1), m(Rcode::NoError, 0)],
            vec![],
        )
        .unwrap();
        assert_eq!(got.rcode, Rcode::NoError);

        let got = select(vec![m(Rcode::ServFail, 0), m(Rcode::NXDomain, 1)], vec![]).unwrap();
        assert_eq!(got.rcode, Rcode::NXDomain);

        let got = select(vec![m(Rcode::ServFail, 0), m(Rcode::Refused, 0)], vec![]).unwrap();
        assert_eq!(got.rcode, Rcode::ServFail);

        match select(vec![], vec![Error::Validation("bad".to_string())]) {
            Err(Error::Aggregate(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected Aggregate, got {:?}", other),
        }
    }

    #[test]
    fn test_preflight() {
        let udp = MockExchanger::unused();
        let tcp = MockExchanger::unused();

        let mut resolver = Resolver::with_exchangers(config(&[]), udp.clone(), tcp.clone());
        assert!(matches!(
            resolver.resolve(&query()),
            Err(Error::InvalidArgument(_))
        ));

        *resolver.config_mut() = Config {
            udp: false,
            tcp: false,
            ..config(&["192.0.2.1"])
        };
        assert!(matches!(
            resolver.resolve(&query()),
            Err(Error::InvalidArgument(_))
        ));

        assert!(matches!(
            resolver.query("  ", Type::A),
            Err(Error::InvalidArgument(_))
        ));

        assert!(udp.calls().is_empty());
        assert!(tcp.calls().is_empty());
    }

    #[test]
    fn test_capacity() {
        // Ten 60 byte labels make a 627 byte query.
        let long = vec!["a".repeat(60); 10].join(".");
        let query = Query::new(name(&long), Type::A);
        assert_eq!(query.len(), 627);

        let udp = MockExchanger::unused();
        let tcp = MockExchanger::unused();
        let resolver = Resolver::with_exchangers(
            Config {
                tcp: false,
                ..config(&["192.0.2.1", "192.0.2.2"])
            },
            udp.clone(),
            tcp.clone(),
        );

        match resolver.resolve(&query) {
            Err(Error::Capacity { size, limit }) => {
                assert_eq!(size, 627);
                assert_eq!(limit, UDP_MAX_QUERY_LEN);
            }
            other => panic!("expected Capacity, got {:?}", other),
        }
        assert!(udp.calls().is_empty());
        assert!(tcp.calls().is_empty());
    }

    #[test]
    fn test_large_query_uses_tcp() {
        let long = vec!["a".repeat(60); 10].join(".");
        let query = Query::new(name(&long), Type::A);

        let udp = MockExchanger::unused();
        let tcp = MockExchanger::new(answer_all);
        let resolver = Resolver::with_exchangers(config(&["192.0.2.1"]), udp.clone(), tcp.clone());

        let m = resolver.resolve(&query).unwrap();
        assert_eq!(m.stats.unwrap().protocol, Protocol::Tcp);
        assert!(udp.calls().is_empty());
        assert_eq!(tcp.calls(), vec![server("192.0.2.1")]);
    }

    #[test]
    fn test_truncated_escalates_to_tcp() {
        let udp = MockExchanger::new(|_, request| {
            let mut m = response(request, Rcode::NoError, vec![]);
            m.tc = true;
            Ok(m.to_vec().unwrap())
        });
        let tcp = MockExchanger::new(answer_all);

        let resolver = Resolver::with_exchangers(config(&["192.0.2.1"]), udp.clone(), tcp.clone());

        let m = resolver.resolve(&query()).unwrap();
        assert!(!m.tc);
        assert_eq!(m.answers.len(), 1);
        assert_eq!(m.stats.unwrap().protocol, Protocol::Tcp);
        assert_eq!(udp.calls(), vec![server("192.0.2.1")]);
        assert_eq!(tcp.calls(), vec![server("192.0.2.1")]);
    }

    #[test]
    fn test_unparsable_truncated_escalates_to_tcp() {
        // Only the header survives, so the question is missing.
        let udp = MockExchanger::new(|_, request| {
            let mut buf = request[..12].to_vec();
            buf[2] |= 0b1000_0010; // QR and TC
            Ok(buf)
        });
        let tcp = MockExchanger::new(answer_all);

        let resolver = Resolver::with_exchangers(config(&["192.0.2.1"]), udp, tcp.clone());

        let m = resolver.resolve(&query()).unwrap();
        assert_eq!(m.rcode, Rcode::NoError);
        assert_eq!(tcp.calls().len(), 1);
    }

    #[test]
    fn test_udp_failure_falls_back_to_tcp() {
        let udp = MockExchanger::new(|_, _| Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")));
        let tcp = MockExchanger::new(answer_all);

        let resolver = Resolver::with_exchangers(config(&["192.0.2.1"]), udp.clone(), tcp.clone());

        let m = resolver.resolve(&query()).unwrap();
        assert_eq!(m.stats.unwrap().protocol, Protocol::Tcp);
        assert_eq!(udp.calls().len(), 1);
        assert_eq!(tcp.calls().len(), 1);
    }

    #[test]
    fn test_udp_failure_without_tcp() {
        let udp = MockExchanger::new(|_, _| Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")));
        let tcp = MockExchanger::unused();

        let resolver = Resolver::with_exchangers(
            Config {
                tcp: false,
                ..config(&["192.0.2.1"])
            },
            udp,
            tcp.clone(),
        );

        match resolver.resolve(&query()) {
            Err(Error::Aggregate(errors)) => {
                assert_eq!(errors.len(), 1);
                match &errors[0] {
                    Error::Transport {
                        server: s,
                        protocol,
                        ..
                    } => {
                        assert_eq!(*s, server("192.0.2.1"));
                        assert_eq!(*protocol, Protocol::Udp);
                    }
                    other => panic!("expected Transport, got {:?}", other),
                }
            }
            other => panic!("expected Aggregate, got {:?}", other),
        }
        assert!(tcp.calls().is_empty());
    }

    #[test]
    fn test_udp_and_tcp_failure_keeps_both_causes() {
        let timed_out = |_: SocketAddr, _: &[u8]| -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"))
        };
        let resolver = Resolver::with_exchangers(
            config(&["192.0.2.1", "192.0.2.2"]),
            MockExchanger::new(timed_out),
            MockExchanger::new(timed_out),
        );

        let check = |result: Result<Message>| match result {
            Err(Error::Aggregate(errors)) => {
                assert_eq!(errors.len(), 4);

                let mut causes: Vec<_> = errors
                    .iter()
                    .map(|e| match e {
                        Error::Transport {
                            server, protocol, ..
                        } => (*server, *protocol),
                        other => panic!("expected Transport, got {:?}", other),
                    })
                    .collect();
                causes.sort_by_key(|(s, p)| (*s, p.to_string()));

                assert_eq!(
                    causes,
                    vec![
                        (server("192.0.2.1"), Protocol::Tcp),
                        (server("192.0.2.1"), Protocol::Udp),
                        (server("192.0.2.2"), Protocol::Tcp),
                        (server("192.0.2.2"), Protocol::Udp),
                    ]
                );
            }
            other => panic!("expected Aggregate, got {:?}", other),
        };

        check(resolver.resolve(&query()));
        check(resolver.resolve_sequential(&query()));
        check(resolver.resolve_all(&query()).map(|mut all| all.remove(0)));
    }

    #[test]
    fn test_minimum_timeout() {
        let udp = MockExchanger::new(answer_all);
        let resolver = Resolver::with_exchangers(
            Config {
                timeout: Duration::from_millis(1),
                ..config(&["192.0.2.1"])
            },
            udp.clone(),
            MockExchanger::unused(),
        );

        resolver.resolve(&query()).unwrap();
        assert_eq!(udp.timeouts(), vec![MIN_TIMEOUT]);
    }

    #[test]
    fn test_id_mismatch() {
        let udp = MockExchanger::new(|_, request| {
            let mut m = response(request, Rcode::NoError, vec![]);
            m.id = m.id.wrapping_add(1);
            Ok(m.to_vec().unwrap())
        });
        let tcp = MockExchanger::unused();

        let resolver = Resolver::with_exchangers(config(&["192.0.2.1"]), udp, tcp.clone());

        match resolver.resolve(&query()) {
            Err(Error::Aggregate(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(matches!(errors[0], Error::Validation(_)));
            }
            other => panic!("expected Aggregate, got {:?}", other),
        }
        assert!(tcp.calls().is_empty());
    }

    #[test]
    fn test_question_mismatch() {
        let udp = MockExchanger::new(|server, request| match server.ip().to_string().as_str() {
            "192.0.2.1" => {
                let mut m = response(request, Rcode::NoError, vec![]);
                m.questions[0].name = name("example.org");
                Ok(m.to_vec().unwrap())
            }
            "192.0.2.2" => {
                let mut m = response(request, Rcode::NoError, vec![]);
                m.questions.push(m.questions[0].clone());
                Ok(m.to_vec().unwrap())
            }
            _ => answer_all(server, request),
        });

        let resolver = Resolver::with_exchangers(
            config(&["192.0.2.1", "192.0.2.2", "192.0.2.3"]),
            udp,
            MockExchanger::unused(),
        );

        // Only the third server's response is valid.
        let m = resolver.resolve(&query()).unwrap();
        assert_eq!(m.server(), Some(server("192.0.2.3")));

        let all = resolver.resolve_all(&query()).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_resolve_all() {
        let udp = MockExchanger::new(|server, request| match server.ip().to_string().as_str() {
            "192.0.2.1" => respond(request, Rcode::ServFail, vec![]),
            _ => answer_all(server, request),
        });

        let resolver = Resolver::with_exchangers(
            config(&["192.0.2.1", "192.0.2.2", "192.0.2.3"]),
            udp,
            MockExchanger::unused(),
        );

        let responses = resolver.resolve_all(&query()).unwrap();
        assert_eq!(responses.len(), 3);

        let mut servers: Vec<_> = responses.iter().filter_map(Message::server).collect();
        servers.sort();
        assert_eq!(
            servers,
            vec![server("192.0.2.1"), server("192.0.2.2"), server("192.0.2.3")]
        );
    }

    #[test]
    fn test_sequential_short_circuits() {
        let udp = MockExchanger::new(|server, request| match server.ip().to_string().as_str() {
            "192.0.2.1" => respond(request, Rcode::ServFail, vec![]),
            _ => answer_all(server, request),
        });

        let resolver = Resolver::with_exchangers(
            config(&["192.0.2.1", "192.0.2.2", "192.0.2.3"]),
            udp.clone(),
            MockExchanger::unused(),
        );

        let m = resolver.resolve_sequential(&query()).unwrap();
        assert_eq!(m.server(), Some(server("192.0.2.2")));
        assert_eq!(udp.calls(), vec![server("192.0.2.1"), server("192.0.2.2")]);
    }

    #[test]
    fn test_sequential_with_exhausted() {
        let udp = MockExchanger::new(|_, request| respond(request, Rcode::NoError, vec![]));

        let resolver = Resolver::with_exchangers(
            config(&["192.0.2.1", "192.0.2.2"]),
            udp.clone(),
            MockExchanger::unused(),
        );

        // Require answers, which no server has.
        match resolver.resolve_sequential_with(&query(), |m| !m.answers.is_empty()) {
            Err(Error::Aggregate(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(matches!(errors[0], Error::Status(Rcode::NoError)));
            }
            other => panic!("expected Aggregate, got {:?}", other),
        }
        assert_eq!(udp.calls().len(), 2);
    }

    #[test]
    fn test_search() {
        let udp = MockExchanger::new(|server, request| {
            let req = Message::from_slice(request).unwrap();
            if req.questions[0].name == name("printer.example.com") {
                answer_all(server, request)
            } else {
                respond(request, Rcode::NXDomain, vec![])
            }
        });

        let resolver = Resolver::with_exchangers(
            Config {
                search: vec![name("corp.example"), name("example.com")],
                ..config(&["192.0.2.1"])
            },
            udp.clone(),
            MockExchanger::unused(),
        );

        let m = resolver.query("printer", Type::A).unwrap();
        assert_eq!(m.rcode, Rcode::NoError);
        assert_eq!(m.questions[0].name, name("printer.example.com"));
        assert_eq!(udp.calls().len(), 2);

        // Multi label names are not expanded.
        let m = resolver.query("printer.example.com", Type::A).unwrap();
        assert_eq!(m.questions[0].name, name("printer.example.com"));
        assert_eq!(udp.calls().len(), 3);
    }

    #[test]
    fn test_search_prefers_earlier_suffix() {
        let resolver = Resolver::with_exchangers(
            Config {
                search: vec![name("a.example"), name("b.example")],
                ..config(&["192.0.2.1"])
            },
            MockExchanger::new(answer_all),
            MockExchanger::unused(),
        );

        let m = resolver.query("host", Type::A).unwrap();
        assert_eq!(m.questions[0].name, name("host.a.example"));
    }

    #[test]
    fn test_dns0x20() {
        let udp = MockExchanger::new(answer_all);
        let resolver = Resolver::with_exchangers(
            Config {
                dns0x20: true,
                ..config(&["192.0.2.1"])
            },
            udp,
            MockExchanger::unused(),
        );

        let query = Query::new(name("www.example.com"), Type::A);
        let m = resolver.resolve(&query).unwrap();

        // The echoed question may differ in case, but still matches.
        assert!(query == m.questions[0]);
    }

    #[test]
    fn test_lookup() {
        let udp = MockExchanger::new(|_, request| {
            let req = Message::from_slice(request).unwrap();
            let name = req.questions[0].name.clone();
            let resource = match req.questions[0].r#type {
                Type::A => Resource::A("192.0.2.10".parse().unwrap()),
                _ => Resource::AAAA("2001:db8::10".parse().unwrap()),
            };
            let answer = Record {
                name,
                class: Class::Internet,
                ttl: Duration::from_secs(60),
                resource,
            };
            respond(request, Rcode::NoError, vec![answer])
        });

        let resolver =
            Resolver::with_exchangers(config(&["192.0.2.1"]), udp, MockExchanger::unused());

        let ips = resolver.lookup("host.example").unwrap();
        assert_eq!(
            ips,
            vec![
                "192.0.2.10".parse::<IpAddr>().unwrap(),
                "2001:db8::10".parse::<IpAddr>().unwrap(),
            ]
        );
    }

    #[test]
    fn test_lookup_nxdomain() {
        let udp = MockExchanger::new(|_, request| respond(request, Rcode::NXDomain, vec![]));
        let resolver =
            Resolver::with_exchangers(config(&["192.0.2.1"]), udp, MockExchanger::unused());

        match resolver.lookup("missing.example") {
            Err(Error::Aggregate(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(matches!(errors[0], Error::Status(Rcode::NXDomain)));
            }
            other => panic!("expected Aggregate, got {:?}", other),
        }
    }
}
