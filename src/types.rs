use crate::clients::Stats;
use crate::resource::{MX, SOA, TXT};
use crate::Name;
use std::hash::{Hash, Hasher};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// DNS Message that serves as the root of all DNS responses (and the
/// queries built by [`Query::to_vec`]).
///
/// # Examples
///
/// Decoding a response and printing it in `dig` style:
///
/// ```rust
/// use dnsquery::{Message, Rcode};
///
/// // A response for "example.com. IN A" with a single answer.
/// let buf = [
///     0x12, 0x34, 0x81, 0x80, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
///     0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00,
///     0x00, 0x01, 0x00, 0x01,
///     0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x0e, 0x10, 0x00, 0x04,
///     192, 0, 2, 1,
/// ];
///
/// let m = Message::from_slice(&buf).expect("invalid response");
/// assert_eq!(m.rcode, Rcode::NoError);
/// assert_eq!(m.answers[0].resource.to_string(), "192.0.2.1");
/// println!("{}", m);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    /// 16-bit identifier assigned by the program that generates any kind of
    /// query. This identifier is copied into the corresponding reply and can be
    /// used by the requester to match up replies to outstanding queries.
    pub id: u16,

    /// Recursion Desired - this bit directs the name server to pursue the query
    /// recursively.
    pub rd: bool,

    /// Truncation - specifies that this message was truncated.
    pub tc: bool,

    /// Authoritative Answer - Specifies that the responding name server is an
    /// authority for the domain name in question section.
    pub aa: bool,

    /// Specifies kind of query in this message. 0 represents a standard query.
    /// See <https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-5>
    pub opcode: Opcode,

    /// Specifies whether this message is a query (0), or a response (1).
    pub qr: QR,

    /// Response code.
    pub rcode: Rcode,

    /// Checking Disabled. See [RFC4035] and [RFC6840].
    ///
    /// [rfc4035]: https://datatracker.ietf.org/doc/html/rfc4035
    /// [rfc6840]: https://datatracker.ietf.org/doc/html/rfc6840
    pub cd: bool,

    /// Authentic Data. See [RFC4035] and [RFC6840].
    ///
    /// [rfc4035]: https://datatracker.ietf.org/doc/html/rfc4035
    /// [rfc6840]: https://datatracker.ietf.org/doc/html/rfc6840
    pub ad: bool,

    /// Z Reserved for future use. You must set this field to 0.
    pub z: bool,

    /// Recursion Available - this be is set or cleared in a response, and
    /// denotes whether recursive query support is available in the name server.
    pub ra: bool,

    /// The questions.
    pub questions: Vec<Question>,

    /// The answer records.
    pub answers: Vec<Record>,

    /// The authoritive records.
    pub authoritys: Vec<Record>,

    /// The additional records.
    pub additionals: Vec<Record>,

    /// How and from where this message was received. Only set on responses
    /// returned by a client.
    pub stats: Option<Stats>,
}

impl Message {
    /// The server this response came from, if known.
    pub fn server(&self) -> Option<SocketAddr> {
        self.stats.as_ref().map(|s| s.server)
    }
}

/// DNS Question, as echoed back in a response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Question {
    pub name: Name,
    pub r#type: Type,
    pub class: Class,
}

/// A single question to send, together with the header flags to send it with.
///
/// Two queries are equal when their name (case-insensitively), type and
/// class are equal. The flags are deliberately ignored, as they do not
/// change which answers match.
///
/// ```rust
/// use dnsquery::{Query, Type};
///
/// let query = Query::new("example.com".parse()?, Type::MX);
/// assert_eq!(query.len(), query.to_vec(0x1234).len());
/// # Ok::<(), dnsquery::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct Query {
    pub name: Name,
    pub r#type: Type,
    pub class: Class,
    pub flags: Flags,
}

impl Query {
    /// Creates a recursive Internet class query.
    pub fn new(name: Name, r#type: Type) -> Query {
        Query {
            name,
            r#type,
            class: Class::Internet,
            flags: Flags::default(),
        }
    }

    /// Returns a copy of this query for a different name.
    pub fn with_name(&self, name: Name) -> Query {
        Query {
            name,
            ..self.clone()
        }
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.r#type == other.r#type && self.class == other.class
    }
}

impl Eq for Query {}

impl Hash for Query {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.r#type.hash(state);
        self.class.hash(state);
    }
}

impl PartialEq<Question> for Query {
    fn eq(&self, other: &Question) -> bool {
        self.name == other.name && self.r#type == other.r#type && self.class == other.class
    }
}

/// Header flags set on an outgoing query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Flags {
    pub opcode: Opcode,

    /// Recursion Desired.
    pub rd: bool,

    /// Authentic Data, asks the server to report whether the answer was validated.
    pub ad: bool,

    /// Checking Disabled.
    pub cd: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Flags {
            opcode: Opcode::Query,
            rd: true,
            ad: false,
            cd: false,
        }
    }
}

/// Resource Record (RR)
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub name: Name,

    pub class: Class,

    /// The number of seconds that the resource record may be cached
    /// before the source of the information should again be consulted.
    /// Zero is interpreted to mean that the RR can only be used for the
    /// transaction in progress.
    pub ttl: Duration,

    pub resource: Resource,
}

impl Record {
    /// The record's type, or None if it is not one this crate decodes.
    pub fn r#type(&self) -> Option<Type> {
        self.resource.r#type()
    }

    /// The record's type as found on the wire.
    pub fn type_code(&self) -> u16 {
        self.resource.type_code()
    }
}

#[derive(Copy, Clone, Debug, EnumString, PartialEq)]
pub enum QR {
    Query = 0,
    Response = 1,
}

impl Default for QR {
    fn default() -> Self {
        QR::Query
    }
}

impl QR {
    pub fn from_bool(b: bool) -> QR {
        match b {
            false => QR::Query,
            true => QR::Response,
        }
    }

    pub fn to_bool(self) -> bool {
        match self {
            QR::Query => false,
            QR::Response => true,
        }
    }
}

/// Specifies kind of query in this message. See [rfc1035], [rfc6895] and <https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-5>
///
/// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
/// [rfc6895]: https://datatracker.ietf.org/doc/html/rfc6895
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[repr(u8)] // Really only 4 bits
pub enum Opcode {
    /// Query.
    Query = 0,

    /// Inverse Query (OBSOLETE). See [rfc3425].
    ///
    /// [rfc3425]: https://datatracker.ietf.org/doc/html/rfc3425
    IQuery = 1,
    Status = 2,

    /// See [rfc1996]
    ///
    /// [rfc1996]: https://datatracker.ietf.org/doc/html/rfc1996
    Notify = 4,

    /// See [rfc2136]
    ///
    /// [rfc2136]: https://datatracker.ietf.org/doc/html/rfc2136
    Update = 5,

    /// DNS Stateful Operations (DSO). See [rfc8490]
    ///
    /// [rfc8490]: https://datatracker.ietf.org/doc/html/rfc8490
    DSO = 6,
    // 3 and 7-15 Remain unassigned.
}

impl Default for Opcode {
    fn default() -> Self {
        Opcode::Query
    }
}

/// Response Codes.
/// See [rfc1035] and <https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-6>
///
/// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[repr(u8)] // 4 bits in the header, the extended form needs EDNS(0)
pub enum Rcode {
    /// No Error
    NoError = 0,

    /// Format Error
    FormErr = 1,

    /// Server Failure
    ServFail = 2,

    /// Non-Existent Domain
    NXDomain = 3,

    /// Not Implemented
    NotImp = 4,

    /// Query Refused
    Refused = 5,

    /// Name Exists when it should not. See [rfc2136] and [rfc6672].
    ///
    /// [rfc2136]: https://datatracker.ietf.org/doc/html/rfc2136
    /// [rfc6672]: https://datatracker.ietf.org/doc/html/rfc6672
    YXDomain = 6,

    /// RR Set Exists when it should not. See [rfc2136].
    ///
    /// [rfc2136]: https://datatracker.ietf.org/doc/html/rfc2136
    YXRRSet = 7,

    /// RR Set that should exist does not. See [rfc2136].
    ///
    /// [rfc2136]: https://datatracker.ietf.org/doc/html/rfc2136
    NXRRSet = 8,

    /// Not Authoritative [rfc2136] or Not Authorized [rfc2845].
    ///
    /// [rfc2136]: https://datatracker.ietf.org/doc/html/rfc2136
    /// [rfc2845]: https://datatracker.ietf.org/doc/html/rfc2845
    NotAuth = 9,

    /// Name not contained in zone. See [rfc2136].
    ///
    /// [rfc2136]: https://datatracker.ietf.org/doc/html/rfc2136
    NotZone = 10,

    /// DSO-TYPE Not Implemented. See [rfc8490].
    ///
    /// [rfc8490]: https://datatracker.ietf.org/doc/html/rfc8490
    DSOTYPENI = 11,
    // 12-15 Unassigned
}

impl Default for Rcode {
    fn default() -> Self {
        Rcode::NoError
    }
}

/// Resource Record Type, for example, A, CNAME or SOA.
///
/// Only the types this crate can decode are listed. Records of any other
/// type are kept as [`Resource::Unknown`].
// When adding a Type, a parsing function must be added in resource.rs.
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
#[repr(u16)]
pub enum Type {
    /// (Default) IPv4 Address.
    A = 1,

    /// Authoritative name server.
    NS = 2,

    /// Canonical name (alias).
    CNAME = 5,

    /// Start of a zone of authority.
    SOA = 6,

    /// Mail exchange.
    MX = 15,

    /// Text strings.
    TXT = 16,

    /// IPv6 Address. See [rfc3596].
    ///
    /// [rfc3596]: https://datatracker.ietf.org/doc/html/rfc3596
    AAAA = 28,
}

impl Default for Type {
    fn default() -> Self {
        Type::A
    }
}

/// Resource Record Class, for example Internet.
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Class {
    /// Reserved per [RFC6895]
    ///
    /// [rfc6895]: https://datatracker.ietf.org/doc/html/rfc6895
    Reserved = 0,

    /// (Default) The Internet (IN), see [rfc1035].
    ///
    /// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
    #[strum(serialize = "IN")]
    Internet = 1,

    /// CSNET (CS), obsolete (used only for examples in some obsolete RFCs).
    #[strum(serialize = "CS")]
    CsNet = 2,

    /// Chaosnet (CH), obsolete LAN protocol created at MIT in the mid-1970s.
    #[strum(serialize = "CH")]
    Chaos = 3,

    /// Hesiod (HS), an information service developed by MIT's Project Athena.
    #[strum(serialize = "HS")]
    Hesiod = 4,

    None = 254, // NONE [RFC2136]

    /// * (ANY) See [rfc1035]
    ///
    /// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
    #[strum(serialize = "*")]
    Any = 255,
    //     5-253     Unassigned
    //   256-65279   Unassigned
    // 65280-65534   Reserved for Private Use    [RFC6895]
    // 65535         Reserved    [RFC6895]
}

impl Default for Class {
    fn default() -> Self {
        Class::Internet
    }
}

// This should be kept in sync with Type.
#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Resource {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),

    CNAME(Name),
    NS(Name),

    // TODO Implement RFC 1464 for further parsing of the text
    TXT(TXT),

    MX(MX),
    SOA(SOA),

    /// The raw RDATA of a record whose type is not decoded.
    Unknown { r#type: u16, data: Vec<u8> },
}

impl Resource {
    /// The Type of this resource, or None for [`Resource::Unknown`].
    pub fn r#type(&self) -> Option<Type> {
        Some(match self {
            Resource::A(_) => Type::A,
            Resource::AAAA(_) => Type::AAAA,
            Resource::CNAME(_) => Type::CNAME,
            Resource::NS(_) => Type::NS,
            Resource::TXT(_) => Type::TXT,
            Resource::MX(_) => Type::MX,
            Resource::SOA(_) => Type::SOA,
            Resource::Unknown { .. } => return None,
        })
    }

    pub fn type_code(&self) -> u16 {
        match self {
            Resource::Unknown { r#type, .. } => *r#type,
            known => known.r#type().map_or(0, |t| t as u16),
        }
    }
}
