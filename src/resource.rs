use crate::bail;
use crate::errors::{Error, Result};
use crate::io::{DNSReadExt, SeekExt};
use crate::name::Label;
use crate::types::{Record, Resource, Type};
use crate::Name;
use byteorder::{ReadBytesExt, BE};
use log::debug;
use num_traits::FromPrimitive;
use std::io::Cursor;
use std::io::Read;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Mail exchange (MX) record.
#[derive(Clone, Debug, PartialEq)]
pub struct MX {
    /// The preference given to this RR among others at the same owner.
    /// Lower values are preferred.
    pub preference: u16,

    /// A host willing to act as a mail exchange for the owner name.
    pub exchange: Name,
}

/// Start of Authority (SOA) record.
#[derive(Clone, Debug, PartialEq)]
pub struct SOA {
    /// The name server that was the original or primary source of data for this zone.
    pub mname: Name,

    /// The mailbox of the person responsible for this zone.
    pub rname: Mailbox,

    /// The version number of the original copy of the zone.
    pub serial: u32,

    /// Time interval before the zone should be refreshed.
    pub refresh: Duration,

    /// Time interval that should elapse before a failed refresh should be retried.
    pub retry: Duration,

    /// Time value that specifies the upper limit on the time interval that
    /// can elapse before the zone is no longer authoritative.
    pub expire: Duration,

    /// The negative caching TTL, see [rfc2308].
    ///
    /// [rfc2308]: https://datatracker.ietf.org/doc/html/rfc2308
    pub minimum: Duration,
}

/// An email address stored as a domain name, as used by the SOA RNAME field.
///
/// `hostmaster.example.com.` is the mailbox `hostmaster@example.com`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mailbox {
    pub local: String,
    pub domain: Name,
}

impl Mailbox {
    /// Interprets a name as a mailbox. If the first label already contains
    /// an `@` it is split there, otherwise the first label is the local part.
    pub fn from_name(name: &Name) -> Mailbox {
        let labels = name.labels();
        let first = match labels.first() {
            Some(Label::Text(text)) => text,
            _ => {
                return Mailbox {
                    local: String::new(),
                    domain: name.clone(),
                }
            }
        };

        let rest = Name::from_labels(labels[1..].to_vec());

        match first.iter().position(|&b| b == b'@') {
            Some(at) => {
                let mut domain = Vec::new();
                if at + 1 < first.len() {
                    domain.push(Label::Text(first[at + 1..].to_vec()));
                }
                Mailbox {
                    local: String::from_utf8_lossy(&first[..at]).into_owned(),
                    domain: Name::from_labels(domain).join(&rest),
                }
            }
            None => Mailbox {
                local: String::from_utf8_lossy(first).into_owned(),
                domain: rest,
            },
        }
    }

    /// Returns the mailbox in its domain name form. Fails if the local part
    /// does not fit in one label.
    pub fn to_name(&self) -> Result<Name> {
        if self.local.is_empty() {
            return Ok(self.domain.clone());
        }
        if self.local.len() > Name::MAX_LABEL_LEN {
            bail!(
                Format,
                "mailbox local part of {} bytes is longer than {}",
                self.local.len(),
                Name::MAX_LABEL_LEN
            );
        }

        let local = Name::from_labels(vec![self.local_label()]);
        Ok(local.join(&self.domain))
    }

    pub(crate) fn local_label(&self) -> Label {
        Label::Text(self.local.as_bytes().to_vec())
    }
}

/// Text (TXT) record, one or more character-strings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TXT(pub Vec<Vec<u8>>);

impl TXT {
    /// Longest character-string that fits its one byte length prefix.
    pub const MAX_STRING_LEN: usize = 255;
}

impl From<&str> for TXT {
    fn from(txt: &str) -> TXT {
        TXT(vec![txt.as_bytes().to_vec()])
    }
}

impl From<&[&str]> for TXT {
    fn from(txts: &[&str]) -> TXT {
        TXT(txts.iter().map(|t| t.as_bytes().to_vec()).collect())
    }
}

fn read_seconds(cur: &mut Cursor<&[u8]>) -> Result<Duration> {
    // Negative values are treated as zero (rfc2181 section 8).
    let secs = cur.read_i32::<BE>()?;
    Ok(Duration::from_secs(secs.max(0) as u64))
}

fn write_seconds(buf: &mut Vec<u8>, d: Duration) {
    let secs = d.as_secs().min(i32::MAX as u64) as u32;
    buf.extend_from_slice(&secs.to_be_bytes());
}

impl Resource {
    /// Parses the RDATA of a `r#type` record, which must consume exactly
    /// `len` bytes from `cur`. The cursor covers the whole message so that
    /// compressed names can be followed.
    ///
    /// Returns [`Error::UnsupportedRecordType`], without consuming anything,
    /// when there is no decoder for the type.
    pub fn parse(cur: &mut Cursor<&[u8]>, r#type: u16, len: u16) -> Result<Resource> {
        let start = cur.position();

        let r#type: Type = match FromPrimitive::from_u16(r#type) {
            Some(t) => t,
            None => return Err(Error::UnsupportedRecordType(r#type)),
        };

        let resource = match r#type {
            Type::A => {
                if len != 4 {
                    bail!(Format, "invalid A record length ({}) expected 4", len);
                }
                let mut ip = [0; 4];
                cur.read_exact(&mut ip)?;
                Resource::A(Ipv4Addr::from(ip))
            }

            Type::AAAA => {
                if len != 16 {
                    bail!(Format, "invalid AAAA record length ({}) expected 16", len);
                }
                let mut ip = [0; 16];
                cur.read_exact(&mut ip)?;
                Resource::AAAA(Ipv6Addr::from(ip))
            }

            Type::NS => Resource::NS(cur.read_name()?),
            Type::CNAME => Resource::CNAME(cur.read_name()?),

            Type::MX => Resource::MX(MX {
                preference: cur.read_u16::<BE>()?,
                exchange: cur.read_name()?,
            }),

            Type::SOA => Resource::SOA(SOA {
                mname: cur.read_name()?,
                rname: Mailbox::from_name(&cur.read_name()?),
                serial: cur.read_u32::<BE>()?,
                refresh: read_seconds(cur)?,
                retry: read_seconds(cur)?,
                expire: read_seconds(cur)?,
                minimum: read_seconds(cur)?,
            }),

            Type::TXT => {
                let end = start + len as u64;
                let mut txts = Vec::new();
                while cur.position() < end {
                    let n = cur.read_u8()?;
                    let mut txt = vec![0; n.into()];
                    cur.read_exact(&mut txt)?;
                    txts.push(txt);
                }
                Resource::TXT(TXT(txts))
            }
        };

        let used = cur.position() - start;
        if used != len as u64 {
            bail!(
                Format,
                "{} record used {} bytes but its length is {}",
                r#type,
                used,
                len
            );
        }

        Ok(resource)
    }

    /// Writes the RDATA (without the RDLENGTH prefix).
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Resource::A(ip) => buf.extend_from_slice(&ip.octets()),
            Resource::AAAA(ip) => buf.extend_from_slice(&ip.octets()),

            Resource::NS(name) | Resource::CNAME(name) => name.write(buf),

            Resource::MX(mx) => {
                buf.extend_from_slice(&mx.preference.to_be_bytes());
                mx.exchange.write(buf);
            }

            Resource::SOA(soa) => {
                soa.mname.write(buf);
                soa.rname.to_name()?.write(buf);
                buf.extend_from_slice(&soa.serial.to_be_bytes());
                write_seconds(buf, soa.refresh);
                write_seconds(buf, soa.retry);
                write_seconds(buf, soa.expire);
                write_seconds(buf, soa.minimum);
            }

            Resource::TXT(txt) => {
                for part in &txt.0 {
                    if part.len() > TXT::MAX_STRING_LEN {
                        bail!(
                            Format,
                            "TXT string of {} bytes is longer than {}",
                            part.len(),
                            TXT::MAX_STRING_LEN
                        );
                    }
                    buf.push(part.len() as u8);
                    buf.extend_from_slice(part);
                }
            }

            Resource::Unknown { data, .. } => buf.extend_from_slice(data),
        }

        Ok(())
    }
}

impl Record {
    /// Parses one resource record starting at the cursor's position.
    ///
    /// Records of an unsupported type are returned as [`Resource::Unknown`].
    pub fn parse(cur: &mut Cursor<&[u8]>) -> Result<Record> {
        let name = cur.read_name()?;
        let r#type = cur.read_u16::<BE>()?;
        let class = cur.read_class()?;
        let ttl = read_seconds(cur)?;
        let len = cur.read_u16::<BE>()?;

        if usize::from(len) > cur.remaining() {
            return Err(Error::TruncatedRecord {
                rdlength: len,
                remaining: cur.remaining(),
            });
        }

        let resource = match Resource::parse(cur, r#type, len) {
            Ok(resource) => resource,
            Err(Error::UnsupportedRecordType(code)) => {
                debug!("keeping {} byte record of unsupported type {} for {}", len, code, name);
                let mut data = vec![0; len.into()];
                cur.read_exact(&mut data)?;
                Resource::Unknown { r#type: code, data }
            }
            Err(e) => return Err(e),
        };

        Ok(Record {
            name,
            class,
            ttl,
            resource,
        })
    }

    /// Writes this record, without name compression.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.name.write(buf);
        buf.extend_from_slice(&self.type_code().to_be_bytes());
        buf.extend_from_slice(&(self.class as u16).to_be_bytes());
        write_seconds(buf, self.ttl);

        let len_pos = buf.len();
        buf.extend_from_slice(&[0, 0]);
        self.resource.write(buf)?;

        let len = buf.len() - len_pos - 2;
        if len > u16::MAX as usize {
            bail!(Format, "record data of {} bytes is too long", len);
        }
        buf[len_pos..len_pos + 2].copy_from_slice(&(len as u16).to_be_bytes());

        Ok(())
    }
}
