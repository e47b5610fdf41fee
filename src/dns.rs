use crate::bail;
use crate::errors::Result;
use crate::io::{DNSReadExt, SeekExt};
use crate::types::*;
use byteorder::{ReadBytesExt, BE};
use num_traits::FromPrimitive;
use rand::Rng;
use std::io::Cursor;

/// Length of the fixed message header.
pub const HEADER_LEN: usize = 12;

// A helper class to hold state while the parsing is happening.
pub(crate) struct MessageParser<'a> {
    cur: Cursor<&'a [u8]>,

    m: Message,
}

#[derive(Copy, Clone, PartialEq)]
enum RecordSection {
    Answers,
    Authorities,
    Additionals,
}

impl<'a> MessageParser<'a> {
    fn new(buf: &[u8]) -> MessageParser {
        MessageParser {
            cur: Cursor::new(buf),
            m: Message::default(),
        }
    }

    /// Consume the MessageParser and returned the resulting Message.
    fn parse(mut self) -> Result<Message> {
        self.m.id = self.cur.read_u16::<BE>()?;

        let b = self.cur.read_u8()?;
        self.m.qr = QR::from_bool(0b1000_0000 & b != 0);
        let opcode = (0b0111_1000 & b) >> 3;
        self.m.aa = (0b0000_0100 & b) != 0;
        self.m.tc = (0b0000_0010 & b) != 0;
        self.m.rd = (0b0000_0001 & b) != 0;

        self.m.opcode = match FromPrimitive::from_u8(opcode) {
            Some(t) => t,
            None => bail!(Format, "invalid Opcode({})", opcode),
        };

        let b = self.cur.read_u8()?;
        self.m.ra = (0b1000_0000 & b) != 0;
        self.m.z = (0b0100_0000 & b) != 0; // Unused
        self.m.ad = (0b0010_0000 & b) != 0;
        self.m.cd = (0b0001_0000 & b) != 0;
        let rcode = 0b0000_1111 & b;

        self.m.rcode = match FromPrimitive::from_u8(rcode) {
            Some(t) => t,
            None => bail!(Format, "invalid RCode({})", rcode),
        };

        let qd_count = self.cur.read_u16::<BE>()?;
        let an_count = self.cur.read_u16::<BE>()?;
        let ns_count = self.cur.read_u16::<BE>()?;
        let ar_count = self.cur.read_u16::<BE>()?;

        self.read_questions(qd_count)?;
        self.read_records(an_count, RecordSection::Answers)?;
        self.read_records(ns_count, RecordSection::Authorities)?;
        self.read_records(ar_count, RecordSection::Additionals)?;

        if self.cur.remaining() > 0 {
            bail!(
                Format,
                "finished parsing with {} bytes left over",
                self.cur.remaining()
            );
        }

        Ok(self.m)
    }

    fn read_questions(&mut self, count: u16) -> Result<()> {
        // Each question needs at least 5 bytes, so don't trust a huge count.
        self.m
            .questions
            .reserve_exact(usize::from(count).min(self.cur.remaining() / 5));

        for _ in 0..count {
            let name = self.cur.read_name()?;
            let r#type = self.cur.read_type()?;
            let class = self.cur.read_class()?;

            self.m.questions.push(Question {
                name,
                r#type,
                class,
            });
        }

        Ok(())
    }

    fn read_records(&mut self, count: u16, section: RecordSection) -> Result<()> {
        let records = match section {
            RecordSection::Answers => &mut self.m.answers,
            RecordSection::Authorities => &mut self.m.authoritys,
            RecordSection::Additionals => &mut self.m.additionals,
        };
        records.reserve_exact(usize::from(count).min(self.cur.remaining() / 11));

        for _ in 0..count {
            records.push(Record::parse(&mut self.cur)?);
        }

        Ok(())
    }
}

fn write_header(
    buf: &mut Vec<u8>,
    id: u16,
    b1: u8,
    b2: u8,
    counts: [usize; 4],
) -> Result<()> {
    buf.extend_from_slice(&id.to_be_bytes());
    buf.push(b1);
    buf.push(b2);

    for count in &counts {
        if *count > u16::MAX as usize {
            bail!(Format, "too many entries ({}) for one section", count);
        }
        buf.extend_from_slice(&(*count as u16).to_be_bytes());
    }

    Ok(())
}

impl Message {
    /// Decodes a message as defined by [rfc1035].
    ///
    /// No attempt is made to check the message belongs to any query.
    ///
    /// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
    pub fn from_slice(buf: &[u8]) -> Result<Message> {
        MessageParser::new(buf).parse()
    }

    /// Peeks at the TC bit of a raw message, even one that does not parse.
    pub fn is_truncated(buf: &[u8]) -> bool {
        buf.len() >= HEADER_LEN && buf[2] & 0b0000_0010 != 0
    }

    /// Returns this DNS Message as a Vec<u8>, as defined by [rfc1035].
    /// Names are written without compression.
    ///
    /// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut req = Vec::<u8>::with_capacity(512);

        let mut b1 = 0_u8;
        b1 |= if self.qr.to_bool() { 0b1000_0000 } else { 0 };
        b1 |= ((self.opcode as u8) << 3) & 0b0111_1000;
        b1 |= if self.aa { 0b0000_0100 } else { 0 };
        b1 |= if self.tc { 0b0000_0010 } else { 0 };
        b1 |= if self.rd { 0b0000_0001 } else { 0 };

        let mut b2 = 0_u8;
        b2 |= if self.ra { 0b1000_0000 } else { 0 };
        b2 |= if self.z { 0b0100_0000 } else { 0 };
        b2 |= if self.ad { 0b0010_0000 } else { 0 };
        b2 |= if self.cd { 0b0001_0000 } else { 0 };
        b2 |= (self.rcode as u8) & 0b0000_1111;

        write_header(
            &mut req,
            self.id,
            b1,
            b2,
            [
                self.questions.len(),
                self.answers.len(),
                self.authoritys.len(),
                self.additionals.len(),
            ],
        )?;

        for question in &self.questions {
            question.name.write(&mut req);
            req.extend_from_slice(&(question.r#type as u16).to_be_bytes());
            req.extend_from_slice(&(question.class as u16).to_be_bytes());
        }

        for record in self
            .answers
            .iter()
            .chain(&self.authoritys)
            .chain(&self.additionals)
        {
            record.write(&mut req)?;
        }

        Ok(req)
    }
}

#[allow(clippy::len_without_is_empty)]
impl Query {
    /// The exact number of bytes [`Query::to_vec`] produces, computed
    /// without serialising.
    pub fn len(&self) -> usize {
        HEADER_LEN + self.name.wire_len() + 4
    }

    /// Encodes this query as a single question message with the given
    /// transaction id.
    pub fn to_vec(&self, id: u16) -> Vec<u8> {
        let mut req = Vec::with_capacity(self.len());

        let mut b1 = ((self.flags.opcode as u8) << 3) & 0b0111_1000;
        b1 |= if self.flags.rd { 0b0000_0001 } else { 0 };

        let mut b2 = 0_u8;
        b2 |= if self.flags.ad { 0b0010_0000 } else { 0 };
        b2 |= if self.flags.cd { 0b0001_0000 } else { 0 };

        req.extend_from_slice(&id.to_be_bytes());
        req.push(b1);
        req.push(b2);
        req.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 0]); // QDCOUNT=1

        self.name.write(&mut req);
        req.extend_from_slice(&(self.r#type as u16).to_be_bytes());
        req.extend_from_slice(&(self.class as u16).to_be_bytes());

        req
    }

    /// Returns a copy whose name has randomised letter case (DNS 0x20).
    pub fn randomize_case<R: Rng + ?Sized>(&self, rng: &mut R) -> Query {
        self.with_name(self.name.randomize_case(rng))
    }
}
