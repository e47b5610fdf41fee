// Represents a domain name
use crate::bail;
use crate::errors::{Error, Result};
use rand::Rng;
use std::fmt;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A single label within a [`Name`].
#[derive(Clone, Debug)]
pub enum Label {
    /// An ordinary label, stored as the raw bytes that go on the wire. For
    /// internationalised names this is the IDNA (`xn--`) form.
    Text(Vec<u8>),

    /// A binary (bit-string) label, see [rfc2673]. `bits` holds `count`
    /// significant bits, most significant first, padded with zeros to a
    /// whole number of bytes.
    ///
    /// [rfc2673]: https://datatracker.ietf.org/doc/html/rfc2673
    Binary { bits: Vec<u8>, count: u16 },
}

impl Label {
    /// The label type byte used on the wire for binary labels.
    pub(crate) const BINARY_TYPE: u8 = 0x41;

    /// Number of bytes this label takes on the wire, including its
    /// length (or type) prefix.
    pub fn wire_len(&self) -> usize {
        match self {
            Label::Text(text) => 1 + text.len(),
            Label::Binary { bits, .. } => 2 + bits.len(),
        }
    }

    fn write(&self, buf: &mut Vec<u8>) {
        match self {
            Label::Text(text) => {
                buf.push(text.len() as u8);
                buf.extend_from_slice(text);
            }
            Label::Binary { bits, count } => {
                buf.push(Self::BINARY_TYPE);
                buf.push(*count as u8); // 256 is sent as zero
                buf.extend_from_slice(bits);
            }
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Label::Text(a), Label::Text(b)) => a.eq_ignore_ascii_case(b),
            (
                Label::Binary { bits: a, count: n },
                Label::Binary { bits: b, count: m },
            ) => n == m && a == b,
            _ => false,
        }
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Label::Text(text) => {
                0u8.hash(state);
                for b in text {
                    b.to_ascii_lowercase().hash(state);
                }
            }
            Label::Binary { bits, count } => {
                1u8.hash(state);
                bits.hash(state);
                count.hash(state);
            }
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Label::Text(text) => {
                for &b in text {
                    match b {
                        b if is_safe(b) => f.write_char(b as char)?,
                        0x21..=0x7E => write!(f, "\\{}", b as char)?,
                        _ => write!(f, "\\{:03}", b)?,
                    }
                }
                Ok(())
            }
            Label::Binary { bits, count } => {
                f.write_str("\\[x")?;
                for b in bits {
                    write!(f, "{:02X}", b)?;
                }
                write!(f, "/{}]", count)
            }
        }
    }
}

/// A domain name, as a sequence of labels. The root is the empty sequence.
///
/// Names compare and hash ASCII case-insensitively, as required by [rfc4343].
///
/// ```rust
/// use dnsquery::Name;
/// use std::str::FromStr;
///
/// let name = Name::from_str("www.Example.com").unwrap();
/// assert_eq!(name.to_string(), "www.Example.com.");
/// assert_eq!(name, Name::from_str("WWW.EXAMPLE.COM.").unwrap());
/// ```
///
/// [rfc4343]: https://datatracker.ietf.org/doc/html/rfc4343
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Name {
    labels: Vec<Label>,
}

impl Name {
    /// Restricts the length of a domain label to 63 characters. [RFC1034]
    pub const MAX_LABEL_LEN: usize = 63;

    /// Returns the root name `.`.
    pub fn root() -> Name {
        Name { labels: Vec::new() }
    }

    pub(crate) fn from_labels(labels: Vec<Label>) -> Name {
        Name { labels }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// True for names such as `localhost` or `printer`, which are candidates
    /// for search suffix expansion.
    pub fn is_single_label(&self) -> bool {
        self.labels.len() == 1
    }

    /// Returns this name without its first label, or None for the root.
    pub fn parent(&self) -> Option<Name> {
        if self.is_root() {
            return None;
        }
        Some(Name {
            labels: self.labels[1..].to_vec(),
        })
    }

    /// Returns a new name made of this name followed by `suffix`.
    pub fn join(&self, suffix: &Name) -> Name {
        let mut labels = self.labels.clone();
        labels.extend_from_slice(&suffix.labels);
        Name { labels }
    }

    /// Returns a copy with the case of every ASCII letter randomised
    /// (DNS 0x20). The copy is equal to the original.
    pub fn randomize_case<R: Rng + ?Sized>(&self, rng: &mut R) -> Name {
        let labels = self
            .labels
            .iter()
            .map(|label| match label {
                Label::Text(text) => Label::Text(
                    text.iter()
                        .map(|b| {
                            if b.is_ascii_alphabetic() && rng.gen::<bool>() {
                                b ^ 0x20
                            } else {
                                *b
                            }
                        })
                        .collect(),
                ),
                binary => binary.clone(),
            })
            .collect();

        Name { labels }
    }

    /// The number of bytes [`Name::write`] emits.
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(Label::wire_len).sum::<usize>() + 1
    }

    /// Writes the uncompressed wire form of this name.
    pub fn write(&self, buf: &mut Vec<u8>) {
        for label in &self.labels {
            label.write(buf);
        }
        buf.push(0);
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len());
        self.write(&mut buf);
        buf
    }

    /// Returns the name with any IDNA labels converted back to Unicode.
    pub fn to_unicode(&self) -> String {
        let (unicode, _) = idna::domain_to_unicode(&self.to_string());
        unicode
    }

    // Converts the unescaped bytes of a label into its wire form. Labels
    // with non-ASCII or unescaped unsafe characters must pass IDNA.
    fn valid_label(label: &[u8], needs_idna: bool, name: &str) -> Result<Label> {
        if label.is_empty() {
            bail!(Format, "'{}' is not a legal name (empty label)", name);
        }

        let label = if needs_idna {
            let text = std::str::from_utf8(label)
                .map_err(|e| Error::Format(format!("invalid label in '{}': {}", name, e)))?;

            let ascii = match idna::Config::default()
                .use_std3_ascii_rules(true)
                .to_ascii(text)
            {
                Ok(ascii) => ascii,
                Err(e) => bail!(Format, "label '{}' is not valid IDNA: {:?}", text, e),
            };
            if ascii.contains('.') {
                bail!(Format, "label '{}' maps to more than one label", text);
            }
            ascii.into_bytes()
        } else {
            label.to_vec()
        };

        if label.len() > Name::MAX_LABEL_LEN {
            bail!(
                Format,
                "'{}' is not a legal name (label longer than {})",
                name,
                Name::MAX_LABEL_LEN
            );
        }

        Ok(Label::Text(label))
    }
}

impl FromStr for Name {
    type Err = Error;

    /// Parses a domain name in presentation format. The trailing dot is
    /// optional, `\X`, `\DDD` and `\[xHEX/N]` escapes are honoured, and
    /// other labels are IDNA encoded unless they are plain letters, digits,
    /// `-` and `_`.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s == "." {
            return Ok(Name::root());
        }

        let mut labels = Vec::new();
        let mut label = Vec::new();
        let mut needs_idna = false;

        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    labels.push(Name::valid_label(&label, needs_idna, s)?);
                    label.clear();
                    needs_idna = false;
                }
                '\\' => match chars.next() {
                    None => bail!(Format, "'{}' ends with an incomplete escape", s),
                    Some('[') if label.is_empty() => {
                        let mut body = String::new();
                        loop {
                            match chars.next() {
                                Some(']') => break,
                                Some(c) => body.push(c),
                                None => bail!(Format, "'{}' has an unterminated binary label", s),
                            }
                        }
                        labels.push(binary_label(&body, s)?);

                        match chars.next() {
                            None | Some('.') => {}
                            Some(_) => bail!(Format, "'{}' has text after a binary label", s),
                        }
                    }
                    Some(d) if d.is_ascii_digit() => {
                        let mut value = d as u32 - '0' as u32;
                        for _ in 0..2 {
                            match chars.next() {
                                Some(d) if d.is_ascii_digit() => {
                                    value = value * 10 + (d as u32 - '0' as u32)
                                }
                                _ => bail!(Format, "'{}' has an invalid \\DDD escape", s),
                            }
                        }
                        if value > 255 {
                            bail!(Format, "'{}' has an escape larger than 255", s);
                        }
                        label.push(value as u8);
                    }
                    Some(c) if c.is_ascii() => label.push(c as u8),
                    Some(c) => push_char(&mut label, c, &mut needs_idna),
                },
                c => push_char(&mut label, c, &mut needs_idna),
            }
        }

        // Absent when the name had a trailing dot.
        if !label.is_empty() {
            labels.push(Name::valid_label(&label, needs_idna, s)?);
        }

        Ok(Name { labels })
    }
}

// Letters, digits, '-' and '_' appear unescaped, in text and on display.
fn is_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn push_char(label: &mut Vec<u8>, c: char, needs_idna: &mut bool) {
    if c.is_ascii() && is_safe(c as u8) {
        label.push(c as u8);
    } else {
        let mut buf = [0; 4];
        label.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        *needs_idna = true;
    }
}

// Parses the body of a `\[xHEX/N]` label, see [rfc2673#section-3.1].
//
// [rfc2673#section-3.1]: https://datatracker.ietf.org/doc/html/rfc2673#section-3.1
fn binary_label(body: &str, name: &str) -> Result<Label> {
    let hex_and_count = body.strip_prefix('x').or_else(|| body.strip_prefix('X'));
    let (hex, count) = match hex_and_count {
        Some(rest) => match rest.split_once('/') {
            Some((hex, count)) => (hex, Some(count)),
            None => (rest, None),
        },
        None => bail!(Format, "'{}' has a binary label that is not hex", name),
    };

    if hex.is_empty()
        || hex.len() % 2 != 0
        || hex.len() > 64
        || !hex.bytes().all(|b| b.is_ascii_hexdigit())
    {
        bail!(Format, "'{}' has an invalid binary label '{}'", name, hex);
    }

    let bits = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map_err(|e| Error::Format(format!("'{}' has an invalid binary label: {}", name, e)))?;

    let count = match count {
        Some(count) => count
            .parse::<u16>()
            .map_err(|e| Error::Format(format!("'{}' has an invalid bit count: {}", name, e)))?,
        None => (bits.len() * 8) as u16,
    };
    if count == 0 || count > 256 || (count as usize + 7) / 8 != bits.len() {
        bail!(
            Format,
            "'{}' has a binary label of {} bytes with {} bits",
            name,
            bits.len(),
            count
        );
    }

    Ok(Label::Binary { bits, count })
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.labels.is_empty() {
            return write!(f, ".");
        }

        for label in &self.labels {
            write!(f, "{}.", label)?
        }

        Ok(())
    }
}
