//! Various traits to help parsing of DNS messages.

use crate::bail;
use crate::errors::{Error, Result};
use crate::name::{Label, Name};
use crate::types::{Class, Type};
use byteorder::{ReadBytesExt, BE};
use num_traits::FromPrimitive;
use std::io;
use std::io::Cursor;
use std::io::SeekFrom;

/// Maximum number of compression pointers followed while reading one name.
pub const MAX_POINTER_HOPS: usize = 128;

pub trait SeekExt {
    /// Returns the number of bytes remaining to be consumed.
    /// This is used as a way to check for malformed input.
    fn remaining(&self) -> usize;
}

impl<'a> SeekExt for Cursor<&'a [u8]> {
    fn remaining(&self) -> usize {
        let len = self.get_ref().len() as u64;
        len.saturating_sub(self.position()) as usize
    }
}

/// All types that implement `Read` and `Seek` get methods defined
/// in `DNSReadExt` for free.
impl<R: io::Read + ?Sized + io::Seek> DNSReadExt for R {}

/// Extensions to io::Read to add some DNS specific types.
pub trait DNSReadExt: io::Read + io::Seek {
    /// Reads a (possibly compressed) domain name.
    ///
    /// On return the reader is positioned just after the name as it appears
    /// at the starting position, that is, just after the first compression
    /// pointer if one was followed.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedLabelType`] for extended label types other than the
    /// binary label, and [`Error::Format`] for short input, pointers that do
    /// not point strictly backwards, or more than [`MAX_POINTER_HOPS`] jumps.
    fn read_name(&mut self) -> Result<Name> {
        let mut labels = Vec::new();

        // Where to continue once the name is complete. Only the first pointer
        // followed decides this.
        let mut resume = None;
        let mut hops = 0;

        loop {
            let pos = self.stream_position()?;
            let len = self.read_u8()?;

            match len {
                0 => break,

                1..=63 => {
                    let mut label = vec![0; len.into()];
                    self.read_exact(&mut label)?;
                    labels.push(Label::Text(label));
                }

                Label::BINARY_TYPE => {
                    let count = match self.read_u8()? {
                        0 => 256,
                        n => n as u16,
                    };
                    let mut bits = vec![0; ((count + 7) / 8).into()];
                    self.read_exact(&mut bits)?;
                    labels.push(Label::Binary { bits, count });
                }

                0xC0..=0xFF => {
                    // Read the 14 bit pointer.
                    let b2 = self.read_u8()? as u64;
                    let ptr = (len as u64 & 0x3F) << 8 | b2;

                    // Make sure we don't get into a loop.
                    if ptr >= pos {
                        bail!(
                            Format,
                            "compression pointer at offset {} does not point backwards (to {})",
                            pos,
                            ptr
                        );
                    }
                    hops += 1;
                    if hops > MAX_POINTER_HOPS {
                        bail!(Format, "more than {} compression pointers", MAX_POINTER_HOPS);
                    }

                    if resume.is_none() {
                        resume = Some(self.stream_position()?);
                    }
                    self.seek(SeekFrom::Start(ptr))?;
                }

                _ => return Err(Error::UnsupportedLabelType(len)),
            }
        }

        if let Some(pos) = resume {
            self.seek(SeekFrom::Start(pos))?;
        }

        Ok(Name::from_labels(labels))
    }

    /// Reads a question Type.
    fn read_type(&mut self) -> Result<Type> {
        let r#type = self.read_u16::<BE>()?;
        match FromPrimitive::from_u16(r#type) {
            Some(t) => Ok(t),
            None => bail!(Format, "unsupported question Type({})", r#type),
        }
    }

    /// Reads a DNS Class.
    fn read_class(&mut self) -> Result<Class> {
        let class = self.read_u16::<BE>()?;
        match FromPrimitive::from_u16(class) {
            Some(c) => Ok(c),
            None => bail!(Format, "invalid Class({})", class),
        }
    }
}
