//! Primitive types.
//!
//! Only the subset needed by the admin messages is implemented.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_types>
//! - <https://cwiki.apache.org/confluence/display/KAFKA/KIP-482%3A+The+Kafka+Protocol+should+Support+Optional+Tagged+Fields#KIP482:TheKafkaProtocolshouldSupportOptionalTaggedFields-UnsignedVarints>

use std::io::{Read, Write};

use crate::protocol::traits::{
    ReadCompactType, ReadError, ReadType, WriteCompactType, WriteError, WriteType,
};

/// Upper bound for up-front allocations driven by lengths read off the wire.
///
/// Longer payloads still decode, the buffer just grows while reading.
const MAX_PREALLOC: usize = 64 * 1024;

/// Reads exactly `len` bytes without trusting `len` for the initial allocation.
fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, ReadError> {
    let mut buf = Vec::with_capacity(len.min(MAX_PREALLOC));
    let wanted = u64::try_from(len)?;
    let got = reader.by_ref().take(wanted).read_to_end(&mut buf)?;
    if got != len {
        return Err(ReadError::IO(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected {len} bytes, got {got}"),
        )));
    }
    Ok(buf)
}

fn read_utf8<R: Read>(reader: &mut R, len: usize) -> Result<String, ReadError> {
    let buf = read_bytes(reader, len)?;
    String::from_utf8(buf).map_err(|e| ReadError::Malformed(Box::new(e)))
}

impl<R: Read> ReadType<R> for bool {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(buf[0] != 0)
    }
}

impl<W: Write> WriteType<W> for bool {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&[u8::from(*self)])?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for i16 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for i16 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for i32 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for i32 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

/// The UNSIGNED_VARINT type describes an unsigned variable length integer.
///
/// To serialize a number as a variable-length integer, you break it up into groups of 7 bits. The lowest 7 bits is
/// written out first, followed by the second-lowest, and so on.  Each time a group of 7 bits is written out, the high
/// bit (bit 8) is cleared if this group is the last one, and set if it is not.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct UnsignedVarint(pub u64);

impl<R: Read> ReadType<R> for UnsignedVarint {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 1];
        let mut res: u64 = 0;
        let mut shift = 0;
        loop {
            reader.read_exact(&mut buf)?;
            let c = u64::from(buf[0]);

            res |= (c & 0x7f) << shift;
            shift += 7;

            if (c & 0x80) == 0 {
                break;
            }
            if shift > 63 {
                return Err(ReadError::Malformed(
                    "Overflow while reading unsigned varint".into(),
                ));
            }
        }

        Ok(Self(res))
    }
}

impl<W: Write> WriteType<W> for UnsignedVarint {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let mut curr = self.0;
        loop {
            let mut c = u8::try_from(curr & 0x7f)?;
            curr >>= 7;
            if curr > 0 {
                c |= 0x80;
            }
            writer.write_all(&[c])?;

            if curr == 0 {
                break;
            }
        }
        Ok(())
    }
}

/// Reads the length prefix of a compact string/array. `None` means null.
pub(crate) fn read_compact_len<R: Read>(reader: &mut R) -> Result<Option<usize>, ReadError> {
    match UnsignedVarint::read(reader)?.0 {
        0 => Ok(None),
        len => Ok(Some(usize::try_from(len - 1)?)),
    }
}

/// Writes the length prefix of a compact string/array. `None` means null.
pub(crate) fn write_compact_len<W: Write>(
    writer: &mut W,
    len: Option<usize>,
) -> Result<(), WriteError> {
    let raw = match len {
        None => 0,
        Some(len) => u64::try_from(len)? + 1,
    };
    UnsignedVarint(raw).write(writer)
}

// STRING
impl<R: Read> ReadType<R> for String {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i16::read(reader)?;
        let len = usize::try_from(len).map_err(|e| ReadError::Malformed(Box::new(e)))?;
        read_utf8(reader, len)
    }
}

impl<W: Write> WriteType<W> for String {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        i16::try_from(self.len())?.write(writer)?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }
}

// NULLABLE_STRING
impl<R: Read> ReadType<R> for Option<String> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        match i16::read(reader)? {
            -1 => Ok(None),
            l if l < -1 => Err(ReadError::Malformed(
                format!("Invalid negative length for nullable string: {l}").into(),
            )),
            l => Ok(Some(read_utf8(reader, usize::try_from(l)?)?)),
        }
    }
}

impl<W: Write> WriteType<W> for Option<String> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        match self {
            Some(s) => s.write(writer),
            None => (-1i16).write(writer),
        }
    }
}

// COMPACT_STRING
impl<R: Read> ReadCompactType<R> for String {
    fn read_compact(reader: &mut R) -> Result<Self, ReadError> {
        match read_compact_len(reader)? {
            None => Err(ReadError::Malformed(
                "CompactString must have non-zero length".into(),
            )),
            Some(len) => read_utf8(reader, len),
        }
    }
}

impl<W: Write> WriteCompactType<W> for String {
    fn write_compact(&self, writer: &mut W) -> Result<(), WriteError> {
        write_compact_len(writer, Some(self.len()))?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }
}

// COMPACT_NULLABLE_STRING
impl<R: Read> ReadCompactType<R> for Option<String> {
    fn read_compact(reader: &mut R) -> Result<Self, ReadError> {
        match read_compact_len(reader)? {
            None => Ok(None),
            Some(len) => Ok(Some(read_utf8(reader, len)?)),
        }
    }
}

impl<W: Write> WriteCompactType<W> for Option<String> {
    fn write_compact(&self, writer: &mut W) -> Result<(), WriteError> {
        match self {
            Some(s) => s.write_compact(writer),
            None => write_compact_len(writer, None),
        }
    }
}

// ARRAY<INT32>, a null array reads as empty
impl<R: Read> ReadType<R> for Vec<i32> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        if len == -1 {
            return Ok(vec![]);
        }

        let len = usize::try_from(len)?;
        let mut res = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            res.push(i32::read(reader)?);
        }
        Ok(res)
    }
}

impl<W: Write> WriteType<W> for Vec<i32> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        i32::try_from(self.len())?.write(writer)?;
        for elmt in self {
            elmt.write(writer)?;
        }
        Ok(())
    }
}

// COMPACT_ARRAY<INT32>. Empty and null are distinct on the wire.
impl<R: Read> ReadCompactType<R> for Vec<i32> {
    fn read_compact(reader: &mut R) -> Result<Self, ReadError> {
        let len = read_compact_len(reader)?.unwrap_or_default();
        let mut res = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            res.push(i32::read(reader)?);
        }
        Ok(res)
    }
}

impl<W: Write> WriteCompactType<W> for Vec<i32> {
    fn write_compact(&self, writer: &mut W) -> Result<(), WriteError> {
        write_compact_len(writer, Some(self.len()))?;
        for elmt in self {
            elmt.write(writer)?;
        }
        Ok(())
    }
}

/// Represents a section containing optional tagged fields.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Clone)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct TaggedFields(pub Vec<(UnsignedVarint, Vec<u8>)>);

impl<R: Read> ReadType<R> for TaggedFields {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = usize::try_from(UnsignedVarint::read(reader)?.0)?;
        let mut res = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            let tag = UnsignedVarint::read(reader)?;
            let data_len = usize::try_from(UnsignedVarint::read(reader)?.0)?;
            res.push((tag, read_bytes(reader, data_len)?));
        }
        Ok(Self(res))
    }
}

impl<W: Write> WriteType<W> for TaggedFields {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        UnsignedVarint(u64::try_from(self.0.len())?).write(writer)?;

        for (tag, data) in &self.0 {
            tag.write(writer)?;
            UnsignedVarint(u64::try_from(data.len())?).write(writer)?;
            writer.write_all(data)?;
        }

        Ok(())
    }
}

impl<W: Write> WriteType<W> for Option<TaggedFields> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        match self {
            Some(tagged_fields) => tagged_fields.write(writer),
            None => TaggedFields::default().write(writer),
        }
    }
}
