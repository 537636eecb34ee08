//! Individual API messages.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_messages>

use std::io::{Read, Write};

use thiserror::Error;

use super::{
    api_key::ApiKey,
    api_version::ApiVersion,
    primitives::{read_compact_len, write_compact_len},
    traits::{ReadError, ReadType, WriteError, WriteType},
};

mod alter_partition_reassignments;
mod header;
mod metadata;
#[cfg(test)]
mod test_utils;

pub use alter_partition_reassignments::*;
pub use header::*;
pub use metadata::*;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReadVersionedError {
    #[error("Read error: {0}")]
    ReadError(#[from] ReadError),
}

pub trait ReadVersionedType<R>: Sized
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError>;
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WriteVersionedError {
    #[error("Write error: {0}")]
    WriteError(#[from] WriteError),

    #[error("Field {field} not available in version: {version}")]
    FieldNotAvailable { version: ApiVersion, field: String },
}

pub trait WriteVersionedType<W>: Sized
where
    W: Write,
{
    fn write_versioned(&self, writer: &mut W, version: ApiVersion)
        -> Result<(), WriteVersionedError>;
}

/// A request the transport knows how to send.
///
/// No version negotiation happens; every request is sent at [`API_VERSION`](Self::API_VERSION).
pub trait RequestBody {
    type ResponseBody;

    const API_KEY: ApiKey;

    /// The version this crate encodes the request at.
    const API_VERSION: ApiVersion;

    /// First version of this API using flexible (tagged field) headers.
    const FIRST_TAGGED_FIELD_IN_REQUEST_VERSION: ApiVersion;

    /// Request header version matching [`API_VERSION`](Self::API_VERSION).
    fn request_header_version() -> ApiVersion {
        if Self::API_VERSION >= Self::FIRST_TAGGED_FIELD_IN_REQUEST_VERSION {
            ApiVersion::new(2)
        } else {
            ApiVersion::new(1)
        }
    }

    /// Response header version matching [`API_VERSION`](Self::API_VERSION).
    fn response_header_version() -> ApiVersion {
        if Self::API_VERSION >= Self::FIRST_TAGGED_FIELD_IN_REQUEST_VERSION {
            ApiVersion::new(1)
        } else {
            ApiVersion::new(0)
        }
    }
}

fn read_versioned_array<R: Read, T: ReadVersionedType<R>>(
    reader: &mut R,
    version: ApiVersion,
) -> Result<Option<Vec<T>>, ReadVersionedError> {
    let len = i32::read(reader)?;
    match len {
        -1 => Ok(None),
        l if l < -1 => Err(ReadVersionedError::ReadError(ReadError::Malformed(
            format!("Invalid negative length for array: {l}").into(),
        ))),
        _ => {
            let len = usize::try_from(len).map_err(ReadError::Overflow)?;
            let mut res = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                res.push(T::read_versioned(reader, version)?);
            }
            Ok(Some(res))
        }
    }
}

fn write_versioned_array<W: Write, T: WriteVersionedType<W>>(
    writer: &mut W,
    version: ApiVersion,
    data: Option<&[T]>,
) -> Result<(), WriteVersionedError> {
    match data {
        None => Ok((-1i32).write(writer)?),
        Some(inner) => {
            let len = i32::try_from(inner.len()).map_err(WriteError::from)?;
            len.write(writer)?;

            for element in inner {
                element.write_versioned(writer, version)?;
            }

            Ok(())
        }
    }
}

fn read_compact_versioned_array<R: Read, T: ReadVersionedType<R>>(
    reader: &mut R,
    version: ApiVersion,
) -> Result<Option<Vec<T>>, ReadVersionedError> {
    match read_compact_len(reader)? {
        None => Ok(None),
        Some(len) => {
            let mut res = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                res.push(T::read_versioned(reader, version)?);
            }
            Ok(Some(res))
        }
    }
}

fn write_compact_versioned_array<W: Write, T: WriteVersionedType<W>>(
    writer: &mut W,
    version: ApiVersion,
    data: Option<&[T]>,
) -> Result<(), WriteVersionedError> {
    write_compact_len(writer, data.map(<[T]>::len))?;

    for element in data.unwrap_or_default() {
        element.write_versioned(writer, version)?;
    }

    Ok(())
}
