// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Decoding of Apple `bplist00` binary property lists.
//!
//! The decoder is table-driven, matching the on-disk format: an offset
//! table maps integer object references to byte offsets, and containers
//! hold references rather than inline values. [`PlistReader`] decodes the
//! whole object table, then materializes the root dictionary, tolerating
//! the cyclic and out-of-range references Safari archives are known to
//! contain. Only `bplist00` is accepted; XML plists are rejected by the
//! header check.

mod reader;
mod value;

#[cfg(test)]
pub(crate) mod encode;

pub use self::{
	reader::PlistReader,
	value::{Dictionary, Value},
};
use crate::error::PlistError;
use std::io::{Cursor, Read};

/// Decodes a `bplist00` document from an in-memory byte slice.
pub fn from_bytes(data: &[u8]) -> Result<Value, PlistError> {
	PlistReader::new(Cursor::new(data)).parse()
}

/// Decodes a `bplist00` document from an arbitrary reader.
///
/// The decoder needs random access, so the stream is buffered into memory
/// first.
pub fn from_reader<R: Read>(mut reader: R) -> Result<Value, PlistError> {
	let mut buffer = Vec::new();
	reader.read_to_end(&mut buffer).map_err(PlistError::Io)?;
	from_bytes(&buffer)
}
