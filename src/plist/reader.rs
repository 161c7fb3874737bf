// SPDX-License-Identifier: Apache-2.0 OR MIT
use super::value::{Dictionary, Value};
use crate::error::PlistError;
use byteorder::{BigEndian, ReadBytesExt};
use chrono::{DateTime, Utc};
use log::debug;
use std::io::{Error as IoError, ErrorKind, Read, Seek, SeekFrom};

/// "bplist00" read as two big-endian words.
const MAGIC_HIGH: u32 = 0x6270_6C69;
const MAGIC_LOW: u32 = 0x7374_3030;
/// Header plus trailer; nothing shorter can carry even an empty plist.
const MIN_STREAM_LEN: u64 = 40;
const TRAILER_LEN: u64 = 32;
/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z.
const REFERENCE_EPOCH_UNIX: i64 = 978_307_200;

/// A decoded object-table entry. Arrays and dictionaries hold raw object
/// references until materialization; everything else decodes eagerly.
enum RawObject {
	Scalar(Value),
	Array(Vec<u64>),
	Dict { keys: Vec<u64>, values: Vec<u64> },
}

/// Decoder for `bplist00` binary property lists.
///
/// The input must be seekable; [`super::from_reader`] buffers non-seekable
/// sources into memory first.
pub struct PlistReader<R: Read + Seek> {
	input: R,
	stream_len: u64,
	offset_int_size: usize,
	object_ref_size: usize,
	object_count: u64,
	top_object: u64,
	offset_table_offset: u64,
}

impl<R: Read + Seek> PlistReader<R> {
	pub fn new(input: R) -> Self {
		Self {
			input,
			stream_len: 0,
			offset_int_size: 0,
			object_ref_size: 0,
			object_count: 0,
			top_object: 0,
			offset_table_offset: 0,
		}
	}

	/// Decodes the plist and returns its root dictionary.
	pub fn parse(mut self) -> Result<Value, PlistError> {
		self.stream_len = self.input.seek(SeekFrom::End(0))?;
		if self.stream_len < MIN_STREAM_LEN {
			return Err(PlistError::TooShort(self.stream_len));
		}
		self.read_header()?;
		self.read_trailer()?;
		let offsets = self.read_offset_table()?;
		let mut objects = Vec::with_capacity(offsets.len());
		for offset in offsets {
			objects.push(self.read_object(offset)?);
		}
		let root = materialize(&objects, self.top_object, &mut Vec::new())
			.ok_or(PlistError::RootNotDictionary)?;
		match root {
			Value::Dictionary(_) => Ok(root),
			_ => Err(PlistError::RootNotDictionary),
		}
	}

	fn read_header(&mut self) -> Result<(), PlistError> {
		self.input.seek(SeekFrom::Start(0))?;
		let high = self.input.read_u32::<BigEndian>()?;
		let low = self.input.read_u32::<BigEndian>()?;
		if high != MAGIC_HIGH || low != MAGIC_LOW {
			return Err(PlistError::BadHeader);
		}
		Ok(())
	}

	/// Reads the trailer and applies its sanity constraints. The 6 unused
	/// bytes of the 32-byte trailer are skipped by seeking to the last 26.
	fn read_trailer(&mut self) -> Result<(), PlistError> {
		self.input.seek(SeekFrom::Start(self.stream_len - 26))?;
		let offset_int_size = usize::from(self.input.read_u8()?);
		let object_ref_size = usize::from(self.input.read_u8()?);
		let object_count = self.input.read_i64::<BigEndian>()?;
		let top_object = self.input.read_i64::<BigEndian>()?;
		let offset_table_offset = self.input.read_i64::<BigEndian>()?;

		if !(1..=8).contains(&offset_int_size) {
			return Err(PlistError::BadTrailer("offset int size must be 1..=8"));
		}
		if !(1..=8).contains(&object_ref_size) {
			return Err(PlistError::BadTrailer("object ref size must be 1..=8"));
		}
		if offset_table_offset < 8 {
			return Err(PlistError::BadTrailer("offset table overlaps the header"));
		}
		if object_count < 0 || top_object < 0 || top_object >= object_count {
			return Err(PlistError::BadTrailer("top-level object out of range"));
		}
		let table_len = (object_count as u64)
			.checked_mul(offset_int_size as u64)
			.and_then(|len| len.checked_add(offset_table_offset as u64))
			.and_then(|end| end.checked_add(TRAILER_LEN));
		match table_len {
			Some(end) if end <= self.stream_len => {}
			_ => {
				return Err(PlistError::BadTrailer(
					"offset table extends past the trailer",
				))
			}
		}

		self.offset_int_size = offset_int_size;
		self.object_ref_size = object_ref_size;
		self.object_count = object_count as u64;
		self.top_object = top_object as u64;
		self.offset_table_offset = offset_table_offset as u64;
		Ok(())
	}

	fn read_offset_table(&mut self) -> Result<Vec<u64>, PlistError> {
		self.input.seek(SeekFrom::Start(self.offset_table_offset))?;
		let mut offsets = Vec::with_capacity(self.object_count as usize);
		for _ in 0..self.object_count {
			offsets.push(self.read_be_uint(self.offset_int_size)?);
		}
		Ok(offsets)
	}

	fn read_object(&mut self, offset: u64) -> Result<RawObject, PlistError> {
		self.input.seek(SeekFrom::Start(offset))?;
		loop {
			let marker_offset = self.input.stream_position()?;
			let marker = self.input.read_u8()?;
			let object = match marker >> 4 {
				0x0 => match marker & 0x0F {
					0x0 => RawObject::Scalar(Value::Null),
					0x8 => RawObject::Scalar(Value::Boolean(false)),
					0x9 => RawObject::Scalar(Value::Boolean(true)),
					// Fill byte, skip to the next marker.
					0xF => continue,
					_ => {
						return Err(PlistError::BadMarker {
							marker,
							offset: marker_offset,
						})
					}
				},
				0x1 => RawObject::Scalar(self.read_integer(marker)?),
				0x2 => RawObject::Scalar(self.read_real(marker)?),
				0x3 => RawObject::Scalar(self.read_date(marker)?),
				0x4 => {
					let count = self.read_count(marker)?;
					RawObject::Scalar(Value::Data(self.take_bytes(count)?))
				}
				0x5 => {
					let count = self.read_count(marker)?;
					let bytes = self.take_bytes(count)?;
					RawObject::Scalar(Value::AsciiString(
						String::from_utf8_lossy(&bytes).into_owned(),
					))
				}
				0x6 => {
					let count = self.read_count(marker)?;
					RawObject::Scalar(Value::UnicodeString(self.read_utf16(count)?))
				}
				0x8 => {
					let width = usize::from(marker & 0x0F) + 1;
					if width > 8 {
						return Err(PlistError::UnsupportedWidth { marker, width });
					}
					RawObject::Scalar(Value::Uid(self.read_be_uint(width)?))
				}
				0xA | 0xC => {
					let count = self.read_count(marker)?;
					RawObject::Array(self.read_refs(count)?)
				}
				0xD => {
					let count = self.read_count(marker)?;
					let keys = self.read_refs(count)?;
					let values = self.read_refs(count)?;
					RawObject::Dict { keys, values }
				}
				_ => {
					return Err(PlistError::BadMarker {
						marker,
						offset: marker_offset,
					})
				}
			};
			return Ok(object);
		}
	}

	/// Integers widen unsigned from 1/2/4 bytes; 8 bytes is the raw
	/// two's-complement value.
	fn read_integer(&mut self, marker: u8) -> Result<Value, PlistError> {
		let width = 1_usize << (marker & 0x0F);
		let value = match width {
			1 => i64::from(self.input.read_u8()?),
			2 => i64::from(self.input.read_u16::<BigEndian>()?),
			4 => i64::from(self.input.read_u32::<BigEndian>()?),
			8 => self.input.read_i64::<BigEndian>()?,
			_ => return Err(PlistError::UnsupportedWidth { marker, width }),
		};
		Ok(Value::Integer(value))
	}

	fn read_real(&mut self, marker: u8) -> Result<Value, PlistError> {
		let width = 1_usize << (marker & 0x0F);
		let value = match width {
			4 => f64::from(self.input.read_f32::<BigEndian>()?),
			8 => self.input.read_f64::<BigEndian>()?,
			_ => return Err(PlistError::UnsupportedWidth { marker, width }),
		};
		Ok(Value::Real(value))
	}

	fn read_date(&mut self, marker: u8) -> Result<Value, PlistError> {
		// Dates are always an 8-byte float, so the size nibble must be 3.
		if marker & 0x0F != 0x3 {
			let width = 1_usize << (marker & 0x0F);
			return Err(PlistError::UnsupportedWidth { marker, width });
		}
		let seconds = self.input.read_f64::<BigEndian>()?;
		Ok(Value::Date(reference_date(seconds)?))
	}

	fn read_utf16(&mut self, count: u64) -> Result<String, PlistError> {
		let bytes = self.take_bytes(count.saturating_mul(2))?;
		let units = bytes
			.chunks_exact(2)
			.map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
			.collect::<Vec<_>>();
		Ok(String::from_utf16_lossy(&units))
	}

	/// Reads the element count from a marker's size nibble, following the
	/// trailing integer object when the nibble is `0xF`.
	fn read_count(&mut self, marker: u8) -> Result<u64, PlistError> {
		let nibble = marker & 0x0F;
		if nibble != 0x0F {
			return Ok(u64::from(nibble));
		}
		let count_offset = self.input.stream_position()?;
		let count_marker = self.input.read_u8()?;
		if count_marker >> 4 != 0x1 {
			return Err(PlistError::BadMarker {
				marker: count_marker,
				offset: count_offset,
			});
		}
		let width = 1_usize << (count_marker & 0x0F);
		match width {
			1 | 2 | 4 | 8 => self.read_be_uint(width),
			_ => Err(PlistError::UnsupportedWidth {
				marker: count_marker,
				width,
			}),
		}
	}

	fn read_refs(&mut self, count: u64) -> Result<Vec<u64>, PlistError> {
		self.check_remaining(count.saturating_mul(self.object_ref_size as u64))?;
		let mut refs = Vec::with_capacity(count as usize);
		for _ in 0..count {
			refs.push(self.read_be_uint(self.object_ref_size)?);
		}
		Ok(refs)
	}

	/// Big-endian unsigned integer of 1 to 8 bytes.
	fn read_be_uint(&mut self, width: usize) -> Result<u64, PlistError> {
		let mut buffer = [0_u8; 8];
		self.input.read_exact(&mut buffer[..width])?;
		Ok(buffer[..width]
			.iter()
			.fold(0_u64, |acc, &byte| (acc << 8) | u64::from(byte)))
	}

	fn take_bytes(&mut self, count: u64) -> Result<Vec<u8>, PlistError> {
		self.check_remaining(count)?;
		let mut bytes = vec![0_u8; count as usize];
		self.input.read_exact(&mut bytes)?;
		Ok(bytes)
	}

	/// Refuses counts that cannot possibly fit in the stream, so a corrupt
	/// length cannot drive a giant allocation.
	fn check_remaining(&self, count: u64) -> Result<(), PlistError> {
		if count > self.stream_len {
			return Err(PlistError::Io(IoError::from(ErrorKind::UnexpectedEof)));
		}
		Ok(())
	}
}

/// Resolves an object reference into a value.
///
/// `trail` holds the indices currently being materialized; a reference to
/// any of them would recurse forever, so it is skipped instead (arrays omit
/// the element, dictionaries omit the pair). Out-of-range references are
/// skipped the same way, matching what Safari's own output tolerates.
fn materialize(objects: &[RawObject], index: u64, trail: &mut Vec<u64>) -> Option<Value> {
	if trail.contains(&index) {
		debug!("skipping cyclic object reference {index}");
		return None;
	}
	let object = match objects.get(index as usize) {
		Some(object) => object,
		None => {
			debug!("skipping out-of-range object reference {index}");
			return None;
		}
	};
	match object {
		RawObject::Scalar(value) => Some(value.clone()),
		RawObject::Array(refs) => {
			trail.push(index);
			let values = refs
				.iter()
				.filter_map(|&reference| materialize(objects, reference, trail))
				.collect();
			trail.pop();
			Some(Value::Array(values))
		}
		RawObject::Dict { keys, values } => {
			trail.push(index);
			let mut dict = Dictionary::new();
			for (&key_ref, &value_ref) in keys.iter().zip(values.iter()) {
				let Some(key) =
					materialize(objects, key_ref, trail).and_then(Value::into_string)
				else {
					debug!("skipping dictionary entry with unusable key object {key_ref}");
					continue;
				};
				let Some(value) = materialize(objects, value_ref, trail) else {
					debug!("skipping dictionary entry {key:?} with unusable value");
					continue;
				};
				dict.insert(key, value);
			}
			trail.pop();
			Some(Value::Dictionary(dict))
		}
	}
}

fn reference_date(seconds: f64) -> Result<DateTime<Utc>, PlistError> {
	if !seconds.is_finite() {
		return Err(PlistError::DateOutOfRange(seconds));
	}
	let millis = (REFERENCE_EPOCH_UNIX as f64).mul_add(1000.0, seconds * 1000.0);
	DateTime::from_timestamp_millis(millis as i64).ok_or(PlistError::DateOutOfRange(seconds))
}
