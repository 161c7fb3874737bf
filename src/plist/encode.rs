// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Test-only `bplist00` emitter, used to build decoder and extractor
//! fixtures in code. One object per value, pre-order indices, 1-byte
//! object references; nothing here is part of the public surface.
use super::value::Value;

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z.
const REFERENCE_EPOCH_UNIX: i64 = 978_307_200;

enum Flat<'a> {
	Scalar(&'a Value),
	Key(&'a str),
	Array(Vec<usize>),
	Dict { keys: Vec<usize>, values: Vec<usize> },
}

pub(crate) fn to_bytes(root: &Value) -> Vec<u8> {
	let mut flat = Vec::new();
	flatten(root, &mut flat);
	assert!(flat.len() <= u8::MAX as usize, "fixture too large for 1-byte refs");

	let mut out = Vec::new();
	out.extend_from_slice(b"bplist00");
	let mut offsets = Vec::new();
	for object in &flat {
		offsets.push(out.len() as u64);
		emit_object(object, &mut out);
	}
	let table_offset = out.len() as u64;
	let offset_int_size = be_width(table_offset);
	for offset in offsets {
		out.extend_from_slice(&offset.to_be_bytes()[8 - offset_int_size..]);
	}
	out.extend_from_slice(&[0_u8; 6]);
	out.push(offset_int_size as u8);
	out.push(1); // object ref size
	out.extend_from_slice(&(flat.len() as i64).to_be_bytes());
	out.extend_from_slice(&0_i64.to_be_bytes());
	out.extend_from_slice(&(table_offset as i64).to_be_bytes());
	out
}

fn flatten<'a>(value: &'a Value, flat: &mut Vec<Flat<'a>>) -> usize {
	let id = flat.len();
	match value {
		Value::Array(items) => {
			flat.push(Flat::Array(Vec::new()));
			let children = items.iter().map(|item| flatten(item, flat)).collect();
			flat[id] = Flat::Array(children);
		}
		Value::Dictionary(dict) => {
			flat.push(Flat::Dict {
				keys: Vec::new(),
				values: Vec::new(),
			});
			let mut keys = Vec::new();
			for (key, _) in dict.iter() {
				keys.push(flat.len());
				flat.push(Flat::Key(key));
			}
			let mut values = Vec::new();
			for (_, value) in dict.iter() {
				values.push(flatten(value, flat));
			}
			flat[id] = Flat::Dict { keys, values };
		}
		scalar => flat.push(Flat::Scalar(scalar)),
	}
	id
}

fn emit_object(object: &Flat, out: &mut Vec<u8>) {
	match object {
		Flat::Scalar(Value::Null) => out.push(0x00),
		Flat::Scalar(Value::Boolean(false)) => out.push(0x08),
		Flat::Scalar(Value::Boolean(true)) => out.push(0x09),
		Flat::Scalar(Value::Integer(value)) => emit_integer(*value, out),
		Flat::Scalar(Value::Real(value)) => {
			out.push(0x23);
			out.extend_from_slice(&value.to_be_bytes());
		}
		Flat::Scalar(Value::Date(date)) => {
			let seconds =
				(date.timestamp_millis() - REFERENCE_EPOCH_UNIX * 1000) as f64 / 1000.0;
			out.push(0x33);
			out.extend_from_slice(&seconds.to_be_bytes());
		}
		Flat::Scalar(Value::Data(bytes)) => {
			emit_marker(0x4, bytes.len() as u64, out);
			out.extend_from_slice(bytes);
		}
		Flat::Scalar(Value::AsciiString(string)) => emit_string(string, out),
		Flat::Scalar(Value::UnicodeString(string)) => emit_string(string, out),
		Flat::Key(key) => emit_string(key, out),
		Flat::Scalar(Value::Uid(value)) => {
			let width = be_width(*value);
			out.push(0x80 | (width as u8 - 1));
			out.extend_from_slice(&value.to_be_bytes()[8 - width..]);
		}
		Flat::Array(children) => {
			emit_marker(0xA, children.len() as u64, out);
			out.extend(children.iter().map(|&child| child as u8));
		}
		Flat::Dict { keys, values } => {
			emit_marker(0xD, keys.len() as u64, out);
			out.extend(keys.iter().map(|&key| key as u8));
			out.extend(values.iter().map(|&value| value as u8));
		}
		Flat::Scalar(Value::Array(_) | Value::Dictionary(_)) => {
			unreachable!("containers are flattened before emission")
		}
	}
}

fn emit_string(string: &str, out: &mut Vec<u8>) {
	if string.is_ascii() {
		emit_marker(0x5, string.len() as u64, out);
		out.extend_from_slice(string.as_bytes());
	} else {
		let units = string.encode_utf16().collect::<Vec<_>>();
		emit_marker(0x6, units.len() as u64, out);
		for unit in units {
			out.extend_from_slice(&unit.to_be_bytes());
		}
	}
}

fn emit_integer(value: i64, out: &mut Vec<u8>) {
	if value < 0 {
		out.push(0x13);
		out.extend_from_slice(&value.to_be_bytes());
	} else if value <= i64::from(u8::MAX) {
		out.push(0x10);
		out.push(value as u8);
	} else if value <= i64::from(u16::MAX) {
		out.push(0x11);
		out.extend_from_slice(&(value as u16).to_be_bytes());
	} else if value <= i64::from(u32::MAX) {
		out.push(0x12);
		out.extend_from_slice(&(value as u32).to_be_bytes());
	} else {
		out.push(0x13);
		out.extend_from_slice(&value.to_be_bytes());
	}
}

/// Marker byte with an inline size nibble, spilling counts of 15 or more
/// into a trailing integer object.
fn emit_marker(high_nibble: u8, count: u64, out: &mut Vec<u8>) {
	if count < 0x0F {
		out.push((high_nibble << 4) | count as u8);
	} else {
		out.push((high_nibble << 4) | 0x0F);
		emit_integer(count as i64, out);
	}
}

/// Minimal big-endian byte width (1, 2, 4, or 8) that holds `value`.
fn be_width(value: u64) -> usize {
	if value <= u64::from(u8::MAX) {
		1
	} else if value <= u64::from(u16::MAX) {
		2
	} else if value <= u64::from(u32::MAX) {
		4
	} else {
		8
	}
}
