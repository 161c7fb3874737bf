// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error as ThisError;
use url::ParseError as UrlParseError;

/// Failure modes of the binary property list decoder.
#[derive(Debug, ThisError)]
pub enum PlistError {
	#[error("I/O error: {0}")]
	Io(#[from] IoError),
	#[error("stream is too short to be a binary plist ({0} bytes)")]
	TooShort(u64),
	#[error("bad header magic, expected \"bplist00\"")]
	BadHeader,
	#[error("trailer failed sanity checks: {0}")]
	BadTrailer(&'static str),
	#[error("bad object marker {marker:#04x} at offset {offset}")]
	BadMarker { marker: u8, offset: u64 },
	#[error("unsupported payload width {width} for marker {marker:#04x}")]
	UnsupportedWidth { marker: u8, width: usize },
	#[error("date value {0} is out of representable range")]
	DateOutOfRange(f64),
	#[error("root object is not a dictionary")]
	RootNotDictionary,
}

/// Errors surfaced while extracting a webarchive.
#[derive(Debug, ThisError)]
pub enum Error {
	#[error("I/O error: {0}")]
	Io(#[from] IoError),
	#[error("not a valid webarchive: {0}")]
	InvalidFile(#[from] PlistError),
	#[error("webarchive is missing its {0} entry")]
	MissingResource(&'static str),
	#[error("invalid resource URL {url:?}: {source}")]
	InvalidUrl { url: String, source: UrlParseError },
	#[error("output directory {0} does not exist")]
	OutputDirectoryMissing(PathBuf),
	#[error("unsupported text encoding {0:?}")]
	UnsupportedEncoding(String),
}

pub type Result<T> = std::result::Result<T, Error>;
