// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::{
	error::{Error, PlistError, Result},
	plist::{self, Dictionary, Value},
};
use log::warn;
use url::Url;

pub(crate) const MAIN_RESOURCE_KEY: &str = "WebMainResource";
const SUBRESOURCES_KEY: &str = "WebSubresources";
const SUBFRAME_ARCHIVES_KEY: &str = "WebSubframeArchives";
const RESOURCE_URL_KEY: &str = "WebResourceURL";
const RESOURCE_DATA_KEY: &str = "WebResourceData";
const RESOURCE_MIME_TYPE_KEY: &str = "WebResourceMIMEType";
const RESOURCE_TEXT_ENCODING_KEY: &str = "WebResourceTextEncodingName";
const RESOURCE_FRAME_NAME_KEY: &str = "WebResourceFrameName";

const DEFAULT_TEXT_ENCODING: &str = "UTF-8";

const JAVASCRIPT_MIME_TYPES: [&str; 3] = [
	"text/javascript",
	"application/javascript",
	"application/x-javascript",
];

/// The main document of an archive or of one of its sub-frames.
#[derive(Debug, Clone, PartialEq)]
pub struct MainResource {
	pub(crate) url: Url,
	pub(crate) data: Vec<u8>,
	pub(crate) text_encoding: String,
	pub(crate) frame_name: Option<String>,
}

impl MainResource {
	fn from_dict(mut dict: Dictionary) -> Result<Self> {
		let url = take_url(&mut dict).ok_or(Error::MissingResource(RESOURCE_URL_KEY))??;
		let data = dict
			.remove(RESOURCE_DATA_KEY)
			.and_then(Value::into_data)
			.unwrap_or_default();
		let text_encoding = dict
			.remove(RESOURCE_TEXT_ENCODING_KEY)
			.and_then(Value::into_string)
			.filter(|encoding| !encoding.is_empty())
			.unwrap_or_else(|| DEFAULT_TEXT_ENCODING.to_string());
		let frame_name = dict
			.remove(RESOURCE_FRAME_NAME_KEY)
			.and_then(Value::into_string);
		Ok(Self {
			url,
			data,
			text_encoding,
			frame_name,
		})
	}

	/// The URL this document was archived from.
	#[inline]
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// The raw document bytes.
	#[inline]
	pub fn data(&self) -> &[u8] {
		&self.data
	}

	/// The declared text encoding label, `"UTF-8"` when absent.
	#[inline]
	pub fn text_encoding(&self) -> &str {
		&self.text_encoding
	}

	/// The frame name, present on sub-frame main resources.
	#[inline]
	pub fn frame_name(&self) -> Option<&str> {
		self.frame_name.as_deref()
	}
}

/// A stylesheet, image, script, font, or other file the document uses.
#[derive(Debug, Clone, PartialEq)]
pub struct SubResource {
	pub(crate) url: Url,
	pub(crate) data: Vec<u8>,
	pub(crate) mime_type: Option<String>,
}

impl SubResource {
	/// Builds a sub-resource from its dictionary, or skips it (with a log
	/// line) when the entry has no usable URL.
	fn from_dict(mut dict: Dictionary) -> Option<Self> {
		let url = match take_url(&mut dict) {
			Some(Ok(url)) => url,
			Some(Err(error)) => {
				warn!("skipping sub-resource: {error}");
				return None;
			}
			None => {
				warn!("skipping sub-resource without a {RESOURCE_URL_KEY}");
				return None;
			}
		};
		let data = dict
			.remove(RESOURCE_DATA_KEY)
			.and_then(Value::into_data)
			.unwrap_or_default();
		let mime_type = dict
			.remove(RESOURCE_MIME_TYPE_KEY)
			.and_then(Value::into_string);
		Some(Self {
			url,
			data,
			mime_type,
		})
	}

	#[inline]
	pub fn url(&self) -> &Url {
		&self.url
	}

	#[inline]
	pub fn data(&self) -> &[u8] {
		&self.data
	}

	#[inline]
	pub fn mime_type(&self) -> Option<&str> {
		self.mime_type.as_deref()
	}

	/// Whether the declared MIME type is one of the JavaScript types.
	pub fn is_javascript(&self) -> bool {
		self.mime_type.as_deref().is_some_and(|mime| {
			JAVASCRIPT_MIME_TYPES
				.iter()
				.any(|candidate| mime.eq_ignore_ascii_case(candidate))
		})
	}
}

/// A nested webarchive holding the content of a frame or iframe.
///
/// Safari writes one level of these in practice, but the format permits
/// arbitrary nesting, so each sub-frame carries its own children.
#[derive(Debug, Clone, PartialEq)]
pub struct SubframeArchive {
	pub(crate) main: MainResource,
	pub(crate) sub_resources: Vec<SubResource>,
	pub(crate) children: Vec<SubframeArchive>,
}

impl SubframeArchive {
	#[inline]
	pub fn main(&self) -> &MainResource {
		&self.main
	}

	#[inline]
	pub fn sub_resources(&self) -> &[SubResource] {
		&self.sub_resources
	}

	#[inline]
	pub fn children(&self) -> &[SubframeArchive] {
		&self.children
	}
}

/// Typed view over a decoded `.webarchive`.
#[derive(Debug, Clone, PartialEq)]
pub struct WebArchive {
	pub(crate) main: MainResource,
	pub(crate) sub_resources: Vec<SubResource>,
	pub(crate) subframes: Vec<SubframeArchive>,
}

impl WebArchive {
	/// Decodes a `.webarchive` from raw bytes.
	pub fn from_bytes(data: &[u8]) -> Result<Self> {
		Self::from_value(plist::from_bytes(data)?)
	}

	/// Builds the typed view from an already-decoded plist value.
	pub fn from_value(root: Value) -> Result<Self> {
		let dict = root
			.into_dictionary()
			.ok_or(Error::InvalidFile(PlistError::RootNotDictionary))?;
		let (main, sub_resources, subframes) = parse_archive(dict)?;
		Ok(Self {
			main,
			sub_resources,
			subframes,
		})
	}

	#[inline]
	pub fn main(&self) -> &MainResource {
		&self.main
	}

	#[inline]
	pub fn sub_resources(&self) -> &[SubResource] {
		&self.sub_resources
	}

	#[inline]
	pub fn subframes(&self) -> &[SubframeArchive] {
		&self.subframes
	}
}

/// Shared between the top-level archive and nested sub-frame archives:
/// a required main resource plus optional sub-resource and sub-frame lists.
fn parse_archive(
	mut dict: Dictionary,
) -> Result<(MainResource, Vec<SubResource>, Vec<SubframeArchive>)> {
	let main = dict
		.remove(MAIN_RESOURCE_KEY)
		.and_then(Value::into_dictionary)
		.ok_or(Error::MissingResource(MAIN_RESOURCE_KEY))
		.and_then(MainResource::from_dict)?;

	let mut sub_resources = Vec::new();
	for entry in dict
		.remove(SUBRESOURCES_KEY)
		.and_then(Value::into_array)
		.unwrap_or_default()
	{
		match entry.into_dictionary() {
			Some(resource) => sub_resources.extend(SubResource::from_dict(resource)),
			None => warn!("skipping sub-resource entry that is not a dictionary"),
		}
	}

	let mut subframes = Vec::new();
	for entry in dict
		.remove(SUBFRAME_ARCHIVES_KEY)
		.and_then(Value::into_array)
		.unwrap_or_default()
	{
		match entry.into_dictionary() {
			Some(frame) => {
				let (main, sub_resources, children) = parse_archive(frame)?;
				subframes.push(SubframeArchive {
					main,
					sub_resources,
					children,
				});
			}
			None => warn!("skipping sub-frame entry that is not a dictionary"),
		}
	}

	Ok((main, sub_resources, subframes))
}

/// Pulls `WebResourceURL` out of a resource dictionary and parses it.
fn take_url(dict: &mut Dictionary) -> Option<std::result::Result<Url, Error>> {
	let url = dict.remove(RESOURCE_URL_KEY).and_then(Value::into_string)?;
	Some(Url::parse(&url).map_err(|source| Error::InvalidUrl { url, source }))
}
