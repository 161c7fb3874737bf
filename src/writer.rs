// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::{archive::SubResource, error::Result};
use log::{debug, warn};
use std::{fs, path::Path};
use url::Url;
use uuid::Uuid;

/// Writes sub-resource payloads under an output directory, mirroring each
/// resource's URL path.
///
/// Returned paths are `/`-separated relatives suitable for substitution
/// into the document, and always name the file actually written.
pub struct ResourceWriter<'a> {
	out_dir: &'a Path,
}

impl<'a> ResourceWriter<'a> {
	pub fn new(out_dir: &'a Path) -> Self {
		Self { out_dir }
	}

	/// Writes one sub-resource and returns its relative path, or `None`
	/// when the resource is skipped (non-local URL, directory listing, or
	/// a path that sanitizes away).
	pub fn write(&self, resource: &SubResource, main_url: &Url) -> Result<Option<String>> {
		let local_path = resource.url().path();
		if !local_path.starts_with('/') {
			debug!("skipping non-local resource {}", resource.url());
			return Ok(None);
		}
		let relative = local_path
			.strip_prefix(main_url.path())
			.unwrap_or(local_path)
			.trim_start_matches('/');
		if relative.is_empty() || relative.ends_with('/') {
			debug!("skipping directory listing {}", resource.url());
			return Ok(None);
		}
		let Some(mut relative) = sanitize(relative) else {
			warn!("skipping resource with unsafe path {}", resource.url());
			return Ok(None);
		};

		let mut path = self.out_dir.join(&relative);
		if self.collides(&path) {
			let fresh = Uuid::new_v4().to_string();
			debug!(
				"path collision for {}, writing as {fresh}",
				resource.url()
			);
			path = self.out_dir.join(&fresh);
			relative = fresh;
		}
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::write(&path, resource.data())?;
		Ok(Some(relative))
	}

	/// The collision cases that force a fresh name: the path already exists
	/// (as a file or a directory), or an intended ancestor directory
	/// already exists as a file.
	fn collides(&self, path: &Path) -> bool {
		if path.exists() {
			return true;
		}
		let mut ancestor = path.parent();
		while let Some(dir) = ancestor {
			if dir == self.out_dir {
				break;
			}
			if dir.is_file() {
				return true;
			}
			ancestor = dir.parent();
		}
		false
	}
}

/// Rebuilds a relative path from its segments, dropping `.`, `..`, and
/// empty segments so the joined path cannot leave the output directory.
/// Returns `None` when nothing remains.
fn sanitize(relative: &str) -> Option<String> {
	let segments = relative
		.split('/')
		.filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
		.collect::<Vec<_>>();
	if segments.is_empty() {
		return None;
	}
	Some(segments.join("/"))
}

#[cfg(test)]
mod test {
	use super::{sanitize, ResourceWriter};
	use crate::archive::SubResource;
	use std::fs;
	use tempfile::tempdir;
	use url::Url;

	fn resource(url: &str, data: &[u8]) -> SubResource {
		SubResource {
			url: Url::parse(url).expect("bad test url"),
			data: data.to_vec(),
			mime_type: None,
		}
	}

	fn main_url(url: &str) -> Url {
		Url::parse(url).expect("bad test url")
	}

	#[test]
	fn mirrors_the_url_path() {
		let dir = tempdir().expect("failed to create temp dir");
		let writer = ResourceWriter::new(dir.path());
		let written = writer
			.write(
				&resource("https://ex.com/a/b.png", &[0x89, 0x50, 0x4E, 0x47]),
				&main_url("https://ex.com/p"),
			)
			.expect("write failed");
		assert_eq!(written.as_deref(), Some("a/b.png"));
		let contents = fs::read(dir.path().join("a/b.png")).expect("missing output file");
		assert_eq!(contents, [0x89, 0x50, 0x4E, 0x47]);
	}

	#[test]
	fn strips_the_main_document_prefix() {
		let dir = tempdir().expect("failed to create temp dir");
		let writer = ResourceWriter::new(dir.path());
		let written = writer
			.write(
				&resource("https://ex.com/docs/img/x.png", b"x"),
				&main_url("https://ex.com/docs/"),
			)
			.expect("write failed");
		assert_eq!(written.as_deref(), Some("img/x.png"));
		assert!(dir.path().join("img/x.png").is_file());
	}

	#[test]
	fn collisions_fall_back_to_fresh_names() {
		let dir = tempdir().expect("failed to create temp dir");
		let writer = ResourceWriter::new(dir.path());
		let main = main_url("https://ex.com/");
		let first = resource("https://ex.com/logo.png", b"first");
		let second = resource("https://ex.com/logo.png", b"second");
		assert_eq!(
			writer.write(&first, &main).expect("write failed").as_deref(),
			Some("logo.png")
		);
		let renamed = writer
			.write(&second, &main)
			.expect("write failed")
			.expect("second write was skipped");
		assert_ne!(renamed, "logo.png");
		assert!(!renamed.contains('/'));
		assert_eq!(fs::read(dir.path().join("logo.png")).unwrap(), b"first");
		assert_eq!(fs::read(dir.path().join(&renamed)).unwrap(), b"second");
	}

	#[test]
	fn ancestor_file_forces_a_fresh_name() {
		let dir = tempdir().expect("failed to create temp dir");
		let writer = ResourceWriter::new(dir.path());
		let main = main_url("https://ex.com/");
		writer
			.write(&resource("https://ex.com/assets", b"plain file"), &main)
			.expect("write failed");
		let renamed = writer
			.write(&resource("https://ex.com/assets/a.css", b"body{}"), &main)
			.expect("write failed")
			.expect("nested write was skipped");
		assert!(!renamed.contains('/'));
		assert_eq!(fs::read(dir.path().join(&renamed)).unwrap(), b"body{}");
	}

	#[test]
	fn directory_listings_are_skipped() {
		let dir = tempdir().expect("failed to create temp dir");
		let writer = ResourceWriter::new(dir.path());
		let written = writer
			.write(
				&resource("https://ex.com/a/", b"listing"),
				&main_url("https://ex.com/"),
			)
			.expect("write failed");
		assert_eq!(written, None);
	}

	#[test]
	fn non_local_urls_are_skipped() {
		let dir = tempdir().expect("failed to create temp dir");
		let writer = ResourceWriter::new(dir.path());
		let written = writer
			.write(
				&resource("data:text/plain,hello", b"hello"),
				&main_url("https://ex.com/"),
			)
			.expect("write failed");
		assert_eq!(written, None);
	}

	#[test]
	fn sanitizing_drops_traversal_segments() {
		assert_eq!(sanitize("a/../../b").as_deref(), Some("a/b"));
		assert_eq!(sanitize("./x//y").as_deref(), Some("x/y"));
		assert_eq!(sanitize("../.."), None);
	}
}
