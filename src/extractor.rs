// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::{
	archive::{MainResource, SubResource, SubframeArchive, WebArchive},
	error::{Error, Result},
	rewriter::UrlRewriter,
	writer::ResourceWriter,
};
use bitflags::bitflags;
use encoding_rs::Encoding;
use log::{debug, info};
use std::{fs, path::Path};

/// Name of the rewritten document written at each level of the output tree.
const DOCUMENT_FILE_NAME: &str = "webpage.html";

bitflags! {
	/// Extraction behavior switches. Future options are additive.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
	pub struct ExtractOptions: u32 {
		/// Do not persist JavaScript sub-resources; their references in the
		/// document are replaced with the empty string instead.
		const IGNORE_JAVASCRIPT_FILES = 1;
	}
}

/// Drives a whole extraction: decode, write resources, rewrite, emit
/// `webpage.html` files. Holds no state across calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
	options: ExtractOptions,
}

impl Extractor {
	pub fn new(options: ExtractOptions) -> Self {
		Self { options }
	}

	/// Extracts `input` into `out_dir`, which must already exist.
	///
	/// Sub-resources and sub-frames are processed in archive order, and
	/// every substitution sees the earlier ones already applied. The
	/// rewritten document lands in `out_dir` as `webpage.html`, re-encoded
	/// as UTF-8 whatever the source encoding was.
	pub fn extract(&self, input: &Path, out_dir: &Path) -> Result<()> {
		if !out_dir.is_dir() {
			return Err(Error::OutputDirectoryMissing(out_dir.to_path_buf()));
		}
		let archive = WebArchive::from_bytes(&fs::read(input)?)?;
		info!(
			"extracting {} into {}",
			archive.main().url(),
			out_dir.display()
		);
		let WebArchive {
			main,
			sub_resources,
			subframes,
		} = archive;
		let document = self.process_archive(main, sub_resources, subframes, out_dir)?;
		fs::write(out_dir.join(DOCUMENT_FILE_NAME), document)?;
		Ok(())
	}

	/// One archive level: decode the main document, persist + rewrite each
	/// sub-resource, then each sub-frame recursively into `subframe_{i}/`.
	fn process_archive(
		&self,
		main: MainResource,
		sub_resources: Vec<SubResource>,
		subframes: Vec<SubframeArchive>,
		dir: &Path,
	) -> Result<String> {
		let mut document = decode_document(&main)?;
		let rewriter = UrlRewriter::new(main.url());
		let writer = ResourceWriter::new(dir);

		for resource in sub_resources {
			if self.options.contains(ExtractOptions::IGNORE_JAVASCRIPT_FILES)
				&& resource.is_javascript()
			{
				debug!("ignoring JavaScript resource {}", resource.url());
				rewriter.rewrite(&mut document, resource.url(), "");
				continue;
			}
			if let Some(relative) = writer.write(&resource, main.url())? {
				rewriter.rewrite(&mut document, resource.url(), &relative);
			}
		}

		for (index, frame) in subframes.into_iter().enumerate() {
			let index = index + 1;
			let frame_dir = dir.join(format!("subframe_{index}"));
			fs::create_dir_all(&frame_dir)?;
			let frame_url = frame.main().url().clone();
			let SubframeArchive {
				main,
				sub_resources,
				children,
			} = frame;
			let frame_document = self.process_archive(main, sub_resources, children, &frame_dir)?;
			rewriter.rewrite_frame(
				&mut document,
				&frame_url,
				&format!("subframe_{index}/{DOCUMENT_FILE_NAME}"),
			);
			fs::write(frame_dir.join(DOCUMENT_FILE_NAME), frame_document)?;
		}

		Ok(document)
	}
}

/// Decodes the main document's bytes using its declared encoding label.
fn decode_document(main: &MainResource) -> Result<String> {
	let encoding = Encoding::for_label(main.text_encoding().as_bytes())
		.ok_or_else(|| Error::UnsupportedEncoding(main.text_encoding().to_string()))?;
	let (text, _, _) = encoding.decode(main.data());
	Ok(text.into_owned())
}
