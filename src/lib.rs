// SPDX-License-Identifier: Apache-2.0 OR MIT
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![warn(
	clippy::perf,
	clippy::complexity,
	clippy::style,
	clippy::correctness,
	clippy::missing_const_for_fn
)]
#![allow(clippy::tabs_in_doc_comments)]

//! This crate reads Safari `.webarchive` files and extracts them into
//! directory trees that open directly in a browser: the main document is
//! written as `webpage.html`, sub-resources (stylesheets, images, scripts,
//! fonts) are mirrored from their URL paths, sub-frames land in
//! `subframe_{i}/` directories, and references inside the document are
//! rewritten to the relative paths of the extracted files.
//!
//! A `.webarchive` is an Apple binary property list (`bplist00`) whose root
//! dictionary describes a tree of resources; the [`plist`] module contains
//! a standalone decoder for that format.
//!
//! # Examples
//!
//! ## Extracting a webarchive
//! ```rust,no_run
//! use std::path::Path;
//! use webarchive::{ExtractOptions, Extractor, Result};
//!
//! fn main() -> Result<()> {
//! 	let extractor = Extractor::new(ExtractOptions::empty());
//! 	extractor.extract(Path::new("page.webarchive"), Path::new("out"))?;
//! 	Ok(())
//! }
//! ```
//!
//! ## Inspecting an archive's resources
//! ```rust,no_run
//! use std::fs;
//! use webarchive::{Result, WebArchive};
//!
//! fn main() -> Result<()> {
//! 	let bytes = fs::read("page.webarchive")?;
//! 	let archive = WebArchive::from_bytes(&bytes)?;
//! 	println!("main document: {}", archive.main().url());
//! 	for resource in archive.sub_resources() {
//! 		println!("{}", resource.url());
//! 	}
//! 	Ok(())
//! }
//! ```
//!
//! ## Decoding an arbitrary binary plist
//! ```rust,no_run
//! use std::fs;
//! use webarchive::plist;
//!
//! fn main() -> Result<(), webarchive::PlistError> {
//! 	let bytes = fs::read("some.plist")?;
//! 	let root = plist::from_bytes(&bytes)?;
//! 	println!("{} top-level entries", root.as_dictionary().unwrap().len());
//! 	Ok(())
//! }
//! ```
//!
//! # License
//!
//! `webarchive` is licensed under either the MIT license or the Apache
//! License 2.0, at the choice of the user.

/// The typed view over a decoded archive.
pub mod archive;
/// Error handling for decoding and extraction.
pub mod error;
/// The extraction orchestrator.
pub mod extractor;
/// Decoding of `bplist00` binary property lists.
pub mod plist;
/// URL-to-relative-path rewriting inside extracted documents.
pub mod rewriter;
/// Writing sub-resources to the output directory.
pub mod writer;

pub use archive::{MainResource, SubResource, SubframeArchive, WebArchive};
pub use error::{Error, PlistError, Result};
pub use extractor::{ExtractOptions, Extractor};
pub use plist::{Dictionary, PlistReader, Value};
pub use rewriter::UrlRewriter;
pub use writer::ResourceWriter;
