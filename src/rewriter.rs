// SPDX-License-Identifier: Apache-2.0 OR MIT
use log::{debug, warn};
use url::Url;

/// Rewrites references to archived URLs inside the main document.
///
/// The source HTML may spell the same resource several ways, so a handful
/// of candidate forms are tried in order from most to least qualified and
/// the first one present in the document is replaced everywhere. This is
/// plain substring replacement; the document is never parsed as HTML.
pub struct UrlRewriter<'a> {
	main_url: &'a Url,
}

impl<'a> UrlRewriter<'a> {
	pub fn new(main_url: &'a Url) -> Self {
		Self { main_url }
	}

	/// Replaces references to a sub-resource URL with `replacement`.
	/// Returns whether any candidate form was found.
	pub fn rewrite(&self, document: &mut String, url: &Url, replacement: &str) -> bool {
		self.rewrite_forms(document, url, replacement, true)
	}

	/// Replaces references to a sub-frame URL. Sub-frames skip the raw
	/// path-and-query form; frame sources are spelled with a host in
	/// practice and the bare path would collide with sibling resources.
	pub fn rewrite_frame(&self, document: &mut String, url: &Url, replacement: &str) -> bool {
		self.rewrite_forms(document, url, replacement, false)
	}

	fn rewrite_forms(
		&self,
		document: &mut String,
		url: &Url,
		replacement: &str,
		with_path_and_query: bool,
	) -> bool {
		for candidate in self.candidates(url, with_path_and_query) {
			if document.contains(&candidate) {
				debug!("rewriting {candidate:?} to {replacement:?}");
				*document = document.replace(&candidate, replacement);
				return true;
			}
		}
		warn!("could not find {url} in the document");
		false
	}

	/// The candidate textual forms of `url`, most qualified first:
	/// canonical absolute (query HTML-escaped), scheme-relative,
	/// host-relative, sibling-relative, and optionally the raw
	/// path-and-query when the resource shares the document's host.
	fn candidates(&self, url: &Url, with_path_and_query: bool) -> Vec<String> {
		let mut canonical = format!(
			"{}://{}{}",
			url.scheme(),
			url.host_str().unwrap_or_default(),
			url.path()
		);
		if let Some(query) = url.query() {
			canonical.push_str(&html_escape(&format!("?{query}")));
		}

		let mut candidates = Vec::with_capacity(5);
		candidates.push(canonical.clone());
		if let Some(scheme_relative) = canonical.strip_prefix(&format!("{}:", url.scheme())) {
			candidates.push(scheme_relative.to_string());
		}
		let main_origin = format!(
			"{}://{}",
			self.main_url.scheme(),
			self.main_url.host_str().unwrap_or_default()
		);
		if let Some(host_relative) = canonical.strip_prefix(&main_origin) {
			candidates.push(host_relative.to_string());
		}
		let main_base = format!("{main_origin}{}", self.main_url.path());
		if let Some(sibling) = canonical.strip_prefix(&main_base) {
			candidates.push(sibling.to_string());
		}
		if with_path_and_query && url.host_str() == self.main_url.host_str() {
			let mut path_and_query = url.path().to_string();
			if let Some(query) = url.query() {
				path_and_query.push('?');
				path_and_query.push_str(query);
			}
			candidates.push(path_and_query);
		}
		// An empty candidate would match everywhere.
		candidates.retain(|candidate| !candidate.is_empty());
		candidates
	}
}

/// HTML-entity escaping for the query component of the canonical form,
/// matching how the query appears inside archived attribute values.
fn html_escape(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for character in text.chars() {
		match character {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			other => escaped.push(other),
		}
	}
	escaped
}
