// SPDX-License-Identifier: Apache-2.0 OR MIT
use clap::Parser;
use std::path::PathBuf;

/// Extract a Safari webarchive into a directory of plain files
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct AppArgs {
	/// The webarchive file to extract
	#[clap(value_parser)]
	pub archive: PathBuf,
	/// The directory to extract into (created if missing)
	#[clap(value_parser)]
	pub destination: PathBuf,
	/// Do not extract JavaScript files, and blank out references to them
	#[clap(long)]
	pub ignore_javascript: bool,
	/// Write log output to <PATH>, or "-" for stderr
	#[clap(long, value_name = "PATH")]
	pub log: Option<String>,
}
