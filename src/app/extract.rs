// SPDX-License-Identifier: Apache-2.0 OR MIT
use super::args::AppArgs;
use color_eyre::{eyre::WrapErr, Result};
use std::fs::{self, File};
use webarchive::{ExtractOptions, Extractor};

pub fn extract(args: AppArgs) -> Result<()> {
	init_logging(args.log.as_deref()).wrap_err("failed to set up logging")?;
	fs::create_dir_all(&args.destination)
		.wrap_err_with(|| format!("failed to create {}", args.destination.display()))?;

	let mut options = ExtractOptions::empty();
	if args.ignore_javascript {
		options |= ExtractOptions::IGNORE_JAVASCRIPT_FILES;
	}
	Extractor::new(options)
		.extract(&args.archive, &args.destination)
		.wrap_err_with(|| format!("failed to extract {}", args.archive.display()))
}

fn init_logging(log: Option<&str>) -> Result<()> {
	let mut builder =
		env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
	match log {
		Some(path) if path != "-" => {
			let file = File::create(path)
				.wrap_err_with(|| format!("failed to create log file {path}"))?;
			builder.target(env_logger::Target::Pipe(Box::new(file)));
		}
		_ => {
			builder.target(env_logger::Target::Stderr);
		}
	}
	builder.try_init().wrap_err("failed to install logger")
}
