// SPDX-License-Identifier: Apache-2.0 OR MIT
mod app;

use self::app::args::AppArgs;
use clap::Parser;
use color_eyre::{eyre::WrapErr, Result};

fn main() -> Result<()> {
	color_eyre::install().wrap_err("failed to install color-eyre handler")?;
	let args = AppArgs::parse();
	app::extract::extract(args).wrap_err("failed to extract archive")
}
