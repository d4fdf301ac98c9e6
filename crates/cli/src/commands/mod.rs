//! Command dispatch.

mod scrape;
mod serve;
mod session;
mod sweep;

use crate::cli::{Cli, Commands, SessionAction};
use crate::config::AppConfig;
use crate::error::Result;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = AppConfig::from_cli(&cli);

	match cli.command {
		Commands::Serve(args) => serve::run(&config, &args).await,
		Commands::Scrape {
			export,
			format,
			two_factor_timeout_secs,
		} => scrape::run(&config, export, format, two_factor_timeout_secs).await,
		Commands::Session { action } => match action {
			SessionAction::Show { format } => session::show(&config, format),
			SessionAction::Clear => session::clear(&config),
		},
		Commands::Sweep => sweep::run(&config),
	}
}
