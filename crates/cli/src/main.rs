use arrivals_cli::cli::Cli;
use arrivals_cli::{commands, logging};
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() {
	let _ = dotenvy::dotenv();
	let cli = Cli::parse();
	logging::init_logging(cli.verbose, cli.log_json, cli.command.is_long_running());

	if let Err(err) = commands::dispatch(cli).await {
		error!(target = "arrivals", error = %err, "command failed");
		std::process::exit(1);
	}
}
