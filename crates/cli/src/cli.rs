use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "arrivals")]
#[command(about = "Keeps today's arrivals from the back-office in memory and serves them over HTTP")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Emit logs as JSON lines
	#[arg(long, global = true)]
	pub log_json: bool,

	#[command(flatten)]
	pub site: SiteArgs,

	#[command(flatten)]
	pub storage: StorageArgs,

	#[command(subcommand)]
	pub command: Commands,
}

/// Back-office location and login.
#[derive(Args, Debug, Clone)]
pub struct SiteArgs {
	/// Base URL of the back-office
	#[arg(long, global = true, env = "ARRIVALS_SITE_URL", value_name = "URL")]
	pub site_url: Option<String>,

	/// Path of the login page
	#[arg(long, global = true, env = "ARRIVALS_LOGIN_PATH", default_value = "/fr/admin/dashboard")]
	pub login_path: String,

	/// Path of the arrivals list
	#[arg(
		long,
		global = true,
		env = "ARRIVALS_ARRIVALS_PATH",
		default_value = "/fr/admin/booking-manager/arrivals"
	)]
	pub arrivals_path: String,

	/// Login e-mail
	#[arg(long, global = true, env = "ARRIVALS_EMAIL", hide_env_values = true)]
	pub email: Option<String>,

	/// Login password
	#[arg(long, global = true, env = "ARRIVALS_PASSWORD", hide_env_values = true)]
	pub password: Option<String>,
}

/// Where artifacts live and how long they are kept.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
	/// Directory for guest exports
	#[arg(long, global = true, env = "DATA_DIR", default_value = "data")]
	pub data_dir: PathBuf,

	/// Directory for the saved login session
	#[arg(long, global = true, env = "SESSION_DIR", default_value = "session")]
	pub session_dir: PathBuf,

	/// Directory for page captures
	#[arg(long, global = true, env = "SCREENSHOT_DIR", default_value = "screenshots")]
	pub capture_dir: PathBuf,

	/// Delete exports and captures older than this many days (0 or less keeps everything)
	#[arg(
		long,
		global = true,
		env = "DATA_RETENTION_DAYS",
		default_value_t = 7,
		allow_negative_numbers = true
	)]
	pub retention_days: i64,

	/// Save the HTML of each login and fetch step
	#[arg(long, global = true, env = "SCREENSHOT")]
	pub capture: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run the HTTP API with scheduled refreshes
	Serve(ServeArgs),

	/// Fetch the arrivals once and print them
	Scrape {
		/// Also write JSON and text exports to the data directory
		#[arg(long)]
		export: bool,

		#[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// Seconds to wait for a two-factor code on stdin
		#[arg(long, default_value_t = 300)]
		two_factor_timeout_secs: u64,
	},

	/// Inspect or remove the saved login session
	Session {
		#[command(subcommand)]
		action: SessionAction,
	},

	/// Apply the retention policy to exports and captures once
	Sweep,
}

impl Commands {
	/// Long-running commands log at info level by default.
	pub fn is_long_running(&self) -> bool {
		matches!(self, Commands::Serve(_))
	}
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
	/// Address to listen on
	#[arg(long, env = "ARRIVALS_BIND", default_value = "0.0.0.0")]
	pub bind: String,

	/// Port to listen on
	#[arg(long, env = "PORT", default_value_t = 3000)]
	pub port: u16,

	/// Seconds between scheduled refreshes
	#[arg(long, default_value_t = 600)]
	pub interval_secs: u64,

	/// Seconds a fetched list stays servable
	#[arg(long, default_value_t = 600)]
	pub cache_ttl_secs: u64,

	/// Seconds to wait for a code submitted to POST /api/2fa
	#[arg(long, default_value_t = 300)]
	pub two_factor_timeout_secs: u64,

	/// Write a JSON export after every successful refresh
	#[arg(long)]
	pub export: bool,
}

#[derive(Subcommand, Debug)]
pub enum SessionAction {
	/// List the saved cookies and their expiry
	Show {
		#[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Delete the saved session
	Clear,
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_valid() {
		Cli::command().debug_assert();
	}

	#[test]
	fn serve_defaults() {
		let cli = Cli::try_parse_from(["arrivals", "serve"]).unwrap();
		let Commands::Serve(args) = cli.command else {
			panic!("expected serve");
		};
		assert_eq!(args.interval_secs, 600);
		assert_eq!(args.cache_ttl_secs, 600);
		assert_eq!(args.two_factor_timeout_secs, 300);
		assert_eq!(cli.site.login_path, "/fr/admin/dashboard");
	}

	#[test]
	fn negative_retention_is_accepted() {
		let cli = Cli::try_parse_from(["arrivals", "sweep", "--retention-days", "-1"]).unwrap();
		assert_eq!(cli.storage.retention_days, -1);
	}
}
