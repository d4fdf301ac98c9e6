use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` overrides the verbosity flags.
pub fn init_logging(verbose: u8, json: bool, long_running: bool) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, long_running)));

	let builder = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(true);

	let _ = if json { builder.json().try_init() } else { builder.try_init() };
}

fn default_directive(verbose: u8, long_running: bool) -> &'static str {
	match (verbose, long_running) {
		(0, false) => "warn",
		(0, true) | (1, _) => "info",
		(2, _) => "debug",
		_ => "trace",
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serve_defaults_to_info() {
		assert_eq!(default_directive(0, true), "info");
		assert_eq!(default_directive(0, false), "warn");
		assert_eq!(default_directive(2, false), "debug");
		assert_eq!(default_directive(5, true), "trace");
	}
}
