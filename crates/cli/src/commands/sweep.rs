use arrivals::RetentionSweeper;

use crate::config::AppConfig;
use crate::error::Result;
use crate::output;

pub fn run(config: &AppConfig) -> Result<()> {
	if !config.retention.is_enabled() {
		println!("Retention disabled (DATA_RETENTION_DAYS <= 0); nothing to do");
		return Ok(());
	}

	let report = RetentionSweeper::new(config.retention_dirs()).sweep(&config.retention);
	print!("{}", output::render_sweep(&report));
	Ok(())
}
