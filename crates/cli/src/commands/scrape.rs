use std::sync::Arc;
use std::time::Duration;

use arrivals::protocol::TriggerMode;
use arrivals::{ExportFormat, RefreshCoordinator, write_export};

use crate::config::AppConfig;
use crate::error::Result;
use crate::output::{self, OutputFormat};
use crate::portal::PortalLauncher;
use crate::prompt::StdinCodePrompt;

/// One forced acquisition with the terminal as the code source.
pub async fn run(config: &AppConfig, export: bool, format: OutputFormat, two_factor_timeout_secs: u64) -> Result<()> {
	let launcher = PortalLauncher::new(config.portal_settings()?);
	let prompt = StdinCodePrompt::new(Duration::from_secs(two_factor_timeout_secs));
	let coordinator = RefreshCoordinator::new(
		config.refresh_config(),
		Arc::new(launcher),
		config.session_store()?,
		config.credentials.clone(),
	)
	.with_code_provider(Arc::new(prompt));

	coordinator.trigger(TriggerMode::Forced).await??;
	let guests = coordinator.cache().guests().unwrap_or_default();

	if export {
		for format in [ExportFormat::Json, ExportFormat::Text] {
			let path = write_export(&config.data_dir, &guests, format)?;
			eprintln!("Saved {}", path.display());
		}
	}

	print!("{}", output::render_guests(&guests, format)?);
	if format == OutputFormat::Json {
		println!();
	}
	Ok(())
}
