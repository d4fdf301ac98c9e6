use arrivals::SessionStore;

use crate::config::AppConfig;
use crate::error::Result;
use crate::output::{self, OutputFormat};

pub fn show(config: &AppConfig, format: OutputFormat) -> Result<()> {
	let store = SessionStore::new(&config.session_dir);
	let Some(bundle) = store.inspect()? else {
		println!("No saved session at {}", store.path().display());
		return Ok(());
	};

	let now = chrono::Utc::now().timestamp();
	println!("{}", output::render_session(&bundle, format, now)?.trim_end());
	Ok(())
}

pub fn clear(config: &AppConfig) -> Result<()> {
	let store = SessionStore::new(&config.session_dir);
	if store.clear()? {
		println!("Removed saved session {}", store.path().display());
	} else {
		println!("No saved session at {}", store.path().display());
	}
	Ok(())
}
