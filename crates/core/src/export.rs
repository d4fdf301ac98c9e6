//! Timestamped guest list exports.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use arrivals_protocol::GuestRecord;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::StorageError;

/// Export file flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
	Json,
	Text,
}

impl ExportFormat {
	fn extension(self) -> &'static str {
		match self {
			ExportFormat::Json => "json",
			ExportFormat::Text => "txt",
		}
	}
}

/// Writes `guests-<timestamp>.<ext>` into `dir`, creating it if needed.
pub fn write_export(dir: &Path, guests: &[GuestRecord], format: ExportFormat) -> Result<PathBuf, StorageError> {
	write_export_at(dir, guests, format, Utc::now())
}

pub(crate) fn write_export_at(
	dir: &Path,
	guests: &[GuestRecord],
	format: ExportFormat,
	now: DateTime<Utc>,
) -> Result<PathBuf, StorageError> {
	std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

	let stamp = now.format("%Y-%m-%dT%H-%M-%S%.3fZ");
	let path = dir.join(format!("guests-{stamp}.{}", format.extension()));
	let body = match format {
		ExportFormat::Json => serde_json::to_string_pretty(guests)?,
		ExportFormat::Text => render_text(guests),
	};
	std::fs::write(&path, body).map_err(|e| StorageError::io(&path, e))?;

	info!(target = "arrivals.refresh", path = %path.display(), count = guests.len(), "export written");
	Ok(path)
}

/// One line per guest: `Name: … | Room: … | Persons: … | Amount: … | Dates: …`.
pub fn render_text(guests: &[GuestRecord]) -> String {
	let mut out = String::new();
	for guest in guests {
		let _ = writeln!(
			out,
			"Name: {} | Room: {} | Persons: {} | Amount: {} | Dates: {}",
			guest.name, guest.room_type, guest.persons, guest.amount_due, guest.dates
		);
	}
	out
}
