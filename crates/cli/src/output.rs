//! Terminal rendering for the one-shot commands.

use std::fmt::Write as _;

use arrivals::SweepReport;
use arrivals::protocol::{Cookie, GuestRecord, SessionBundle};
use clap::ValueEnum;
use serde::Serialize;

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON output
	Json,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

pub fn render_guests(guests: &[GuestRecord], format: OutputFormat) -> serde_json::Result<String> {
	match format {
		OutputFormat::Json => serde_json::to_string_pretty(guests),
		OutputFormat::Text => Ok(guest_table(guests)),
	}
}

fn guest_table(guests: &[GuestRecord]) -> String {
	if guests.is_empty() {
		return "No arrivals today.\n".into();
	}

	let mut out = String::new();
	let _ = writeln!(out, "{:<28} {:<24} {:<8} {:<12} {}", "NAME", "ROOM", "PERSONS", "AMOUNT", "DATES");
	let _ = writeln!(out, "{}", "-".repeat(90));
	for guest in guests {
		let room = if guest.room_type.is_empty() { "-" } else { guest.room_type.as_str() };
		let _ = writeln!(
			out,
			"{:<28} {:<24} {:<8} {:<12} {}",
			truncate(&guest.name, 27),
			truncate(room, 23),
			guest.persons,
			guest.amount_due,
			guest.dates
		);
	}
	let _ = writeln!(out);
	let _ = writeln!(out, "Total: {} guests", guests.len());
	out
}

fn truncate(s: &str, max: usize) -> String {
	if s.chars().count() > max {
		let cut: String = s.chars().take(max.saturating_sub(3)).collect();
		format!("{cut}...")
	} else {
		s.to_string()
	}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CookieSummary<'a> {
	name: &'a str,
	domain: Option<&'a str>,
	expires: String,
}

/// Renders a saved session without cookie values.
pub fn render_session(bundle: &SessionBundle, format: OutputFormat, now_secs: i64) -> serde_json::Result<String> {
	let summaries: Vec<CookieSummary<'_>> = bundle
		.cookies
		.iter()
		.map(|cookie| CookieSummary {
			name: &cookie.name,
			domain: cookie.domain.as_deref(),
			expires: format_expiry(cookie, now_secs),
		})
		.collect();

	if format == OutputFormat::Json {
		return serde_json::to_string_pretty(&serde_json::json!({
			"savedAt": bundle.saved_at,
			"cookies": summaries,
		}));
	}

	let mut out = String::new();
	let _ = writeln!(out, "Saved at: {}", bundle.saved_at.to_rfc3339());
	let _ = writeln!(out);
	let _ = writeln!(out, "COOKIES ({}):", summaries.len());
	if summaries.is_empty() {
		let _ = writeln!(out, "  (none)");
	} else {
		let _ = writeln!(out, "  {:<24} {:<30} {:<10}", "NAME", "DOMAIN", "EXPIRES");
		let _ = writeln!(out, "  {}", "-".repeat(66));
		for summary in &summaries {
			let _ = writeln!(
				out,
				"  {:<24} {:<30} {:<10}",
				summary.name,
				summary.domain.unwrap_or("-"),
				summary.expires
			);
		}
	}
	Ok(out)
}

/// `session`, `expired`, or the remaining lifetime in minutes, hours or days.
pub fn format_expiry(cookie: &Cookie, now_secs: i64) -> String {
	let Some(ts) = cookie.expiry() else {
		return "session".into();
	};
	let ts = ts as i64;
	if ts <= now_secs {
		return "expired".into();
	}

	match ts - now_secs {
		d if d < 3600 => format!("{}m", d / 60),
		d if d < 86400 => format!("{}h", d / 3600),
		d => format!("{}d", d / 86400),
	}
}

pub fn render_sweep(report: &SweepReport) -> String {
	format!(
		"Deleted {} file(s), {} failed, {} location(s) skipped\n",
		report.deleted, report.failed, report.skipped
	)
}
