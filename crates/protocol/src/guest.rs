//! Guest records produced by an acquisition and the per-room view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One arrival card scraped from the back-office.
///
/// Every field except `name` may be empty when the page omits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestRecord {
	pub name: String,
	#[serde(default)]
	pub room_type: String,
	#[serde(default)]
	pub persons: String,
	#[serde(default)]
	pub amount_due: String,
	#[serde(default)]
	pub dates: String,
}

/// A guest as listed under its room in [`RoomIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomOccupant {
	pub name: String,
	pub persons: String,
	pub dates: String,
	pub amount_due: String,
}

impl From<&GuestRecord> for RoomOccupant {
	fn from(guest: &GuestRecord) -> Self {
		Self {
			name: guest.name.clone(),
			persons: guest.persons.clone(),
			dates: guest.dates.clone(),
			amount_due: guest.amount_due.clone(),
		}
	}
}

/// Guests grouped by room type. Guests without a room sit under `""`.
pub type RoomIndex = BTreeMap<String, Vec<RoomOccupant>>;
