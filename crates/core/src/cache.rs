//! In-memory TTL cache for the latest dataset and its per-room view.
//!
//! Expiry is computed on read; nothing sweeps the map in the background.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arrivals_protocol::{GuestRecord, RoomIndex, RoomOccupant};
use parking_lot::RwLock;
use tokio::time::Instant;

/// Cache slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
	Guests,
	Rooms,
}

/// A cached value. Shared by reference so reads never copy the dataset.
#[derive(Debug, Clone)]
pub enum Dataset {
	Guests(Arc<Vec<GuestRecord>>),
	Rooms(Arc<RoomIndex>),
}

/// A value with the instant it was produced and its lifetime.
#[derive(Debug, Clone)]
pub struct CachedResult<T> {
	pub value: T,
	pub produced_at: Instant,
	pub ttl: Duration,
}

impl<T> CachedResult<T> {
	pub fn new(value: T, ttl: Duration) -> Self {
		Self {
			value,
			produced_at: Instant::now(),
			ttl,
		}
	}

	/// `false` once `ttl` has fully elapsed since production.
	pub fn is_fresh_at(&self, now: Instant) -> bool {
		now.saturating_duration_since(self.produced_at) < self.ttl
	}
}

/// Latest successful acquisition, keyed by view.
#[derive(Debug, Default)]
pub struct ResultCache {
	entries: RwLock<HashMap<CacheKey, CachedResult<Dataset>>>,
}

impl ResultCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&self, key: CacheKey, value: Dataset, ttl: Duration) {
		self.entries.write().insert(key, CachedResult::new(value, ttl));
	}

	/// Returns the value for `key` unless it is missing or past its TTL.
	pub fn get(&self, key: CacheKey) -> Option<Dataset> {
		let now = Instant::now();
		self.entries
			.read()
			.get(&key)
			.filter(|entry| entry.is_fresh_at(now))
			.map(|entry| entry.value.clone())
	}

	/// Stores a fresh dataset together with its derived room view.
	pub fn publish(&self, guests: Vec<GuestRecord>, ttl: Duration) {
		let rooms = group_by_room(&guests);
		let mut entries = self.entries.write();
		entries.insert(CacheKey::Guests, CachedResult::new(Dataset::Guests(Arc::new(guests)), ttl));
		entries.insert(CacheKey::Rooms, CachedResult::new(Dataset::Rooms(Arc::new(rooms)), ttl));
	}

	pub fn guests(&self) -> Option<Arc<Vec<GuestRecord>>> {
		match self.get(CacheKey::Guests)? {
			Dataset::Guests(guests) => Some(guests),
			Dataset::Rooms(_) => None,
		}
	}

	pub fn rooms(&self) -> Option<Arc<RoomIndex>> {
		match self.get(CacheKey::Rooms)? {
			Dataset::Rooms(rooms) => Some(rooms),
			Dataset::Guests(_) => None,
		}
	}
}

/// Groups guests by room type, keeping guests without one under `""`.
pub fn group_by_room(guests: &[GuestRecord]) -> RoomIndex {
	let mut rooms = RoomIndex::new();
	for guest in guests {
		rooms
			.entry(guest.room_type.trim().to_owned())
			.or_default()
			.push(RoomOccupant::from(guest));
	}
	rooms
}

#[cfg(test)]
mod tests {
	use super::*;

	fn guest(name: &str, room: &str) -> GuestRecord {
		GuestRecord {
			name: name.into(),
			room_type: room.into(),
			persons: "2 x".into(),
			amount_due: "120,00 €".into(),
			dates: "12/05 - 14/05".into(),
		}
	}

	#[test]
	fn groups_missing_room_under_empty_key() {
		let rooms = group_by_room(&[guest("Ada", "Suite"), guest("Bob", ""), guest("Cy", "Suite")]);

		assert_eq!(rooms.len(), 2);
		assert_eq!(rooms["Suite"].len(), 2);
		assert_eq!(rooms[""][0].name, "Bob");
	}

	#[tokio::test(start_paused = true)]
	async fn entries_expire_exactly_at_ttl() {
		let cache = ResultCache::new();
		cache.publish(vec![guest("Ada", "Suite")], Duration::from_secs(600));

		tokio::time::advance(Duration::from_secs(599)).await;
		assert_eq!(cache.guests().map(|g| g.len()), Some(1));
		assert!(cache.rooms().is_some());

		tokio::time::advance(Duration::from_secs(1)).await;
		assert!(cache.guests().is_none());
		assert!(cache.rooms().is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn set_replaces_single_slot() {
		let cache = ResultCache::new();
		assert!(cache.get(CacheKey::Guests).is_none());

		cache.set(CacheKey::Guests, Dataset::Guests(Arc::new(vec![])), Duration::from_secs(5));
		assert!(cache.guests().is_some());
		assert!(cache.rooms().is_none());
	}
}
