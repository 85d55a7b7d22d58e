//! Memoises vischeck verdicts per directed area pair so the graph adapter
//! does not pay for two ray casts on every edge visit. Entries carry an
//! expiry, a periodic sweep evicts stale ones and signals that the solve
//! cache must be reset since edge costs may have changed
//!

use std::collections::HashMap;
use std::time::Duration;

use crate::prelude::*;

/// A memoised vischeck verdict for one directed connection
#[derive(Clone, Copy, Debug)]
pub struct CachedVischeck {
	/// Elapsed app time at which the entry stops being valid
	expire: Duration,
	/// Whether the connection was passable when checked
	passable: bool,
}

impl CachedVischeck {
	/// Get the expiry stamp
	pub fn get_expire(&self) -> Duration {
		self.expire
	}
	/// Get the memoised verdict
	pub fn is_passable(&self) -> bool {
		self.passable
	}
}

/// Vischeck verdicts keyed by `(from, to)` area pair
#[derive(Default, Clone, Debug)]
pub struct VischeckCache {
	/// The memoised entries
	entries: HashMap<(AreaId, AreaId), CachedVischeck>,
}

impl VischeckCache {
	/// Get the memoised verdict for a pair. An entry at or past its expiry is
	/// treated as absent, the caller must re-run the vischeck and write the
	/// fresh verdict back
	pub fn get(&self, from: AreaId, to: AreaId, now: Duration) -> Option<bool> {
		self.entries
			.get(&(from, to))
			.filter(|entry| entry.expire > now)
			.map(|entry| entry.passable)
	}
	/// Write through a fresh verdict, valid for [VISCHECK_TTL]
	pub fn insert(&mut self, from: AreaId, to: AreaId, passable: bool, now: Duration) {
		self.entries.insert(
			(from, to),
			CachedVischeck {
				expire: now + VISCHECK_TTL,
				passable,
			},
		);
	}
	/// Evict every expired entry. Returns `true` if anything was removed, in
	/// which case the pather's solve cache must be reset before the next solve
	pub fn sweep(&mut self, now: Duration) -> bool {
		let before = self.entries.len();
		self.entries.retain(|_, entry| entry.expire > now);
		self.entries.len() != before
	}
	/// Drop everything, used on map change
	pub fn clear(&mut self) {
		self.entries.clear();
	}
	/// Number of live and expired entries currently held
	pub fn len(&self) -> usize {
		self.entries.len()
	}
	/// Is the cache empty
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fresh_entry_is_returned() {
		let mut cache = VischeckCache::default();
		let now = Duration::from_secs(5);
		cache.insert(AreaId::new(1), AreaId::new(2), true, now);
		assert_eq!(cache.get(AreaId::new(1), AreaId::new(2), now), Some(true));
		// directed, the reverse pair is unknown
		assert_eq!(cache.get(AreaId::new(2), AreaId::new(1), now), None);
	}
	#[test]
	fn expired_entry_treated_as_absent() {
		let mut cache = VischeckCache::default();
		cache.insert(AreaId::new(1), AreaId::new(2), false, Duration::from_secs(0));
		let later = Duration::from_secs(0) + VISCHECK_TTL;
		assert_eq!(cache.get(AreaId::new(1), AreaId::new(2), later), None);
	}
	#[test]
	fn sweep_removes_only_expired() {
		let mut cache = VischeckCache::default();
		cache.insert(AreaId::new(1), AreaId::new(2), true, Duration::from_secs(0));
		cache.insert(AreaId::new(3), AreaId::new(4), false, Duration::from_secs(8));
		let erased = cache.sweep(Duration::from_secs(12));
		assert!(erased);
		assert_eq!(cache.len(), 1);
		assert_eq!(
			cache.get(AreaId::new(3), AreaId::new(4), Duration::from_secs(12)),
			Some(false)
		);
	}
	#[test]
	fn sweep_with_nothing_expired_reports_false() {
		let mut cache = VischeckCache::default();
		cache.insert(AreaId::new(1), AreaId::new(2), true, Duration::from_secs(10));
		assert!(!cache.sweep(Duration::from_secs(11)));
		assert_eq!(cache.len(), 1);
	}
}
