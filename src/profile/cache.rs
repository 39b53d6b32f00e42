//! Short-lived identity-signal cache.

// self
use crate::{
	_prelude::*,
	model::{DirectoryTenantId, IdentitySignalProfile, UserId},
};

/// Cache key: one profile per user per directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProfileKey {
	/// Directory the user lives in.
	pub directory_tenant: DirectoryTenantId,
	/// Provider user identifier.
	pub user_id: UserId,
}

#[derive(Clone, Debug)]
struct CachedProfile {
	profile: IdentitySignalProfile,
	cached_at: OffsetDateTime,
}

/// TTL cache of whole profiles; entries are replaced, never patched.
#[derive(Debug)]
pub struct ProfileCache {
	ttl: Duration,
	entries: RwLock<HashMap<ProfileKey, CachedProfile>>,
}
impl ProfileCache {
	/// Creates an empty cache whose entries live for `ttl`.
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, entries: Default::default() }
	}

	/// Returns the cached profile when it is younger than the TTL at `now`.
	pub fn get(&self, key: &ProfileKey, now: OffsetDateTime) -> Option<IdentitySignalProfile> {
		self.entries
			.read()
			.get(key)
			.filter(|entry| now - entry.cached_at < self.ttl)
			.map(|entry| entry.profile.clone())
	}

	/// Stores `profile` as of `now`.
	pub fn put(&self, key: ProfileKey, profile: IdentitySignalProfile, now: OffsetDateTime) {
		self.entries.write().insert(key, CachedProfile { profile, cached_at: now });
	}

	/// Drops one entry, returning `true` when it existed.
	pub fn invalidate(&self, key: &ProfileKey) -> bool {
		self.entries.write().remove(key).is_some()
	}

	/// Drops entries older than the TTL, returning how many were removed.
	pub fn purge_expired(&self, now: OffsetDateTime) -> usize {
		let mut entries = self.entries.write();
		let before = entries.len();

		entries.retain(|_, entry| now - entry.cached_at < self.ttl);

		before - entries.len()
	}

	/// Number of entries, expired or not.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}
}
