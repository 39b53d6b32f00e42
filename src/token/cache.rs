//! In-memory bearer token cache keyed by credential fingerprint.

// self
use crate::{_prelude::*, model::AccessToken};

/// Cached bearer token; never persisted.
#[derive(Clone, Debug)]
pub struct CachedToken {
	/// Bearer token.
	pub access_token: AccessToken,
	/// Instant after which the token must not be used (safety margin already applied).
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Builds a cache entry that expires `safety_margin` before the provider's lifetime ends.
	pub fn new(
		access_token: AccessToken,
		issued_at: OffsetDateTime,
		expires_in: Duration,
		safety_margin: Duration,
	) -> Self {
		let usable = (expires_in - safety_margin).max(Duration::ZERO);

		Self { access_token, expires_at: issued_at + usable }
	}

	/// Returns `true` once `now` reached the (margin-adjusted) expiry.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}
}

/// Thread-safe map of credential fingerprints to cached tokens.
#[derive(Debug, Default)]
pub struct TokenCache(RwLock<HashMap<String, CachedToken>>);
impl TokenCache {
	/// Returns the cached token for `key` when it is still valid at `now`.
	pub fn get_valid(&self, key: &str, now: OffsetDateTime) -> Option<AccessToken> {
		self.0
			.read()
			.get(key)
			.filter(|entry| !entry.is_expired_at(now))
			.map(|entry| entry.access_token.clone())
	}

	/// Inserts or replaces the entry for `key`.
	pub fn put(&self, key: String, token: CachedToken) {
		self.0.write().insert(key, token);
	}

	/// Drops the entry for `key`, returning `true` when one existed.
	pub fn remove(&self, key: &str) -> bool {
		self.0.write().remove(key).is_some()
	}

	/// Drops every expired entry.
	pub fn purge_expired(&self, now: OffsetDateTime) {
		self.0.write().retain(|_, entry| !entry.is_expired_at(now));
	}

	/// Number of cached entries, expired or not.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn safety_margin_shortens_lifetime() {
		let issued = datetime!(2025-01-01 00:00 UTC);
		let token = CachedToken::new(
			AccessToken::new("abc"),
			issued,
			Duration::seconds(3600),
			Duration::seconds(60),
		);

		assert_eq!(token.expires_at, datetime!(2025-01-01 00:59 UTC));
		assert!(!token.is_expired_at(datetime!(2025-01-01 00:58:59 UTC)));
		assert!(token.is_expired_at(datetime!(2025-01-01 00:59 UTC)));
	}

	#[test]
	fn margin_longer_than_lifetime_expires_immediately() {
		let issued = datetime!(2025-01-01 00:00 UTC);
		let token = CachedToken::new(
			AccessToken::new("abc"),
			issued,
			Duration::seconds(30),
			Duration::seconds(60),
		);

		assert!(token.is_expired_at(issued));
	}

	#[test]
	fn cache_hides_expired_entries_and_purges_them() {
		let cache = TokenCache::default();
		let now = datetime!(2025-01-01 00:00 UTC);

		cache.put(
			"fresh".into(),
			CachedToken::new(AccessToken::new("a"), now, Duration::hours(1), Duration::ZERO),
		);
		cache.put(
			"stale".into(),
			CachedToken::new(AccessToken::new("b"), now, Duration::ZERO, Duration::ZERO),
		);

		let fresh = cache.get_valid("fresh", now).expect("Fresh entry should be returned.");

		assert_eq!(fresh.expose(), "a");
		assert!(cache.get_valid("stale", now).is_none());

		cache.purge_expired(now);

		assert_eq!(cache.len(), 1);
		assert!(cache.remove("fresh"));
		assert!(cache.is_empty());
	}
}
