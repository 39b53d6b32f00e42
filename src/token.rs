//! Client-credentials token acquisition with caching and per-credential singleflight.
//!
//! [`TokenManager::get_token`] returns a cached bearer token while it is valid. On a miss the
//! caller takes the credential's singleflight guard, re-checks the cache, and only then posts a
//! `client_credentials` grant, so concurrent callers for one credential trigger one request.

pub mod cache;

pub use cache::*;

// self
use crate::{
	_prelude::*,
	config::EngineConfig,
	error::ConfigError,
	http::ReqwestHttpClient,
	model::{AccessToken, TenantCredential},
	obs::{self, OpSpan, Operation, Outcome},
	oauth::TokenFacade,
};

/// Owns the token cache and the singleflight guards for every credential.
#[derive(Debug)]
pub struct TokenManager {
	config: Arc<EngineConfig>,
	facade: TokenFacade,
	cache: TokenCache,
	guards: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}
impl TokenManager {
	/// Creates a manager that issues token requests through `http_client`.
	pub fn new(config: Arc<EngineConfig>, http_client: ReqwestHttpClient) -> Self {
		Self {
			config,
			facade: TokenFacade::new(http_client),
			cache: TokenCache::default(),
			guards: Default::default(),
		}
	}

	/// Returns a valid bearer token for `credential`, requesting a new one when needed.
	pub async fn get_token(&self, credential: &TenantCredential) -> Result<AccessToken> {
		if !credential.is_complete() {
			return Err(ConfigError::IncompleteCredential.into());
		}

		let key = credential.fingerprint();

		if let Some(token) = self.cache.get_valid(&key, OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let span = OpSpan::new(Operation::Token, "get_token");

		obs::record_operation(Operation::Token, Outcome::Attempt);

		let result = span
			.instrument(async {
				let guard = self.guard(&key);
				let _singleflight = guard.lock().await;

				// A concurrent caller may have filled the slot while we waited.
				if let Some(token) = self.cache.get_valid(&key, OffsetDateTime::now_utc()) {
					return Ok(token);
				}

				let issued_at = OffsetDateTime::now_utc();
				let issued = self
					.facade
					.exchange_client_credentials(
						self.config.token_url(&credential.directory_tenant),
						credential,
						&self.config.token_scope,
					)
					.await?;
				let cached = CachedToken::new(
					issued.access_token,
					issued_at,
					issued.expires_in,
					self.config.token_safety_margin,
				);
				let token = cached.access_token.clone();

				tracing::debug!(
					directory_tenant = %credential.directory_tenant,
					expires_at = %cached.expires_at,
					"Cached a new access token."
				);

				self.cache.put(key.clone(), cached);

				Ok(token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_operation(Operation::Token, Outcome::Success),
			Err(e) => {
				tracing::warn!(
					directory_tenant = %credential.directory_tenant,
					error = %e,
					"Token acquisition failed."
				);
				obs::record_operation(Operation::Token, Outcome::Failure);
			},
		}

		result
	}

	/// Drops the cached token for `credential` so the next call requests a fresh one.
	pub fn invalidate(&self, credential: &TenantCredential) {
		if self.cache.remove(&credential.fingerprint()) {
			tracing::debug!(
				directory_tenant = %credential.directory_tenant,
				"Invalidated cached access token."
			);
		}
	}

	/// Drops expired cache entries.
	pub fn purge_expired(&self) {
		self.cache.purge_expired(OffsetDateTime::now_utc());
	}

	/// Read access to the underlying cache.
	pub fn cache(&self) -> &TokenCache {
		&self.cache
	}

	fn guard(&self, key: &str) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
