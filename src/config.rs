//! Explicit engine configuration passed to every component.
//!
//! [`EngineConfig`] carries provider endpoints, per-request timeouts, pagination ceilings, and
//! cache windows as independently overridable options. The engine never reads ambient global
//! state; callers build one configuration and share it behind an [`Arc`].

// self
use crate::{_prelude::*, error::ConfigError};

const DEFAULT_LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";
const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_TOKEN_SCOPE: &str = "https://graph.microsoft.com/.default";
/// Largest `$top` the provider accepts for user listings.
const MAX_USER_PAGE_SIZE: u32 = 999;

/// Immutable engine configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
	/// Identity provider base URL; tokens are requested at
	/// `{login_endpoint}/{tenant}/oauth2/v2.0/token`.
	pub login_endpoint: Url,
	/// Versioned Graph base URL (e.g. `https://graph.microsoft.com/v1.0`).
	pub graph_endpoint: Url,
	/// Scope requested with every client-credentials grant.
	pub token_scope: String,
	/// Timeout applied to each individual HTTP call.
	pub request_timeout: Duration,
	/// Maximum number of pages fetched by a single pager.
	pub max_pages: usize,
	/// Margin subtracted from the provider's `expires_in` before a token is considered expired.
	pub token_safety_margin: Duration,
	/// Lifetime of cached identity signal profiles.
	pub profile_cache_ttl: Duration,
	/// `$top` used for user listings.
	pub user_page_size: u32,
	/// Number of records written per reconciliation chunk.
	pub reconcile_chunk_size: usize,
	/// Number of tenants synced concurrently by the pool.
	pub max_concurrent_tenants: usize,
	/// Wall-clock ceiling for a single tenant run.
	pub sync_budget: Duration,
	/// How far back sign-in logs are requested for identity signals.
	pub sign_in_lookback: Duration,
	/// Fetch user photos during sync and store them as avatar data URIs.
	pub fetch_photos: bool,
}
impl EngineConfig {
	/// Creates a builder seeded with the defaults.
	pub fn builder() -> EngineConfigBuilder {
		EngineConfigBuilder::default()
	}

	/// Returns the token endpoint for a directory tenant.
	pub fn token_url(&self, directory_tenant: &str) -> String {
		format!("{}/{directory_tenant}/oauth2/v2.0/token", trimmed(&self.login_endpoint))
	}

	/// Joins a Graph-relative path (starting with `/`) onto the Graph base URL.
	pub fn graph_url(&self, path: &str) -> String {
		format!("{}{path}", trimmed(&self.graph_endpoint))
	}

	/// Per-request timeout as a std duration for the transport layer.
	pub fn request_timeout_std(&self) -> std::time::Duration {
		std::time::Duration::try_from(self.request_timeout).unwrap_or_default()
	}

	/// Sync budget as a std duration for the runtime timer.
	pub fn sync_budget_std(&self) -> std::time::Duration {
		std::time::Duration::try_from(self.sync_budget).unwrap_or_default()
	}
}
impl Default for EngineConfig {
	fn default() -> Self {
		EngineConfigBuilder::default().seed()
	}
}

fn trimmed(url: &Url) -> &str {
	url.as_str().trim_end_matches('/')
}

/// Builder for [`EngineConfig`] values.
#[derive(Clone, Debug, Default)]
pub struct EngineConfigBuilder {
	login_endpoint: Option<Url>,
	graph_endpoint: Option<Url>,
	token_scope: Option<String>,
	request_timeout: Option<Duration>,
	max_pages: Option<usize>,
	token_safety_margin: Option<Duration>,
	profile_cache_ttl: Option<Duration>,
	user_page_size: Option<u32>,
	reconcile_chunk_size: Option<usize>,
	max_concurrent_tenants: Option<usize>,
	sync_budget: Option<Duration>,
	sign_in_lookback: Option<Duration>,
	fetch_photos: Option<bool>,
}
impl EngineConfigBuilder {
	/// Overrides the identity provider base URL.
	pub fn login_endpoint(mut self, url: Url) -> Self {
		self.login_endpoint = Some(url);

		self
	}

	/// Overrides the versioned Graph base URL.
	pub fn graph_endpoint(mut self, url: Url) -> Self {
		self.graph_endpoint = Some(url);

		self
	}

	/// Overrides the token scope.
	pub fn token_scope(mut self, scope: impl Into<String>) -> Self {
		self.token_scope = Some(scope.into());

		self
	}

	/// Overrides the per-request timeout (default 30 seconds).
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Overrides the page ceiling (default 100).
	pub fn max_pages(mut self, pages: usize) -> Self {
		self.max_pages = Some(pages);

		self
	}

	/// Overrides the token safety margin (default 60 seconds).
	pub fn token_safety_margin(mut self, margin: Duration) -> Self {
		self.token_safety_margin = Some(margin);

		self
	}

	/// Overrides the identity signal cache TTL (default 10 minutes).
	pub fn profile_cache_ttl(mut self, ttl: Duration) -> Self {
		self.profile_cache_ttl = Some(ttl);

		self
	}

	/// Overrides the user listing page size (default 999).
	pub fn user_page_size(mut self, size: u32) -> Self {
		self.user_page_size = Some(size);

		self
	}

	/// Overrides the reconciliation chunk size (default 100).
	pub fn reconcile_chunk_size(mut self, size: usize) -> Self {
		self.reconcile_chunk_size = Some(size);

		self
	}

	/// Overrides the tenant pool width (default 4).
	pub fn max_concurrent_tenants(mut self, tenants: usize) -> Self {
		self.max_concurrent_tenants = Some(tenants);

		self
	}

	/// Overrides the per-run wall-clock budget (default 15 minutes).
	pub fn sync_budget(mut self, budget: Duration) -> Self {
		self.sync_budget = Some(budget);

		self
	}

	/// Overrides the sign-in lookback window (default 30 days).
	pub fn sign_in_lookback(mut self, lookback: Duration) -> Self {
		self.sign_in_lookback = Some(lookback);

		self
	}

	/// Enables or disables user photo fetching (default off).
	pub fn fetch_photos(mut self, enabled: bool) -> Self {
		self.fetch_photos = Some(enabled);

		self
	}

	/// Validates the builder and returns the configuration.
	pub fn build(self) -> Result<EngineConfig, ConfigError> {
		let config = self.seed();

		validate_endpoint("login", &config.login_endpoint)?;
		validate_endpoint("graph", &config.graph_endpoint)?;

		if config.token_scope.trim().is_empty() {
			return Err(invalid("token_scope", "must not be empty"));
		}
		if !config.request_timeout.is_positive() {
			return Err(invalid("request_timeout", "must be positive"));
		}
		if config.max_pages == 0 {
			return Err(invalid("max_pages", "must be at least 1"));
		}
		if config.token_safety_margin.is_negative() {
			return Err(invalid("token_safety_margin", "must not be negative"));
		}
		if config.profile_cache_ttl.is_negative() {
			return Err(invalid("profile_cache_ttl", "must not be negative"));
		}
		if config.user_page_size == 0 || config.user_page_size > MAX_USER_PAGE_SIZE {
			return Err(invalid("user_page_size", "must be between 1 and 999"));
		}
		if config.reconcile_chunk_size == 0 {
			return Err(invalid("reconcile_chunk_size", "must be at least 1"));
		}
		if config.max_concurrent_tenants == 0 {
			return Err(invalid("max_concurrent_tenants", "must be at least 1"));
		}
		if !config.sync_budget.is_positive() {
			return Err(invalid("sync_budget", "must be positive"));
		}
		if !config.sign_in_lookback.is_positive() {
			return Err(invalid("sign_in_lookback", "must be positive"));
		}

		Ok(config)
	}

	fn seed(self) -> EngineConfig {
		EngineConfig {
			login_endpoint: self.login_endpoint.unwrap_or_else(|| default_url(DEFAULT_LOGIN_ENDPOINT)),
			graph_endpoint: self.graph_endpoint.unwrap_or_else(|| default_url(DEFAULT_GRAPH_ENDPOINT)),
			token_scope: self.token_scope.unwrap_or_else(|| DEFAULT_TOKEN_SCOPE.into()),
			request_timeout: self.request_timeout.unwrap_or(Duration::seconds(30)),
			max_pages: self.max_pages.unwrap_or(100),
			token_safety_margin: self.token_safety_margin.unwrap_or(Duration::seconds(60)),
			profile_cache_ttl: self.profile_cache_ttl.unwrap_or(Duration::minutes(10)),
			user_page_size: self.user_page_size.unwrap_or(MAX_USER_PAGE_SIZE),
			reconcile_chunk_size: self.reconcile_chunk_size.unwrap_or(100),
			max_concurrent_tenants: self.max_concurrent_tenants.unwrap_or(4),
			sync_budget: self.sync_budget.unwrap_or(Duration::minutes(15)),
			sign_in_lookback: self.sign_in_lookback.unwrap_or(Duration::days(30)),
			fetch_photos: self.fetch_photos.unwrap_or(false),
		}
	}
}

fn default_url(raw: &'static str) -> Url {
	// Constants above are valid absolute URLs.
	Url::parse(raw).unwrap_or_else(|_| unreachable!("built-in endpoint {raw} must parse"))
}

fn validate_endpoint(endpoint: &'static str, url: &Url) -> Result<(), ConfigError> {
	if url.cannot_be_a_base() {
		return Err(ConfigError::InvalidEndpoint {
			endpoint,
			source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
		});
	}
	if !matches!(url.scheme(), "http" | "https") {
		return Err(ConfigError::InvalidSetting {
			name: endpoint,
			reason: "endpoint must use http or https",
		});
	}

	Ok(())
}

fn invalid(name: &'static str, reason: &'static str) -> ConfigError {
	ConfigError::InvalidSetting { name, reason }
}
