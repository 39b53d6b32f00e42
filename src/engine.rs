//! Engine facade wiring the token manager, Graph client, resolvers, and orchestrator together.

// self
use crate::{
	_prelude::*,
	config::EngineConfig,
	details::TenantDetailsResolver,
	graph::GraphClient,
	http::ReqwestHttpClient,
	license::LicenseCatalog,
	model::{
		AccessToken, IdentitySignalProfile, SubscriptionSnapshot, SyncSource, TenantCredential,
		TenantDetails, TenantId, TenantSyncSummary, UserId,
	},
	profile::ProfileAggregator,
	store::DirectoryStore,
	sync::{SyncOrchestrator, TenantOutcome},
	token::TokenManager,
};

/// Directory synchronization engine.
///
/// One engine owns one HTTP client, one token cache, and one profile cache; clone the `Arc`s it
/// hands out rather than building several engines against the same provider.
#[derive(Debug)]
pub struct SyncEngine {
	config: Arc<EngineConfig>,
	tokens: Arc<TokenManager>,
	graph: Arc<GraphClient>,
	resolver: Arc<TenantDetailsResolver>,
	profiles: ProfileAggregator,
	orchestrator: Arc<SyncOrchestrator>,
}
impl SyncEngine {
	/// Builds an engine with the built-in license catalog and a fresh HTTP client.
	pub fn new<S>(config: EngineConfig, store: Arc<S>) -> Result<Self>
	where
		S: 'static + DirectoryStore,
	{
		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout_std())?;

		Ok(Self::with_parts(config, store, http_client, LicenseCatalog::builtin()))
	}

	/// Builds an engine from caller-supplied transport and license catalog.
	pub fn with_parts<S>(
		config: EngineConfig,
		store: Arc<S>,
		http_client: ReqwestHttpClient,
		licenses: LicenseCatalog,
	) -> Self
	where
		S: 'static + DirectoryStore,
	{
		let config = Arc::new(config);
		let store: Arc<dyn DirectoryStore> = store;
		let licenses = Arc::new(licenses);
		let tokens = Arc::new(TokenManager::new(config.clone(), http_client.clone()));
		let graph = Arc::new(GraphClient::new(config.clone(), http_client, tokens.clone()));
		let resolver = Arc::new(TenantDetailsResolver::new(graph.clone(), licenses.clone()));
		let profiles = ProfileAggregator::new(graph.clone());
		let orchestrator = Arc::new(SyncOrchestrator::new(
			config.clone(),
			store,
			graph.clone(),
			resolver.clone(),
			licenses,
		));

		Self { config, tokens, graph, resolver, profiles, orchestrator }
	}

	/// Engine configuration.
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Shared Graph client, for collaborators issuing their own calls.
	pub fn graph(&self) -> &Arc<GraphClient> {
		&self.graph
	}

	/// Syncs one tenant. See [`SyncOrchestrator::sync_tenant`].
	pub async fn sync_tenant(
		&self,
		tenant_id: &TenantId,
		source: SyncSource,
		cancel: &CancellationToken,
	) -> Result<TenantSyncSummary> {
		self.orchestrator.sync_tenant(tenant_id, source, cancel).await
	}

	/// Syncs every auto-sync tenant. See [`SyncOrchestrator::sync_all`].
	pub async fn sync_all(
		&self,
		source: SyncSource,
		cancel: &CancellationToken,
	) -> Result<Vec<TenantOutcome>> {
		self.orchestrator.sync_all(source, cancel).await
	}

	/// Resolves tenant details without touching the store.
	pub async fn resolve_tenant_details(
		&self,
		credential: &TenantCredential,
	) -> Result<TenantDetails> {
		self.resolver.resolve(credential).await
	}

	/// Resolves the subscription snapshot without touching the store.
	pub async fn resolve_subscription(
		&self,
		credential: &TenantCredential,
	) -> Result<SubscriptionSnapshot> {
		self.resolver.resolve_subscription(credential).await
	}

	/// Identity signals for one user; never fails, degraded facets are listed on the profile.
	pub async fn identity_signals(
		&self,
		credential: &TenantCredential,
		user_id: &UserId,
	) -> IdentitySignalProfile {
		self.profiles.identity_signals(credential, user_id).await
	}

	/// Drops a cached identity profile.
	pub fn invalidate_profile(&self, credential: &TenantCredential, user_id: &UserId) -> bool {
		self.profiles.invalidate(&credential.directory_tenant, user_id)
	}

	/// Access token for `credential`, served from cache while valid.
	pub async fn token(&self, credential: &TenantCredential) -> Result<AccessToken> {
		self.tokens.get_token(credential).await
	}

	/// Evicts expired tokens and profiles, returning how many profiles were dropped.
	pub fn purge_expired(&self) -> usize {
		self.tokens.purge_expired();

		self.profiles.purge_expired()
	}
}
