//! On-demand identity-signal aggregation with a short-lived cache.
//!
//! A cache miss issues one `$batch` call with five sub-requests. Each failing sub-request only
//! empties its own facet; callers always receive a profile.

pub mod cache;
pub mod derive;

pub use cache::*;
pub use derive::*;

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	graph::{
		BatchOutcome, BatchRequest, GraphClient,
		schema::{AppRoleAssignment, DirectoryObject, DriveItem, FollowedSite, ODataPage, SignIn},
	},
	model::{DirectoryTenantId, IdentitySignalProfile, SignalFacet, TenantCredential, UserId},
	obs::{self, OpSpan, Operation, Outcome},
};

/// Builds and caches [`IdentitySignalProfile`]s.
#[derive(Debug)]
pub struct ProfileAggregator {
	graph: Arc<GraphClient>,
	cache: ProfileCache,
	lookback: Duration,
}
impl ProfileAggregator {
	/// Creates an aggregator; TTL and lookback come from the engine configuration.
	pub fn new(graph: Arc<GraphClient>) -> Self {
		let config = graph.config();
		let cache = ProfileCache::new(config.profile_cache_ttl);
		let lookback = config.sign_in_lookback;

		Self { graph, cache, lookback }
	}

	/// Returns the identity signals for `user_id`, served from cache while fresh.
	pub async fn identity_signals(
		&self,
		credential: &TenantCredential,
		user_id: &UserId,
	) -> IdentitySignalProfile {
		let key = ProfileKey {
			directory_tenant: credential.directory_tenant.clone(),
			user_id: user_id.clone(),
		};
		let now = OffsetDateTime::now_utc();

		if let Some(profile) = self.cache.get(&key, now) {
			return profile;
		}

		let span = OpSpan::new(Operation::Profile, "identity_signals");

		obs::record_operation(Operation::Profile, Outcome::Attempt);

		let profile = span
			.instrument(async {
				let outcome = self.graph.batch(credential, self.requests(user_id, now)).await;

				derive_profile(user_id.clone(), facets(&outcome), OffsetDateTime::now_utc())
			})
			.await;

		if profile.is_unavailable() {
			tracing::warn!(user = %user_id, "Identity signals unavailable; profile not cached.");
			obs::record_operation(Operation::Profile, Outcome::Failure);
		} else {
			if !profile.degraded.is_empty() {
				tracing::info!(
					user = %user_id,
					degraded = ?profile.degraded,
					"Identity signals partially available."
				);
				obs::record_operation(Operation::Profile, Outcome::Degraded);
			} else {
				obs::record_operation(Operation::Profile, Outcome::Success);
			}

			self.cache.put(key, profile.clone(), now);
		}

		profile
	}

	/// Drops the cached profile for one user.
	pub fn invalidate(&self, directory_tenant: &DirectoryTenantId, user_id: &UserId) -> bool {
		self.cache.invalidate(&ProfileKey {
			directory_tenant: directory_tenant.clone(),
			user_id: user_id.clone(),
		})
	}

	/// Drops every expired profile, returning how many were removed.
	pub fn purge_expired(&self) -> usize {
		self.cache.purge_expired(OffsetDateTime::now_utc())
	}

	/// Underlying cache.
	pub fn cache(&self) -> &ProfileCache {
		&self.cache
	}

	fn requests(&self, user_id: &UserId, now: OffsetDateTime) -> Vec<BatchRequest> {
		let since = (now - self.lookback)
			.replace_nanosecond(0)
			.ok()
			.and_then(|at| at.format(&Rfc3339).ok());
		let mut filter = format!("userId eq '{user_id}'");

		if let Some(since) = since {
			filter.push_str(&format!(" and createdDateTime ge {since}"));
		}

		let filter = filter.replace(' ', "%20");

		vec![
			BatchRequest::get(
				SignalFacet::SignIns.batch_id(),
				format!("/auditLogs/signIns?$filter={filter}&$top=25"),
			),
			BatchRequest::get(
				SignalFacet::AppRoles.batch_id(),
				format!("/users/{user_id}/appRoleAssignments"),
			),
			BatchRequest::get(
				SignalFacet::Memberships.batch_id(),
				format!("/users/{user_id}/memberOf"),
			),
			BatchRequest::get(
				SignalFacet::FollowedSites.batch_id(),
				format!("/users/{user_id}/followedSites"),
			),
			BatchRequest::get(
				SignalFacet::RecentFiles.batch_id(),
				format!("/users/{user_id}/drive/recent?$top=10"),
			),
		]
	}
}

fn facets(outcome: &BatchOutcome) -> SignalFacets {
	for facet in SignalFacet::ALL {
		if let Some(response) =
			outcome.get(facet.batch_id()).filter(|response| !response.is_success())
		{
			tracing::debug!(
				facet = facet.batch_id(),
				status = response.status,
				"Identity signal facet failed."
			);
		}
	}

	SignalFacets {
		sign_ins: page::<SignIn>(outcome, SignalFacet::SignIns),
		app_roles: page::<AppRoleAssignment>(outcome, SignalFacet::AppRoles),
		member_of: page::<DirectoryObject>(outcome, SignalFacet::Memberships),
		followed_sites: page::<FollowedSite>(outcome, SignalFacet::FollowedSites),
		recent_files: page::<DriveItem>(outcome, SignalFacet::RecentFiles),
	}
}

fn page<T>(outcome: &BatchOutcome, facet: SignalFacet) -> Option<Vec<T>>
where
	T: DeserializeOwned,
{
	outcome.decode::<ODataPage<T>>(facet.batch_id()).map(|page| page.value)
}
