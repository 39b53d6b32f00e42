//! Storage contracts and the built-in in-memory store for tenants, users, and sync summaries.

pub mod memory;

pub use memory::MemoryStore;

// std
use std::mem;
// self
use crate::{
	_prelude::*,
	model::{
		DetailFacet, DirectoryUserRecord, SubscriptionSnapshot, TenantCredential, TenantDetails,
		TenantId, TenantSyncSummary, UserKey,
	},
};

/// Boxed future returned by [`DirectoryStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract the sync engine writes through.
pub trait DirectoryStore
where
	Self: Send + Sync,
{
	/// Loads one tenant.
	fn tenant<'a>(&'a self, id: &'a TenantId) -> StoreFuture<'a, Option<TenantRecord>>;

	/// Lists tenants eligible for scheduled sync.
	fn auto_sync_tenants(&self) -> StoreFuture<'_, Vec<TenantRecord>>;

	/// Replaces a tenant record.
	fn update_tenant(&self, record: TenantRecord) -> StoreFuture<'_, ()>;

	/// Upserts one chunk of users atomically: either every record is written or none is.
	///
	/// Records are matched on [`UserKey`]; matched rows get every sync-owned field replaced and
	/// keep their locally-owned fields, unmatched rows are inserted. Nothing is deleted.
	fn upsert_users<'a>(
		&'a self,
		tenant: &'a TenantId,
		chunk: Vec<DirectoryUserRecord>,
	) -> StoreFuture<'a, UpsertReport>;

	/// Lists the users of a tenant.
	fn list_users<'a>(&'a self, tenant: &'a TenantId) -> StoreFuture<'a, Vec<StoredUser>>;

	/// Counts the users of a tenant.
	fn count_users<'a>(&'a self, tenant: &'a TenantId) -> StoreFuture<'a, usize>;

	/// Appends a sync summary.
	fn append_summary(&self, summary: TenantSyncSummary) -> StoreFuture<'_, ()>;

	/// Lists a tenant's summaries, oldest first.
	fn summaries<'a>(
		&'a self,
		tenant: &'a TenantId,
	) -> StoreFuture<'a, Vec<TenantSyncSummary>>;
}

/// Error type produced by [`DirectoryStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Counts reported by one atomic chunk upsert.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
	/// Rows created.
	pub inserted: usize,
	/// Existing rows updated.
	pub updated: usize,
}
impl UpsertReport {
	/// Rows written.
	pub fn total(&self) -> usize {
		self.inserted + self.updated
	}
}

/// Stored user row: the sync-owned record plus locally-owned fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
	/// Local row identifier, stable across syncs.
	pub local_id: u64,
	/// Sync-owned fields.
	pub record: DirectoryUserRecord,
	/// Console notes; never touched by sync.
	pub notes: Option<String>,
	/// Row creation time.
	pub created_at: OffsetDateTime,
	/// Last sync update.
	pub updated_at: OffsetDateTime,
}
impl StoredUser {
	/// Reconciliation key.
	pub fn key(&self) -> UserKey {
		self.record.key()
	}
}

/// Store-side tenant aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
	/// Local tenant identifier.
	pub id: TenantId,
	/// Display name.
	pub name: Option<String>,
	/// Primary domain.
	pub primary_domain: Option<String>,
	/// Name and domain were entered by hand and must not be overwritten.
	pub is_manual_override: bool,
	/// Directory credential, if configured.
	pub credential: Option<TenantCredential>,
	/// Latest subscription snapshot.
	pub subscription: SubscriptionSnapshot,
	/// User count reported by the provider.
	pub provider_user_count: Option<u64>,
	/// Device count reported by the provider.
	pub device_count: Option<u64>,
	/// Users stored locally after the last sync.
	pub local_user_count: usize,
	/// Completion time of the last successful sync.
	pub last_synced_at: Option<OffsetDateTime>,
}
impl TenantRecord {
	/// Creates an empty, non-overridden tenant without credentials.
	pub fn new(id: TenantId) -> Self {
		Self {
			id,
			name: None,
			primary_domain: None,
			is_manual_override: false,
			credential: None,
			subscription: SubscriptionSnapshot::default(),
			provider_user_count: None,
			device_count: None,
			local_user_count: 0,
			last_synced_at: None,
		}
	}

	/// Sets the credential.
	pub fn with_credential(mut self, credential: TenantCredential) -> Self {
		self.credential = Some(credential);

		self
	}

	/// Sets name and domain by hand and marks them as overridden.
	pub fn with_manual_identity(
		mut self,
		name: Option<String>,
		primary_domain: Option<String>,
	) -> Self {
		self.name = name;
		self.primary_domain = primary_domain;
		self.is_manual_override = true;

		self
	}

	/// Returns `true` when the tenant may be synced by a scheduled pool run.
	pub fn is_auto_sync_eligible(&self) -> bool {
		self.credential.as_ref().is_some_and(TenantCredential::is_auto_sync_eligible)
	}

	/// Folds resolved details into the record.
	///
	/// With a manual override only empty name/domain are filled; otherwise non-empty resolved
	/// values win. Counts are kept when the provider reported none. The subscription snapshot is
	/// replaced, except that the license fields and the credential expiries keep their prior
	/// values when the facet feeding them is degraded.
	pub fn apply_details(&mut self, details: &TenantDetails) {
		let resolved_name = non_blank(details.organization_name.as_deref());
		let resolved_domain = non_blank(details.primary_domain.as_deref());

		if self.is_manual_override {
			if non_blank(self.name.as_deref()).is_none() {
				self.name = resolved_name.or(self.name.take());
			}
			if non_blank(self.primary_domain.as_deref()).is_none() {
				self.primary_domain = resolved_domain.or(self.primary_domain.take());
			}
		} else {
			if let Some(name) = resolved_name {
				self.name = Some(name);
			}
			if let Some(domain) = resolved_domain {
				self.primary_domain = Some(domain);
			}
		}

		let prior = mem::replace(&mut self.subscription, details.subscription.clone());

		if details.degraded.contains(&DetailFacet::SubscribedSkus) {
			self.subscription.primary_sku = prior.primary_sku;
			self.subscription.license_display_name = prior.license_display_name;
			self.subscription.seat_count = prior.seat_count;
		}
		if details.degraded.contains(&DetailFacet::ApplicationCredentials) {
			self.subscription.secret_expires_at = prior.secret_expires_at;
			self.subscription.certificate_expires_at = prior.certificate_expires_at;
		}

		if details.user_count.is_some() {
			self.provider_user_count = details.user_count;
		}
		if details.device_count.is_some() {
			self.device_count = details.device_count;
		}
	}

	/// User count shown on dashboards: the larger of the provider and local counts.
	pub fn reported_user_count(&self) -> u64 {
		self.provider_user_count.unwrap_or(0).max(self.local_user_count as u64)
	}
}

fn non_blank(value: Option<&str>) -> Option<String> {
	value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;

	fn tenant() -> TenantRecord {
		TenantRecord::new(TenantId::new("tenant-1").expect("Tenant fixture should be valid."))
	}

	fn details(name: &str, domain: &str) -> TenantDetails {
		TenantDetails {
			organization_name: Some(name.into()),
			primary_domain: Some(domain.into()),
			user_count: Some(40),
			..TenantDetails::default()
		}
	}

	#[test]
	fn store_error_converts_into_engine_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("database unreachable"));

		let source = StdError::source(&error)
			.expect("Engine error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn resolved_identity_overwrites_without_override() {
		let mut record = tenant();

		record.name = Some("Old".into());
		record.apply_details(&details("Contoso Ltd", "contoso.com"));

		assert_eq!(record.name.as_deref(), Some("Contoso Ltd"));
		assert_eq!(record.primary_domain.as_deref(), Some("contoso.com"));

		record.apply_details(&details("  ", ""));

		assert_eq!(record.name.as_deref(), Some("Contoso Ltd"));
		assert_eq!(record.primary_domain.as_deref(), Some("contoso.com"));
	}

	#[test]
	fn manual_override_only_fills_empty_fields() {
		let mut record = tenant().with_manual_identity(Some("Hand Named".into()), None);

		record.apply_details(&details("Contoso Ltd", "contoso.com"));

		assert_eq!(record.name.as_deref(), Some("Hand Named"));
		assert_eq!(record.primary_domain.as_deref(), Some("contoso.com"));
	}

	#[test]
	fn degraded_facets_keep_the_prior_subscription_fields() {
		let mut record = tenant();
		let expiry = OffsetDateTime::UNIX_EPOCH + Duration::days(20_000);
		let mut healthy = details("Contoso", "contoso.com");

		healthy.subscription = SubscriptionSnapshot {
			primary_sku: Some("ENTERPRISEPACK".into()),
			license_display_name: Some("Office 365 E3".into()),
			seat_count: Some(25),
			secret_expires_at: Some(expiry),
			certificate_expires_at: None,
		};
		record.apply_details(&healthy);

		let mut degraded = details("Contoso", "contoso.com");

		degraded.degraded = vec![DetailFacet::ApplicationCredentials];
		degraded.subscription.primary_sku = Some("SPE_E5".into());
		record.apply_details(&degraded);

		assert_eq!(record.subscription.secret_expires_at, Some(expiry));
		assert_eq!(record.subscription.primary_sku.as_deref(), Some("SPE_E5"));
		assert_eq!(record.subscription.license_display_name, None);

		let mut skus_down = details("Contoso", "contoso.com");

		skus_down.degraded = vec![DetailFacet::SubscribedSkus];
		record.apply_details(&skus_down);

		assert_eq!(record.subscription.primary_sku.as_deref(), Some("SPE_E5"));
		assert_eq!(record.subscription.secret_expires_at, None);
	}

	#[test]
	fn reported_count_takes_the_larger_value() {
		let mut record = tenant();

		record.apply_details(&details("Contoso", "contoso.com"));
		record.local_user_count = 55;

		assert_eq!(record.reported_user_count(), 55);

		record.local_user_count = 10;

		assert_eq!(record.reported_user_count(), 40);
	}
}
