//! Tenant details and subscription snapshots produced by the details resolver.

// self
use crate::_prelude::*;

/// Kind of application credential whose expiry is tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
	/// Password credential (client secret).
	Secret,
	/// Key credential (certificate).
	Certificate,
}

/// License and credential-rotation snapshot; replaced wholesale on each resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
	/// Part number of the primary SKU.
	pub primary_sku: Option<String>,
	/// Display name of the primary SKU.
	pub license_display_name: Option<String>,
	/// Enabled seats on the primary SKU.
	pub seat_count: Option<u32>,
	/// Earliest client secret expiry.
	pub secret_expires_at: Option<OffsetDateTime>,
	/// Earliest certificate expiry.
	pub certificate_expires_at: Option<OffsetDateTime>,
}
impl SubscriptionSnapshot {
	/// Lists the credential kinds expiring before `now + window` (already expired included).
	pub fn expiring_within(&self, now: OffsetDateTime, window: Duration) -> Vec<CredentialKind> {
		let horizon = now + window;

		[
			(CredentialKind::Secret, self.secret_expires_at),
			(CredentialKind::Certificate, self.certificate_expires_at),
		]
		.into_iter()
		.filter_map(|(kind, expiry)| expiry.filter(|at| *at <= horizon).map(|_| kind))
		.collect()
	}
}

/// Detail facet that could not be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailFacet {
	/// `GET /organization`.
	Organization,
	/// `GET /subscribedSkus`.
	SubscribedSkus,
	/// User count.
	UserCount,
	/// Device count.
	DeviceCount,
	/// `GET /applications/{clientId}`.
	ApplicationCredentials,
}
impl DetailFacet {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Organization => "organization",
			Self::SubscribedSkus => "subscribed_skus",
			Self::UserCount => "user_count",
			Self::DeviceCount => "device_count",
			Self::ApplicationCredentials => "application_credentials",
		}
	}
}

/// Everything the resolver learned about a tenant; missing facets stay empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantDetails {
	/// Organization display name.
	pub organization_name: Option<String>,
	/// Default verified domain.
	pub primary_domain: Option<String>,
	/// User count reported by the provider.
	pub user_count: Option<u64>,
	/// Device count reported by the provider.
	pub device_count: Option<u64>,
	/// License and credential expiry snapshot.
	pub subscription: SubscriptionSnapshot,
	/// SKU id → SKU part number for every subscribed SKU.
	pub sku_index: BTreeMap<String, String>,
	/// Facets whose sub-call failed.
	pub degraded: Vec<DetailFacet>,
}
impl TenantDetails {
	/// Returns `true` when every sub-call succeeded.
	pub fn is_complete(&self) -> bool {
		self.degraded.is_empty()
	}
}
