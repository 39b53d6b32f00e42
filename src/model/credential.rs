//! Tenant credential sets and their feature flags.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	model::{ClientSecret, DirectoryTenantId},
};

/// Per-tenant feature flags controlling whether the engine may fetch data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFlags {
	/// Any provider fetch (manual or scheduled) is allowed.
	pub fetch_enabled: bool,
	/// The tenant takes part in scheduled pool runs.
	pub auto_sync_enabled: bool,
}

/// Credential set the engine uses to act on behalf of one customer directory.
///
/// Owned by the tenant aggregate and only changed through explicit configuration updates; the
/// engine treats it as read-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantCredential {
	/// Provider-assigned directory (tenant) identifier.
	pub directory_tenant: DirectoryTenantId,
	/// Application (client) identifier.
	pub client_id: String,
	/// Application client secret.
	pub client_secret: ClientSecret,
	/// Feature flags.
	pub flags: SyncFlags,
}
impl TenantCredential {
	/// Creates a credential with every flag disabled.
	pub fn new(
		directory_tenant: DirectoryTenantId,
		client_id: impl Into<String>,
		client_secret: ClientSecret,
	) -> Self {
		Self {
			directory_tenant,
			client_id: client_id.into(),
			client_secret,
			flags: SyncFlags::default(),
		}
	}

	/// Replaces the feature flags.
	pub fn with_flags(mut self, flags: SyncFlags) -> Self {
		self.flags = flags;

		self
	}

	/// Returns `true` when both the client id and the secret are present.
	pub fn is_complete(&self) -> bool {
		!self.client_id.trim().is_empty() && !self.client_secret.is_blank()
	}

	/// Returns `true` when the tenant may be synced by a scheduled pool run.
	pub fn is_auto_sync_eligible(&self) -> bool {
		self.is_complete() && self.flags.fetch_enabled && self.flags.auto_sync_enabled
	}

	/// Stable cache key for this credential set.
	///
	/// The key is a base64 (no padding) SHA-256 digest over the directory tenant, client id,
	/// and secret, so a rotated secret never reuses a token minted for the previous one.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.directory_tenant.as_bytes());
		hasher.update([0]);
		hasher.update(self.client_id.as_bytes());
		hasher.update([0]);
		hasher.update(self.client_secret.expose().as_bytes());

		STANDARD_NO_PAD.encode(hasher.finalize())
	}
}
