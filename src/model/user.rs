//! Directory user records and their reconciliation key.

// self
use crate::{
	_prelude::*,
	model::{TenantId, UserId},
};

/// Identity key used by reconciliation: provider id scoped to the local tenant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserKey {
	/// Provider-assigned user identifier.
	pub external_id: UserId,
	/// Local tenant the user belongs to.
	pub tenant_id: TenantId,
}

/// Directory user as mapped from the provider. Every field is owned by sync.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUserRecord {
	/// Provider-assigned user identifier.
	pub external_id: UserId,
	/// Local tenant the user belongs to.
	pub tenant_id: TenantId,
	/// Display name.
	pub display_name: String,
	/// Primary email (mail, falling back to the user principal name).
	pub email: Option<String>,
	/// First business phone.
	pub phone: Option<String>,
	/// Mobile phone.
	pub mobile_phone: Option<String>,
	/// Department.
	pub department: Option<String>,
	/// Office location.
	pub office_location: Option<String>,
	/// Human-readable license names, comma separated.
	pub license_display_name: Option<String>,
	/// Job title.
	pub job_title: Option<String>,
	/// `false` once the account is disabled at the provider.
	pub enabled: bool,
	/// Avatar reference (a `data:` URI when photos are fetched).
	pub avatar_reference: Option<String>,
}
impl DirectoryUserRecord {
	/// Creates an enabled record with only the identity fields set.
	pub fn new(external_id: UserId, tenant_id: TenantId, display_name: impl Into<String>) -> Self {
		Self {
			external_id,
			tenant_id,
			display_name: display_name.into(),
			email: None,
			phone: None,
			mobile_phone: None,
			department: None,
			office_location: None,
			license_display_name: None,
			job_title: None,
			enabled: true,
			avatar_reference: None,
		}
	}

	/// Returns the reconciliation key.
	pub fn key(&self) -> UserKey {
		UserKey { external_id: self.external_id.clone(), tenant_id: self.tenant_id.clone() }
	}

	/// Overwrites every sync-owned field with `incoming`.
	///
	/// The avatar is kept when `incoming` carries none, since photo fetches are best-effort.
	pub fn absorb(&mut self, incoming: DirectoryUserRecord) {
		let avatar = incoming.avatar_reference.or_else(|| self.avatar_reference.take());

		*self = DirectoryUserRecord { avatar_reference: avatar, ..incoming };
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn record(display: &str) -> DirectoryUserRecord {
		DirectoryUserRecord::new(
			UserId::new("user-1").expect("User fixture should be valid."),
			TenantId::new("tenant-1").expect("Tenant fixture should be valid."),
			display,
		)
	}

	#[test]
	fn absorb_overwrites_fields_and_keeps_known_avatar() {
		let mut current = record("Old Name");

		current.avatar_reference = Some("data:image/jpeg;base64,AAAA".into());
		current.department = Some("Finance".into());

		let mut incoming = record("New Name");

		incoming.enabled = false;
		current.absorb(incoming);

		assert_eq!(current.display_name, "New Name");
		assert_eq!(current.department, None);
		assert!(!current.enabled);
		assert_eq!(current.avatar_reference.as_deref(), Some("data:image/jpeg;base64,AAAA"));
	}
}
