//! Identity-signal profile derived from a user's sign-in and activity facets.

// self
use crate::{_prelude::*, model::UserId};

/// Sign-in risk bucket, ordered from least to most risky.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
	/// No elevated risk observed.
	#[default]
	Low,
	/// At least one medium-risk sign-in.
	Medium,
	/// At least one high-risk sign-in.
	High,
}
impl RiskLevel {
	/// Parses a provider risk label; `none`, `low`, hidden, and unknown labels map to `None`.
	pub fn from_provider(label: &str) -> Option<Self> {
		match label.trim().to_ascii_lowercase().as_str() {
			"medium" => Some(Self::Medium),
			"high" => Some(Self::High),
			_ => None,
		}
	}

	/// Inverse trust score shown next to the level.
	pub const fn trust_score(self) -> f32 {
		match self {
			Self::High => 2.1,
			Self::Medium => 5.4,
			Self::Low => 8.8,
		}
	}

	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Low => "low",
			Self::Medium => "medium",
			Self::High => "high",
		}
	}
}
impl Display for RiskLevel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One recent sign-in, reduced to what the console renders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignInActivity {
	/// Sign-in time, when parseable.
	pub at: Option<OffsetDateTime>,
	/// Application used.
	pub app_display_name: Option<String>,
	/// Client IP address.
	pub ip_address: Option<String>,
	/// City and country, joined.
	pub location: Option<String>,
	/// Provider-reported risk, if elevated.
	pub risk_level: Option<RiskLevel>,
	/// Whether the sign-in satisfied multi-factor authentication.
	pub mfa: bool,
	/// Whether the device was reported as compliant.
	pub device_compliant: bool,
}

/// Application role assignment held by the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRoleEntry {
	/// Resource application display name.
	pub resource_display_name: Option<String>,
	/// Assigned role identifier.
	pub app_role_id: Option<String>,
	/// Assignment creation time, when parseable.
	pub assigned_at: Option<OffsetDateTime>,
}

/// Membership category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipKind {
	/// Directory group.
	DirectoryRole,
	/// Followed collaboration site not already covered by a group.
	Collaboration,
}

/// Group or site membership.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
	/// Display name.
	pub display_name: String,
	/// Category.
	pub kind: MembershipKind,
	/// Link to the site, for collaboration entries.
	pub web_url: Option<String>,
}

/// Recently accessed drive item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFile {
	/// File name.
	pub name: String,
	/// Link to the file.
	pub web_url: Option<String>,
	/// Last access or modification time, when parseable.
	pub last_accessed_at: Option<OffsetDateTime>,
}

/// Facet of the identity-signal batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalFacet {
	/// Sign-in audit log.
	SignIns,
	/// App role assignments.
	AppRoles,
	/// `memberOf`.
	Memberships,
	/// Followed sites.
	FollowedSites,
	/// Recent drive files.
	RecentFiles,
}
impl SignalFacet {
	/// Every facet, in batch order.
	pub const ALL: [Self; 5] =
		[Self::SignIns, Self::AppRoles, Self::Memberships, Self::FollowedSites, Self::RecentFiles];

	/// Sub-request identifier used in the batch payload.
	pub const fn batch_id(self) -> &'static str {
		match self {
			Self::SignIns => "signins",
			Self::AppRoles => "approles",
			Self::Memberships => "memberof",
			Self::FollowedSites => "sites",
			Self::RecentFiles => "recent",
		}
	}
}

/// Derived identity summary for one user. Recomputed as a whole on every cache miss.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentitySignalProfile {
	/// Provider user identifier.
	pub user_id: UserId,
	/// Any sign-in satisfied multi-factor authentication.
	pub mfa_enabled: bool,
	/// Any sign-in came from a compliant device.
	pub device_compliant: bool,
	/// Highest risk level observed.
	pub risk_level: RiskLevel,
	/// Trust score derived from [`RiskLevel::trust_score`].
	pub risk_score: f32,
	/// Recent sign-ins, newest first as returned by the provider.
	pub recent_sign_ins: Vec<SignInActivity>,
	/// App role assignments.
	pub app_roles: Vec<AppRoleEntry>,
	/// Group and site memberships.
	pub memberships: Vec<Membership>,
	/// Recently accessed files.
	pub recent_files: Vec<RecentFile>,
	/// Facets that failed and are shown empty.
	pub degraded: Vec<SignalFacet>,
	/// Computation time.
	pub computed_at: OffsetDateTime,
}
impl IdentitySignalProfile {
	/// Profile with every facet empty and marked degraded.
	pub fn unavailable(user_id: UserId) -> Self {
		Self {
			user_id,
			mfa_enabled: false,
			device_compliant: false,
			risk_level: RiskLevel::Low,
			risk_score: RiskLevel::Low.trust_score(),
			recent_sign_ins: Vec::new(),
			app_roles: Vec::new(),
			memberships: Vec::new(),
			recent_files: Vec::new(),
			degraded: SignalFacet::ALL.to_vec(),
			computed_at: OffsetDateTime::now_utc(),
		}
	}

	/// Returns `true` when no facet could be fetched.
	pub fn is_unavailable(&self) -> bool {
		SignalFacet::ALL.iter().all(|facet| self.degraded.contains(facet))
	}
}
