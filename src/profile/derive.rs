//! Pure derivation of an [`IdentitySignalProfile`] from decoded facets.

// self
use crate::{
	_prelude::*,
	graph::schema::{self, AppRoleAssignment, DirectoryObject, DriveItem, FollowedSite, SignIn},
	model::{
		AppRoleEntry, IdentitySignalProfile, Membership, MembershipKind, RecentFile, RiskLevel,
		SignInActivity, SignalFacet, UserId,
	},
};

/// Authentication methods that count as strong (multi-factor capable), matched as lowercase
/// substrings of the provider's method label.
pub const STRONG_AUTH_METHODS: &[&str] = &[
	"authenticator",
	"fido2",
	"windows hello",
	"passkey",
	"text message",
	"sms",
	"phone call",
	"oath",
	"mobile app",
	"certificate",
	"x.509",
	"x509",
];

/// Decoded facets; `None` marks a facet whose sub-request failed.
#[derive(Debug, Default)]
pub struct SignalFacets {
	/// Sign-ins within the lookback window.
	pub sign_ins: Option<Vec<SignIn>>,
	/// App role assignments.
	pub app_roles: Option<Vec<AppRoleAssignment>>,
	/// `memberOf` entries.
	pub member_of: Option<Vec<DirectoryObject>>,
	/// Followed sites.
	pub followed_sites: Option<Vec<FollowedSite>>,
	/// Recent drive items.
	pub recent_files: Option<Vec<DriveItem>>,
}

/// Builds a profile from `facets`; failed facets become empty collections marked degraded.
pub fn derive_profile(
	user_id: UserId,
	facets: SignalFacets,
	computed_at: OffsetDateTime,
) -> IdentitySignalProfile {
	let mut degraded = Vec::new();
	let mut mark = |facet: SignalFacet, present: bool| {
		if !present {
			degraded.push(facet);
		}
	};

	mark(SignalFacet::SignIns, facets.sign_ins.is_some());
	mark(SignalFacet::AppRoles, facets.app_roles.is_some());
	mark(SignalFacet::Memberships, facets.member_of.is_some());
	mark(SignalFacet::FollowedSites, facets.followed_sites.is_some());
	mark(SignalFacet::RecentFiles, facets.recent_files.is_some());

	let sign_ins = facets.sign_ins.unwrap_or_default();
	let mfa_enabled = sign_ins.iter().any(sign_in_used_mfa);
	let device_compliant = sign_ins.iter().any(sign_in_device_compliant);
	let risk_level = sign_ins.iter().filter_map(sign_in_risk).max().unwrap_or_default();

	IdentitySignalProfile {
		user_id,
		mfa_enabled,
		device_compliant,
		risk_level,
		risk_score: risk_level.trust_score(),
		recent_sign_ins: sign_ins.iter().map(activity).collect(),
		app_roles: facets.app_roles.unwrap_or_default().into_iter().map(app_role).collect(),
		memberships: memberships(
			facets.member_of.unwrap_or_default(),
			facets.followed_sites.unwrap_or_default(),
		),
		recent_files: facets
			.recent_files
			.unwrap_or_default()
			.into_iter()
			.filter_map(recent_file)
			.collect(),
		degraded,
		computed_at,
	}
}

/// `true` when the sign-in satisfied multi-factor authentication.
pub fn sign_in_used_mfa(sign_in: &SignIn) -> bool {
	let requirement_is_mfa =
		sign_in.authentication_requirement.as_deref().is_some_and(mentions_multi_factor);
	let detail_is_mfa = sign_in.authentication_details.iter().any(|detail| {
		[
			detail.authentication_step_requirement.as_deref(),
			detail.authentication_method_detail.as_deref(),
			detail.authentication_step_result_detail.as_deref(),
		]
		.into_iter()
		.flatten()
		.any(mentions_multi_factor)
			|| detail.authentication_method.as_deref().is_some_and(is_strong_method)
	});
	let legacy_mfa = sign_in
		.mfa_detail
		.as_ref()
		.and_then(|mfa| mfa.auth_method.as_deref())
		.is_some_and(|method| !method.trim().is_empty());

	requirement_is_mfa || detail_is_mfa || legacy_mfa
}

fn sign_in_device_compliant(sign_in: &SignIn) -> bool {
	sign_in.device_detail.as_ref().and_then(|device| device.is_compliant).unwrap_or(false)
}

fn sign_in_risk(sign_in: &SignIn) -> Option<RiskLevel> {
	[sign_in.risk_level_during_sign_in.as_deref(), sign_in.risk_level_aggregated.as_deref()]
		.into_iter()
		.flatten()
		.filter_map(RiskLevel::from_provider)
		.max()
}

fn mentions_multi_factor(text: &str) -> bool {
	let lower = text.to_ascii_lowercase();

	lower.contains("mfa") || lower.contains("multi-factor") || lower.contains("multifactor")
}

fn is_strong_method(method: &str) -> bool {
	let lower = method.to_ascii_lowercase();

	STRONG_AUTH_METHODS.iter().any(|strong| lower.contains(strong))
}

fn activity(sign_in: &SignIn) -> SignInActivity {
	let location = sign_in.location.as_ref().and_then(|location| {
		let parts = [location.city.as_deref(), location.country_or_region.as_deref()]
			.into_iter()
			.flatten()
			.filter(|part| !part.is_empty())
			.collect::<Vec<_>>();

		if parts.is_empty() { None } else { Some(parts.join(", ")) }
	});

	SignInActivity {
		at: schema::parse_timestamp(sign_in.created_date_time.as_deref()),
		app_display_name: sign_in.app_display_name.clone(),
		ip_address: sign_in.ip_address.clone(),
		location,
		risk_level: sign_in_risk(sign_in),
		mfa: sign_in_used_mfa(sign_in),
		device_compliant: sign_in_device_compliant(sign_in),
	}
}

fn app_role(assignment: AppRoleAssignment) -> AppRoleEntry {
	AppRoleEntry {
		assigned_at: schema::parse_timestamp(assignment.created_date_time.as_deref()),
		resource_display_name: assignment.resource_display_name,
		app_role_id: assignment.app_role_id,
	}
}

fn memberships(member_of: Vec<DirectoryObject>, sites: Vec<FollowedSite>) -> Vec<Membership> {
	let mut seen = BTreeSet::new();
	let mut memberships = Vec::new();

	for object in member_of.into_iter().filter(DirectoryObject::is_group) {
		let Some(name) = object.display_name.filter(|name| !name.trim().is_empty()) else {
			continue;
		};

		if seen.insert(name.to_lowercase()) {
			memberships.push(Membership {
				display_name: name,
				kind: MembershipKind::DirectoryRole,
				web_url: None,
			});
		}
	}
	for site in sites {
		let Some(name) = site.display_name.filter(|name| !name.trim().is_empty()) else {
			continue;
		};

		if seen.insert(name.to_lowercase()) {
			memberships.push(Membership {
				display_name: name,
				kind: MembershipKind::Collaboration,
				web_url: site.web_url,
			});
		}
	}

	memberships
}

fn recent_file(item: DriveItem) -> Option<RecentFile> {
	let name = item.name.filter(|name| !name.trim().is_empty())?;
	let accessed = item
		.file_system_info
		.and_then(|info| info.last_accessed_date_time)
		.or(item.last_modified_date_time);

	Some(RecentFile {
		name,
		web_url: item.web_url,
		last_accessed_at: schema::parse_timestamp(accessed.as_deref()),
	})
}
