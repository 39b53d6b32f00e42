//! Typed shapes of the provider payloads the engine reads.
//!
//! Every field is optional or defaulted so partial payloads (restricted `$select`, degraded
//! permissions) still decode. A missing key and an explicit `null` decode the same way.
//! Timestamps stay strings and are parsed with [`parse_timestamp`].

// crates.io
use serde::Deserializer;
use time::format_description::well_known::Rfc3339;
// self
use crate::_prelude::*;

/// Decodes `null` as `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes a list, treating `null` for the list or any of its items as absent.
fn null_tolerant_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?.unwrap_or_default();

	Ok(items.into_iter().flatten().collect())
}

/// Parses an RFC 3339 timestamp; absent or unparsable input yields `None`.
pub fn parse_timestamp(raw: Option<&str>) -> Option<OffsetDateTime> {
	let raw = raw?.trim();

	OffsetDateTime::parse(raw, &Rfc3339).ok()
}

/// Collection envelope returned by list endpoints.
#[derive(Clone, Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ODataPage<T> {
	/// Items on this page.
	#[serde(default = "Vec::new", deserialize_with = "null_tolerant_vec")]
	pub value: Vec<T>,
	/// Continuation URL, used verbatim.
	#[serde(default, rename = "@odata.nextLink")]
	pub next_link: Option<String>,
	/// Total count, present when `$count=true` was requested.
	#[serde(default, rename = "@odata.count")]
	pub count: Option<u64>,
}

/// Error envelope returned on failed calls.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ODataError {
	/// Error body.
	#[serde(deserialize_with = "null_as_default")]
	pub error: ODataErrorBody,
}

/// Error code and message.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ODataErrorBody {
	/// Provider error code.
	#[serde(deserialize_with = "null_as_default")]
	pub code: String,
	/// Provider error message.
	#[serde(deserialize_with = "null_as_default")]
	pub message: String,
}

/// `GET /organization` item.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Organization {
	/// Organization display name.
	pub display_name: Option<String>,
	/// Verified domains.
	#[serde(deserialize_with = "null_tolerant_vec")]
	pub verified_domains: Vec<VerifiedDomain>,
}
impl Organization {
	/// Default domain, else the initial domain, else the first listed.
	pub fn primary_domain(&self) -> Option<&str> {
		self.verified_domains
			.iter()
			.find(|domain| domain.is_default)
			.or_else(|| self.verified_domains.iter().find(|domain| domain.is_initial))
			.or_else(|| self.verified_domains.first())
			.map(|domain| domain.name.as_str())
			.filter(|name| !name.is_empty())
	}
}

/// Verified domain entry.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifiedDomain {
	/// Domain name.
	#[serde(deserialize_with = "null_as_default")]
	pub name: String,
	/// Default domain flag.
	#[serde(deserialize_with = "null_as_default")]
	pub is_default: bool,
	/// Initial (`*.onmicrosoft.com`) domain flag.
	#[serde(deserialize_with = "null_as_default")]
	pub is_initial: bool,
}

/// `GET /subscribedSkus` item.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscribedSku {
	/// SKU identifier (GUID).
	#[serde(deserialize_with = "null_as_default")]
	pub sku_id: String,
	/// SKU part number, e.g. `ENTERPRISEPACK`.
	#[serde(deserialize_with = "null_as_default")]
	pub sku_part_number: String,
	/// `Enabled`, `Warning`, `Suspended`, ...
	#[serde(deserialize_with = "null_as_default")]
	pub capability_status: String,
	/// Seat counts.
	#[serde(deserialize_with = "null_as_default")]
	pub prepaid_units: PrepaidUnits,
}
impl SubscribedSku {
	/// Returns `true` for SKUs whose capability status is `Enabled`.
	pub fn is_enabled(&self) -> bool {
		self.capability_status.eq_ignore_ascii_case("Enabled")
	}
}

/// Seat counts of a subscribed SKU.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrepaidUnits {
	/// Enabled seats.
	#[serde(deserialize_with = "null_as_default")]
	pub enabled: u32,
}

/// `GET /applications/{id}` payload, reduced to credential windows.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Application {
	/// Client secrets.
	#[serde(deserialize_with = "null_tolerant_vec")]
	pub password_credentials: Vec<CredentialWindow>,
	/// Certificates.
	#[serde(deserialize_with = "null_tolerant_vec")]
	pub key_credentials: Vec<CredentialWindow>,
}

/// Validity window of one application credential.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialWindow {
	/// Expiry timestamp.
	pub end_date_time: Option<String>,
}

/// `GET /users` item.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphUser {
	/// Object identifier; items without one are skipped by sync.
	pub id: Option<String>,
	/// Display name.
	pub display_name: Option<String>,
	/// Primary SMTP address.
	pub mail: Option<String>,
	/// User principal name.
	pub user_principal_name: Option<String>,
	/// Business phones.
	#[serde(deserialize_with = "null_tolerant_vec")]
	pub business_phones: Vec<String>,
	/// Mobile phone.
	pub mobile_phone: Option<String>,
	/// Department.
	pub department: Option<String>,
	/// Office location.
	pub office_location: Option<String>,
	/// Job title.
	pub job_title: Option<String>,
	/// Account enabled.
	pub account_enabled: Option<bool>,
	/// Assigned licenses.
	#[serde(deserialize_with = "null_tolerant_vec")]
	pub assigned_licenses: Vec<AssignedLicense>,
}
impl GraphUser {
	/// Fields requested through `$select` when listing users.
	pub const SELECT: &'static str = "id,displayName,mail,userPrincipalName,businessPhones,\
		mobilePhone,department,officeLocation,jobTitle,accountEnabled,assignedLicenses";
}

/// License assignment on a user.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssignedLicense {
	/// Assigned SKU identifier.
	#[serde(deserialize_with = "null_as_default")]
	pub sku_id: String,
}

/// `GET /auditLogs/signIns` item.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignIn {
	/// Created date time.
	pub created_date_time: Option<String>,
	/// App display name.
	pub app_display_name: Option<String>,
	/// IP address.
	pub ip_address: Option<String>,
	/// Location.
	pub location: Option<SignInLocation>,
	/// Risk level during sign in.
	pub risk_level_during_sign_in: Option<String>,
	/// Risk level aggregated.
	pub risk_level_aggregated: Option<String>,
	/// Authentication requirement.
	pub authentication_requirement: Option<String>,
	/// Authentication details.
	#[serde(deserialize_with = "null_tolerant_vec")]
	pub authentication_details: Vec<AuthenticationDetail>,
	/// Legacy MFA block.
	pub mfa_detail: Option<MfaDetail>,
	/// Device detail.
	pub device_detail: Option<DeviceDetail>,
}

/// Sign-in location.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignInLocation {
	/// City.
	pub city: Option<String>,
	/// Country or region.
	pub country_or_region: Option<String>,
}

/// One authentication step of a sign-in.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthenticationDetail {
	/// Authentication method.
	pub authentication_method: Option<String>,
	/// Authentication method detail.
	pub authentication_method_detail: Option<String>,
	/// Authentication step requirement.
	pub authentication_step_requirement: Option<String>,
	/// Authentication step result detail.
	pub authentication_step_result_detail: Option<String>,
	/// Succeeded.
	pub succeeded: Option<bool>,
}

/// Legacy MFA detail block.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MfaDetail {
	/// Auth method.
	pub auth_method: Option<String>,
	/// Auth detail.
	pub auth_detail: Option<String>,
}

/// Device information attached to a sign-in.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceDetail {
	/// Is compliant.
	pub is_compliant: Option<bool>,
	/// Is managed.
	pub is_managed: Option<bool>,
}

/// `GET /users/{id}/appRoleAssignments` item.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppRoleAssignment {
	/// Resource display name.
	pub resource_display_name: Option<String>,
	/// App role id.
	pub app_role_id: Option<String>,
	/// Created date time.
	pub created_date_time: Option<String>,
}

/// `GET /users/{id}/memberOf` item.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DirectoryObject {
	/// Object type, e.g. `#microsoft.graph.group`.
	#[serde(rename = "@odata.type")]
	pub odata_type: Option<String>,
	/// Display name.
	pub display_name: Option<String>,
}
impl DirectoryObject {
	/// Returns `true` for group objects.
	pub fn is_group(&self) -> bool {
		self.odata_type
			.as_deref()
			.is_some_and(|kind| kind.eq_ignore_ascii_case("#microsoft.graph.group"))
	}
}

/// `GET /users/{id}/followedSites` item.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FollowedSite {
	/// Display name.
	pub display_name: Option<String>,
	/// Web URL.
	pub web_url: Option<String>,
}

/// `GET /users/{id}/drive/recent` item.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriveItem {
	/// Name.
	pub name: Option<String>,
	/// Web URL.
	pub web_url: Option<String>,
	/// Last modified date time.
	pub last_modified_date_time: Option<String>,
	/// File system info.
	pub file_system_info: Option<FileSystemInfo>,
}

/// Client-side timestamps of a drive item.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileSystemInfo {
	/// Last accessed date time.
	pub last_accessed_date_time: Option<String>,
}
