//! Tenant details resolution: organization, licenses, counts, and credential expiry.
//!
//! Every sub-call is independent. A failing call only marks its [`DetailFacet`] as degraded so
//! tenants with partial permission grants still resolve; the token is the one hard
//! requirement.

// self
use crate::{
	_prelude::*,
	graph::{
		GraphClient,
		schema::{self, Application, CredentialWindow, ODataPage, Organization, SubscribedSku},
	},
	license::LicenseCatalog,
	model::{DetailFacet, SubscriptionSnapshot, TenantCredential, TenantDetails},
	obs::{self, OpSpan, Operation, Outcome},
};

const EVENTUAL: &[(&str, &str)] = &[("ConsistencyLevel", "eventual")];

/// Resolves [`TenantDetails`] for a credential.
#[derive(Debug)]
pub struct TenantDetailsResolver {
	graph: Arc<GraphClient>,
	licenses: Arc<LicenseCatalog>,
}
impl TenantDetailsResolver {
	/// Creates a resolver over `graph`.
	pub fn new(graph: Arc<GraphClient>, licenses: Arc<LicenseCatalog>) -> Self {
		Self { graph, licenses }
	}

	/// Resolves everything the provider exposes about the credential's tenant.
	///
	/// Only a token failure is returned as an error; other failures degrade their facet.
	pub async fn resolve(&self, credential: &TenantCredential) -> Result<TenantDetails> {
		let span = OpSpan::new(Operation::Details, "resolve");

		obs::record_operation(Operation::Details, Outcome::Attempt);

		let result = span.instrument(self.resolve_inner(credential)).await;
		let outcome = match &result {
			Ok(details) if details.is_complete() => Outcome::Success,
			Ok(_) => Outcome::Degraded,
			Err(_) => Outcome::Failure,
		};

		obs::record_operation(Operation::Details, outcome);

		result
	}

	/// Resolves only the subscription snapshot.
	pub async fn resolve_subscription(
		&self,
		credential: &TenantCredential,
	) -> Result<SubscriptionSnapshot> {
		Ok(self.resolve(credential).await?.subscription)
	}

	async fn resolve_inner(&self, credential: &TenantCredential) -> Result<TenantDetails> {
		self.graph.tokens().get_token(credential).await?;

		let mut details = TenantDetails::default();
		let organization = self
			.facet(
				&mut details,
				DetailFacet::Organization,
				self.graph.get_json::<ODataPage<Organization>>(
					credential,
					&self.graph.url("/organization"),
					&[],
				),
			)
			.await
			.and_then(|page| page.value.into_iter().next());

		if let Some(organization) = organization {
			details.primary_domain = organization.primary_domain().map(str::to_owned);
			details.organization_name =
				organization.display_name.filter(|name| !name.trim().is_empty());
		}

		let skus = self
			.facet(
				&mut details,
				DetailFacet::SubscribedSkus,
				self.graph.get_json::<ODataPage<SubscribedSku>>(
					credential,
					&self.graph.url("/subscribedSkus"),
					&[],
				),
			)
			.await;

		if let Some(page) = skus {
			self.apply_skus(&mut details, &page.value);
		}

		let user_count = self
			.facet(
				&mut details,
				DetailFacet::UserCount,
				self.graph.get_json::<ODataPage<serde_json::Value>>(
					credential,
					&self.graph.url("/users?$count=true&$top=1"),
					EVENTUAL,
				),
			)
			.await
			.and_then(|page| page.count);
		let device_count = self
			.facet(
				&mut details,
				DetailFacet::DeviceCount,
				self.graph.get_json::<ODataPage<serde_json::Value>>(
					credential,
					&self.graph.url("/devices?$count=true&$top=1"),
					EVENTUAL,
				),
			)
			.await
			.and_then(|page| page.count);

		details.user_count = user_count;
		details.device_count = device_count;

		let application = self
			.facet(
				&mut details,
				DetailFacet::ApplicationCredentials,
				self.graph.get_json::<Application>(
					credential,
					&self.graph.url(&format!("/applications/{}", credential.client_id)),
					&[],
				),
			)
			.await;

		if let Some(application) = application {
			details.subscription.secret_expires_at =
				earliest_expiry(&application.password_credentials);
			details.subscription.certificate_expires_at =
				earliest_expiry(&application.key_credentials);
		}

		tracing::info!(
			directory_tenant = %credential.directory_tenant,
			degraded = details.degraded.len(),
			"Resolved tenant details."
		);

		Ok(details)
	}

	async fn facet<T>(
		&self,
		details: &mut TenantDetails,
		facet: DetailFacet,
		call: impl Future<Output = Result<T>>,
	) -> Option<T> {
		match call.await {
			Ok(value) => Some(value),
			Err(e) => {
				tracing::warn!(facet = facet.as_str(), error = %e, "Tenant detail call failed.");
				details.degraded.push(facet);

				None
			},
		}
	}

	fn apply_skus(&self, details: &mut TenantDetails, skus: &[SubscribedSku]) {
		details.sku_index = skus
			.iter()
			.filter(|sku| !sku.sku_id.is_empty())
			.map(|sku| (sku.sku_id.clone(), sku.sku_part_number.clone()))
			.collect();

		if let Some(primary) = primary_sku(skus) {
			details.subscription.primary_sku = Some(primary.sku_part_number.clone());
			details.subscription.license_display_name =
				Some(self.licenses.display_name(&primary.sku_part_number));
			details.subscription.seat_count = Some(primary.prepaid_units.enabled);
		}
	}
}

/// Enabled SKU whose part number contains `ENTERPRISE`, else the first enabled SKU.
pub fn primary_sku(skus: &[SubscribedSku]) -> Option<&SubscribedSku> {
	let mut enabled = skus.iter().filter(|sku| sku.is_enabled());
	let first = enabled.clone().next();

	enabled
		.find(|sku| sku.sku_part_number.to_ascii_uppercase().contains("ENTERPRISE"))
		.or(first)
}

/// Soonest parseable `endDateTime` among `windows`.
pub fn earliest_expiry(windows: &[CredentialWindow]) -> Option<OffsetDateTime> {
	windows
		.iter()
		.filter_map(|window| schema::parse_timestamp(window.end_date_time.as_deref()))
		.min()
}
