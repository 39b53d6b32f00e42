//! Fixtures shared by the integration suites.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::{Mock, prelude::*};
use serde_json::{Value, json};
use time::Duration;
// self
use directory_sync::{
	config::{EngineConfig, EngineConfigBuilder},
	engine::SyncEngine,
	http::ReqwestHttpClient,
	license::LicenseCatalog,
	model::{ClientSecret, DirectoryTenantId, SyncFlags, TenantCredential, TenantId},
	reqwest::{Client, redirect::Policy},
	store::{DirectoryStore, MemoryStore, TenantRecord},
	url::Url,
};

pub const CLIENT_ID: &str = "client-under-test";
pub const CLIENT_SECRET: &str = "secret-under-test";

/// Builder whose login endpoint is `{server}/login` and Graph endpoint `{server}/v1.0`.
pub fn config_builder(server: &MockServer) -> EngineConfigBuilder {
	EngineConfig::builder()
		.login_endpoint(
			Url::parse(&server.url("/login")).expect("Mock login endpoint should parse."),
		)
		.graph_endpoint(Url::parse(&server.url("/v1.0")).expect("Mock Graph endpoint should parse."))
		.request_timeout(Duration::seconds(5))
}

pub fn config(server: &MockServer) -> EngineConfig {
	config_builder(server).build().expect("Test engine configuration should validate.")
}

pub fn credential(directory_tenant: &str) -> TenantCredential {
	let directory_tenant = DirectoryTenantId::new(directory_tenant)
		.expect("Directory tenant identifier fixture should be valid.");

	TenantCredential::new(directory_tenant, CLIENT_ID, ClientSecret::new(CLIENT_SECRET))
		.with_flags(SyncFlags { fetch_enabled: true, auto_sync_enabled: true })
}

pub fn tenant_id(id: &str) -> TenantId {
	TenantId::new(id).expect("Tenant identifier fixture should be valid.")
}

pub fn tenant(id: &str, directory_tenant: &str) -> TenantRecord {
	TenantRecord::new(tenant_id(id)).with_credential(credential(directory_tenant))
}

/// Engine over a fresh [`MemoryStore`] seeded with `tenants`.
pub fn build_engine(
	config: EngineConfig,
	tenants: impl IntoIterator<Item = TenantRecord>,
) -> (SyncEngine, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());

	for tenant in tenants {
		store.insert_tenant(tenant);
	}

	let engine = engine_over(config, store.clone());

	(engine, store)
}

/// Transport that trusts the mock server's self-signed certificate.
pub fn http_client(config: &EngineConfig) -> ReqwestHttpClient {
	ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.timeout(config.request_timeout_std())
			.redirect(Policy::none())
			.build()
			.expect("Test HTTP client should build."),
	)
}

/// Engine over a caller-supplied store, talking to the mock server.
pub fn engine_over<S>(config: EngineConfig, store: Arc<S>) -> SyncEngine
where
	S: 'static + DirectoryStore,
{
	let http_client = http_client(&config);

	SyncEngine::with_parts(config, store, http_client, LicenseCatalog::builtin())
}

pub fn token_path(directory_tenant: &str) -> String {
	format!("/login/{directory_tenant}/oauth2/v2.0/token")
}

/// Token endpoint answering every POST for `directory_tenant` with `token`.
pub async fn mock_token<'a>(
	server: &'a MockServer,
	directory_tenant: &str,
	token: &str,
	expires_in: i64,
) -> Mock<'a> {
	let path = token_path(directory_tenant);
	let body = json!({ "access_token": token, "token_type": "Bearer", "expires_in": expires_in });

	server
		.mock_async(|when, then| {
			when.method(POST).path(path);
			then.status(200).header("content-type", "application/json").json_body(body);
		})
		.await
}

/// GET `{graph}{path}` answering `status` with a JSON body.
pub async fn mock_graph<'a>(
	server: &'a MockServer,
	path: &str,
	status: u16,
	body: Value,
) -> Mock<'a> {
	let path = format!("/v1.0{path}");

	server
		.mock_async(|when, then| {
			when.method(GET).path(path);
			then.status(status).header("content-type", "application/json").json_body(body);
		})
		.await
}

/// Mocks every tenant-detail endpoint with a healthy Contoso tenant.
pub async fn mock_details(server: &MockServer) {
	mock_graph(
		server,
		"/organization",
		200,
		json!({ "value": [{
			"displayName": "Contoso",
			"verifiedDomains": [
				{ "name": "contoso.onmicrosoft.example", "isInitial": true },
				{ "name": "contoso.example", "isDefault": true }
			]
		}] }),
	)
	.await;
	mock_graph(
		server,
		"/subscribedSkus",
		200,
		json!({ "value": [{
			"skuId": "sku-e3",
			"skuPartNumber": "ENTERPRISEPACK",
			"capabilityStatus": "Enabled",
			"prepaidUnits": { "enabled": 25 }
		}] }),
	)
	.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/users").query_param("$count", "true");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "@odata.count": 250, "value": [] }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/devices").query_param("$count", "true");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "@odata.count": 40, "value": [] }));
		})
		.await;
	mock_graph(
		server,
		&format!("/applications/{CLIENT_ID}"),
		200,
		json!({
			"passwordCredentials": [{ "endDateTime": "2030-01-01T00:00:00Z" }],
			"keyCredentials": []
		}),
	)
	.await;
}

/// Provider users `u-{start}`..`u-{end}` as a JSON array.
pub fn users(start: usize, end: usize) -> Vec<Value> {
	(start..end)
		.map(|i| {
			json!({
				"id": format!("u-{i}"),
				"displayName": format!("User {i}"),
				"mail": format!("user{i}@contoso.example"),
				"businessPhones": ["+1 555 0100"],
				"accountEnabled": true,
				"assignedLicenses": [{ "skuId": "sku-e3" }]
			})
		})
		.collect()
}

/// Mocks the paged user listing: the first page at `/v1.0/users`, later pages at
/// `/v1.0/users-page-{n}`.
pub async fn mock_user_pages<'a>(server: &'a MockServer, pages: Vec<Vec<Value>>) -> Vec<Mock<'a>> {
	let last = pages.len().saturating_sub(1);
	let mut mocks = Vec::with_capacity(pages.len());

	for (index, page) in pages.into_iter().enumerate() {
		let mut body = json!({ "value": page });

		if index < last {
			body["@odata.nextLink"] = Value::String(server.url(format!("/v1.0/users-page-{}", index + 1)));
		}

		let mock = if index == 0 {
			server
				.mock_async(|when, then| {
					when.method(GET).path("/v1.0/users").query_param_exists("$select");
					then.status(200).header("content-type", "application/json").json_body(body);
				})
				.await
		} else {
			let path = format!("/v1.0/users-page-{index}");

			server
				.mock_async(|when, then| {
					when.method(GET).path(path);
					then.status(200).header("content-type", "application/json").json_body(body);
				})
				.await
		};

		mocks.push(mock);
	}

	mocks
}
