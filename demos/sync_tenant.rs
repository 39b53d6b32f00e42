//! Syncs one tenant against a mock directory provider and prints the stored users.
//!
//! The provider is an `httpmock` server standing in for both the login endpoint and Graph, so the
//! demo runs offline. Only the token endpoint, the organization, and one user page are mocked;
//! the remaining detail calls fail and show up as degraded facets without failing the run.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use directory_sync::{
	CancellationToken,
	config::EngineConfig,
	engine::SyncEngine,
	http::ReqwestHttpClient,
	license::LicenseCatalog,
	model::{ClientSecret, DirectoryTenantId, SyncFlags, SyncSource, TenantCredential, TenantId},
	reqwest::{Client, redirect::Policy},
	store::{MemoryStore, TenantRecord},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/login/contoso.example/oauth2/v2.0/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/organization");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"value": [{
					"displayName": "Contoso",
					"verifiedDomains": [{ "name": "contoso.example", "isDefault": true }]
				}]
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/users").query_param_exists("$select");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"value": [
					{ "id": "u-ada", "displayName": "Ada Lovelace", "mail": "ada@contoso.example" },
					{ "id": "u-alan", "userPrincipalName": "alan@contoso.example" }
				]
			}));
		})
		.await;

	let config = EngineConfig::builder()
		.login_endpoint(Url::parse(&server.url("/login"))?)
		.graph_endpoint(Url::parse(&server.url("/v1.0"))?)
		.build()?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.timeout(config.request_timeout_std())
			.redirect(Policy::none())
			.build()?,
	);
	let tenant_id = TenantId::new("tenant-contoso")?;
	let credential = TenantCredential::new(
		DirectoryTenantId::new("contoso.example")?,
		"demo-client",
		ClientSecret::new("demo-secret"),
	)
	.with_flags(SyncFlags { fetch_enabled: true, auto_sync_enabled: true });
	let store = Arc::new(MemoryStore::default());

	store.insert_tenant(TenantRecord::new(tenant_id.clone()).with_credential(credential));

	let engine =
		SyncEngine::with_parts(config, store.clone(), http_client, LicenseCatalog::builtin());
	let summary =
		engine.sync_tenant(&tenant_id, SyncSource::Manual, &CancellationToken::new()).await?;

	println!(
		"Synced {} users over {} page(s) in {}.",
		summary.records_synced, summary.pages_fetched, summary.duration
	);

	for user in store.users(&tenant_id) {
		println!(
			"{} <{}>",
			user.record.display_name,
			user.record.email.as_deref().unwrap_or("no email")
		);
	}

	token_mock.assert_async().await;

	Ok(())
}
