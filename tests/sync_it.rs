mod common;

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::Duration;
// self
use common::*;
use directory_sync::{
	CancellationToken,
	error::{AuthError, Error, FailureKind, TransientError},
	model::{
		DirectoryUserRecord, SyncFlags, SyncOutcome, SyncSource, TenantId, TenantSyncSummary,
		UserId, UserKey,
	},
	store::{
		DirectoryStore, MemoryStore, StoreError, StoreFuture, StoredUser, TenantRecord, UpsertReport,
	},
};

#[tokio::test]
async fn full_sync_reconciles_every_page() {
	let server = MockServer::start_async().await;
	let (engine, store) = build_engine(config(&server), [tenant("tenant-a", "dir-a")]);
	let token = mock_token(&server, "dir-a", "graph-token", 3600).await;

	mock_details(&server).await;

	let pages = mock_user_pages(&server, vec![users(0, 100), users(100, 200), users(200, 250)]).await;
	let summary = engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Manual, &CancellationToken::new())
		.await
		.expect("Full sync should succeed.");

	assert_eq!(summary.outcome, SyncOutcome::Success);
	assert_eq!(summary.records_synced, 250);
	assert_eq!(summary.pages_fetched, 3);
	assert!(!summary.truncated);
	assert_eq!(summary.source, SyncSource::Manual);

	for page in pages {
		page.assert_calls_async(1).await;
	}

	token.assert_calls_async(1).await;

	let users = store.users(&tenant_id("tenant-a"));

	assert_eq!(users.len(), 250);

	let ada = users
		.iter()
		.find(|user| &*user.record.external_id == "u-42")
		.expect("User u-42 should be stored.");

	assert_eq!(ada.record.email.as_deref(), Some("user42@contoso.example"));
	assert_eq!(ada.record.phone.as_deref(), Some("+1 555 0100"));
	assert_eq!(ada.record.license_display_name.as_deref(), Some("Office 365 E3"));

	let tenant = store.tenant_now(&tenant_id("tenant-a")).expect("Tenant should still exist.");

	assert_eq!(tenant.name.as_deref(), Some("Contoso"));
	assert_eq!(tenant.primary_domain.as_deref(), Some("contoso.example"));
	assert_eq!(tenant.provider_user_count, Some(250));
	assert_eq!(tenant.device_count, Some(40));
	assert_eq!(tenant.local_user_count, 250);
	assert_eq!(tenant.subscription.license_display_name.as_deref(), Some("Office 365 E3"));
	assert!(tenant.last_synced_at.is_some());
	assert_eq!(store.summaries_for(&tenant_id("tenant-a")), vec![summary]);
}

#[tokio::test]
async fn rerun_updates_rows_in_place_and_keeps_local_fields() {
	let server = MockServer::start_async().await;
	let (engine, store) = build_engine(config(&server), [tenant("tenant-a", "dir-a")]);
	let _token = mock_token(&server, "dir-a", "graph-token", 3600).await;
	let cancel = CancellationToken::new();

	mock_details(&server).await;

	let first_pages = mock_user_pages(&server, vec![users(0, 3)]).await;

	engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Scheduled, &cancel)
		.await
		.expect("First sync should succeed.");

	let key = UserKey {
		external_id: UserId::new("u-1").expect("User identifier fixture should be valid."),
		tenant_id: tenant_id("tenant-a"),
	};
	let before = store.users(&tenant_id("tenant-a"));

	assert!(store.set_notes(&key, "VIP, handle with care"));

	for mock in first_pages {
		mock.delete_async().await;
	}

	let mut renamed = users(0, 3);

	renamed[1]["displayName"] = json!("Renamed User");
	renamed[1]["accountEnabled"] = json!(false);

	mock_user_pages(&server, vec![renamed]).await;

	let summary = engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Scheduled, &cancel)
		.await
		.expect("Second sync should succeed.");

	assert_eq!(summary.records_synced, 3);

	let after = store.users(&tenant_id("tenant-a"));

	assert_eq!(after.len(), 3);
	assert_eq!(
		after.iter().map(|user| user.local_id).collect::<Vec<_>>(),
		before.iter().map(|user| user.local_id).collect::<Vec<_>>()
	);

	let renamed = after
		.iter()
		.find(|user| user.key() == key)
		.expect("Renamed user should still be stored.");

	assert_eq!(renamed.record.display_name, "Renamed User");
	assert!(!renamed.record.enabled);
	assert_eq!(renamed.notes.as_deref(), Some("VIP, handle with care"));
	assert_eq!(store.summaries_for(&tenant_id("tenant-a")).len(), 2);
}

#[tokio::test]
async fn manual_identity_is_only_filled_where_empty() {
	let server = MockServer::start_async().await;
	let overridden = tenant("tenant-m", "dir-m")
		.with_manual_identity(Some("Contoso Holdings".into()), None);
	let (engine, store) = build_engine(config(&server), [overridden]);
	let _token = mock_token(&server, "dir-m", "graph-token", 3600).await;

	mock_details(&server).await;
	mock_user_pages(&server, vec![users(0, 1)]).await;
	engine
		.sync_tenant(&tenant_id("tenant-m"), SyncSource::Cli, &CancellationToken::new())
		.await
		.expect("Sync of an overridden tenant should succeed.");

	let tenant = store.tenant_now(&tenant_id("tenant-m")).expect("Tenant should still exist.");

	assert!(tenant.is_manual_override);
	assert_eq!(tenant.name.as_deref(), Some("Contoso Holdings"));
	assert_eq!(tenant.primary_domain.as_deref(), Some("contoso.example"));
}

#[tokio::test]
async fn users_without_ids_are_skipped() {
	let server = MockServer::start_async().await;
	let (engine, store) = build_engine(config(&server), [tenant("tenant-a", "dir-a")]);
	let _token = mock_token(&server, "dir-a", "graph-token", 3600).await;
	let mut page = users(0, 2);

	page.push(json!({ "displayName": "Ghost" }));
	mock_details(&server).await;
	mock_user_pages(&server, vec![page]).await;

	let summary = engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Manual, &CancellationToken::new())
		.await
		.expect("Sync with an id-less user should succeed.");

	assert_eq!(summary.records_synced, 2);
	assert_eq!(store.users(&tenant_id("tenant-a")).len(), 2);
}

#[tokio::test]
async fn null_user_fields_are_treated_as_unknown() {
	let server = MockServer::start_async().await;
	let (engine, store) = build_engine(config(&server), [tenant("tenant-a", "dir-a")]);
	let _token = mock_token(&server, "dir-a", "graph-token", 3600).await;
	let mut page = users(0, 3);

	page[1]["assignedLicenses"] = json!(null);
	page[1]["businessPhones"] = json!(null);
	page[2]["accountEnabled"] = json!(null);
	mock_details(&server).await;
	mock_user_pages(&server, vec![page]).await;

	let summary = engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Manual, &CancellationToken::new())
		.await
		.expect("Sync with null user fields should succeed.");

	assert_eq!(summary.records_synced, 3);

	let stored = store.users(&tenant_id("tenant-a"));
	let record = |id: &str| {
		stored
			.iter()
			.find(|user| user.record.external_id.to_string() == id)
			.map(|user| user.record.clone())
			.expect("Synced user should be stored.")
	};

	assert_eq!(record("u-1").license_display_name, None);
	assert_eq!(record("u-1").phone, None);
	assert!(record("u-2").enabled);
}

#[tokio::test]
async fn page_ceiling_marks_the_summary_truncated() {
	let server = MockServer::start_async().await;
	let config = config_builder(&server)
		.max_pages(2)
		.build()
		.expect("Configuration with a two-page ceiling should validate.");
	let (engine, _store) = build_engine(config, [tenant("tenant-a", "dir-a")]);
	let _token = mock_token(&server, "dir-a", "graph-token", 3600).await;

	mock_details(&server).await;

	let pages = mock_user_pages(&server, vec![users(0, 2), users(2, 4), users(4, 6)]).await;
	let summary = engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Manual, &CancellationToken::new())
		.await
		.expect("Truncated sync should still succeed.");

	assert!(summary.truncated);
	assert_eq!(summary.pages_fetched, 2);
	assert_eq!(summary.records_synced, 4);

	pages[2].assert_calls_async(0).await;
}

#[tokio::test]
async fn photos_become_data_uri_avatars_when_enabled() {
	let server = MockServer::start_async().await;
	let config = config_builder(&server)
		.fetch_photos(true)
		.build()
		.expect("Configuration with photos enabled should validate.");
	let (engine, store) = build_engine(config, [tenant("tenant-a", "dir-a")]);
	let _token = mock_token(&server, "dir-a", "graph-token", 3600).await;

	mock_details(&server).await;
	mock_user_pages(&server, vec![users(0, 2)]).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/users/u-0/photo/$value");
			then.status(200).header("content-type", "image/jpeg").body([0xFF_u8, 0xD8, 0xFF]);
		})
		.await;
	mock_graph(&server, "/users/u-1/photo/$value", 404, json!({ "error": { "code": "ImageNotFound" } }))
		.await;
	engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Manual, &CancellationToken::new())
		.await
		.expect("Sync with photos should succeed.");

	let users = store.users(&tenant_id("tenant-a"));
	let avatar = |id: &str| {
		users
			.iter()
			.find(|user| &*user.record.external_id == id)
			.and_then(|user| user.record.avatar_reference.clone())
	};

	assert_eq!(avatar("u-0").as_deref(), Some("data:image/jpeg;base64,/9j/"));
	assert_eq!(avatar("u-1"), None);
}

#[tokio::test]
async fn auth_failure_records_a_failed_summary() {
	let server = MockServer::start_async().await;
	let (engine, store) = build_engine(config(&server), [tenant("tenant-a", "dir-a")]);
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path(token_path("dir-a"));
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\",\"error_description\":\"Secret expired.\"}");
		})
		.await;
	let organization = mock_graph(&server, "/organization", 200, json!({ "value": [] })).await;
	let err = engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Scheduled, &CancellationToken::new())
		.await
		.expect_err("Sync with rejected credentials should fail.");

	assert!(matches!(err, Error::Auth(AuthError::InvalidClient { .. })));

	organization.assert_calls_async(0).await;

	let summaries = store.summaries_for(&tenant_id("tenant-a"));

	assert_eq!(summaries.len(), 1);
	assert_failed(&summaries[0], FailureKind::Auth);
	assert!(store.users(&tenant_id("tenant-a")).is_empty());

	let tenant = store.tenant_now(&tenant_id("tenant-a")).expect("Tenant should still exist.");

	assert!(tenant.last_synced_at.is_none());
	assert!(tenant.name.is_none());
}

#[tokio::test]
async fn page_error_fails_without_reconciling_partial_pages() {
	let server = MockServer::start_async().await;
	let (engine, store) = build_engine(config(&server), [tenant("tenant-a", "dir-a")]);
	let _token = mock_token(&server, "dir-a", "graph-token", 3600).await;
	let first_page = json!({ "value": users(0, 2), "@odata.nextLink": server.url("/v1.0/users-throttled") });

	mock_details(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/users").query_param_exists("$select");
			then.status(200).header("content-type", "application/json").json_body(first_page);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/users-throttled");
			then.status(429).header("retry-after", "30").body("");
		})
		.await;

	let err = engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Scheduled, &CancellationToken::new())
		.await
		.expect_err("Throttled page should fail the run.");

	assert!(matches!(err, Error::Transient(TransientError::UpstreamStatus { status: 429, .. })));
	assert!(store.users(&tenant_id("tenant-a")).is_empty());
	assert_failed(&store.summaries_for(&tenant_id("tenant-a"))[0], FailureKind::Transient);
}

#[tokio::test]
async fn ineligible_tenants_are_rejected_without_side_effects() {
	let server = MockServer::start_async().await;
	let mut disabled = tenant("tenant-off", "dir-off");

	if let Some(credential) = disabled.credential.as_mut() {
		credential.flags = SyncFlags { fetch_enabled: false, auto_sync_enabled: true };
	}

	let bare = TenantRecord::new(tenant_id("tenant-bare"));
	let (engine, store) = build_engine(config(&server), [disabled, bare]);
	let token = mock_token(&server, "dir-off", "graph-token", 3600).await;
	let cancel = CancellationToken::new();

	for (id, reason) in [
		("tenant-off", "fetching disabled"),
		("tenant-bare", "no credential"),
		("tenant-unknown", "unknown tenant"),
	] {
		let err = engine
			.sync_tenant(&tenant_id(id), SyncSource::Manual, &cancel)
			.await
			.expect_err("Ineligible tenant should be rejected.");

		assert!(
			matches!(err, Error::NotEligible { reason: actual, .. } if actual == reason),
			"{id} should be rejected as {reason}, got {err}."
		);
		assert!(store.summaries_for(&tenant_id(id)).is_empty());
	}

	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn cancelled_run_fails_with_a_summary() {
	let server = MockServer::start_async().await;
	let (engine, store) = build_engine(config(&server), [tenant("tenant-a", "dir-a")]);
	let _token = mock_token(&server, "dir-a", "graph-token", 3600).await;
	let cancel = CancellationToken::new();

	mock_details(&server).await;
	mock_user_pages(&server, vec![users(0, 2)]).await;
	cancel.cancel();

	let err = engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Manual, &cancel)
		.await
		.expect_err("Cancelled sync should fail.");

	assert!(matches!(err, Error::Cancelled));
	assert_failed(&store.summaries_for(&tenant_id("tenant-a"))[0], FailureKind::Cancelled);
	assert!(store.users(&tenant_id("tenant-a")).is_empty());
}

#[tokio::test]
async fn slow_provider_exceeds_the_budget() {
	let server = MockServer::start_async().await;
	let config = config_builder(&server)
		.sync_budget(Duration::milliseconds(300))
		.build()
		.expect("Configuration with a short budget should validate.");
	let (engine, store) = build_engine(config, [tenant("tenant-a", "dir-a")]);

	server
		.mock_async(|when, then| {
			when.method(POST).path(token_path("dir-a"));
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_secs(2))
				.body("{\"access_token\":\"slow\",\"token_type\":\"Bearer\",\"expires_in\":3600}");
		})
		.await;

	let err = engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Scheduled, &CancellationToken::new())
		.await
		.expect_err("Slow sync should exceed its budget.");

	assert!(matches!(err, Error::BudgetExceeded { .. }));
	assert_failed(&store.summaries_for(&tenant_id("tenant-a"))[0], FailureKind::BudgetExceeded);
}

#[tokio::test]
async fn failing_chunk_aborts_after_earlier_chunks_commit() {
	let server = MockServer::start_async().await;
	let inner = MemoryStore::default();

	inner.insert_tenant(tenant("tenant-a", "dir-a"));

	let store = Arc::new(FlakyStore { inner: inner.clone(), fail_on: 1, calls: AtomicUsize::new(0) });
	let engine = engine_over(config(&server), store);
	let _token = mock_token(&server, "dir-a", "graph-token", 3600).await;

	mock_details(&server).await;
	mock_user_pages(&server, vec![users(0, 250)]).await;

	let err = engine
		.sync_tenant(&tenant_id("tenant-a"), SyncSource::Manual, &CancellationToken::new())
		.await
		.expect_err("Sync should fail on the second chunk.");

	assert!(matches!(err, Error::Reconciliation { chunk: 1, .. }));
	assert_eq!(inner.users(&tenant_id("tenant-a")).len(), 100);
	assert_failed(&inner.summaries_for(&tenant_id("tenant-a"))[0], FailureKind::Reconciliation);
	assert!(
		inner
			.tenant_now(&tenant_id("tenant-a"))
			.expect("Tenant should still exist.")
			.last_synced_at
			.is_none()
	);
}

#[tokio::test]
async fn pool_syncs_only_auto_sync_tenants() {
	let server = MockServer::start_async().await;
	let mut manual_only = tenant("tenant-c", "dir-c");

	if let Some(credential) = manual_only.credential.as_mut() {
		credential.flags = SyncFlags { fetch_enabled: true, auto_sync_enabled: false };
	}

	let config = config_builder(&server)
		.max_concurrent_tenants(1)
		.build()
		.expect("Configuration with a single worker should validate.");
	let (engine, store) = build_engine(
		config,
		[tenant("tenant-b", "dir-b"), tenant("tenant-a", "dir-a"), manual_only],
	);
	let token_a = mock_token(&server, "dir-a", "token-a", 3600).await;
	let token_b = mock_token(&server, "dir-b", "token-b", 3600).await;
	let token_c = mock_token(&server, "dir-c", "token-c", 3600).await;

	mock_details(&server).await;
	mock_user_pages(&server, vec![users(0, 3)]).await;

	let outcomes = engine
		.sync_all(SyncSource::Scheduled, &CancellationToken::new())
		.await
		.expect("Pool run should list tenants.");

	assert_eq!(
		outcomes.iter().map(|(id, _)| id.to_string()).collect::<Vec<_>>(),
		vec!["tenant-a", "tenant-b"]
	);

	for (id, result) in &outcomes {
		let summary = result.as_ref().expect("Every pooled tenant should sync.");

		assert_eq!(&summary.tenant_id, id);
		assert_eq!(summary.records_synced, 3);
		assert_eq!(store.users(id).len(), 3);
	}

	token_a.assert_calls_async(1).await;
	token_b.assert_calls_async(1).await;
	token_c.assert_calls_async(0).await;
	assert!(store.summaries_for(&tenant_id("tenant-c")).is_empty());
}

#[tokio::test]
async fn cancelled_pool_reports_every_tenant_cancelled() {
	let server = MockServer::start_async().await;
	let (engine, _store) =
		build_engine(config(&server), [tenant("tenant-a", "dir-a"), tenant("tenant-b", "dir-b")]);
	let cancel = CancellationToken::new();

	cancel.cancel();

	let outcomes =
		engine.sync_all(SyncSource::Scheduled, &cancel).await.expect("Pool run should list tenants.");

	assert_eq!(outcomes.len(), 2);
	assert!(outcomes.iter().all(|(_, result)| matches!(result, Err(Error::Cancelled))));
}

fn assert_failed(summary: &TenantSyncSummary, kind: FailureKind) {
	assert_eq!(summary.outcome, SyncOutcome::Failure);
	assert_eq!(summary.records_synced, 0);
	assert_eq!(summary.duration, Duration::ZERO);
	assert_eq!(summary.failure.as_ref().map(|failure| failure.kind), Some(kind));
}

/// Store whose `fail_on`-th upsert call fails.
struct FlakyStore {
	inner: MemoryStore,
	fail_on: usize,
	calls: AtomicUsize,
}
impl DirectoryStore for FlakyStore {
	fn tenant<'a>(&'a self, id: &'a TenantId) -> StoreFuture<'a, Option<TenantRecord>> {
		self.inner.tenant(id)
	}

	fn auto_sync_tenants(&self) -> StoreFuture<'_, Vec<TenantRecord>> {
		self.inner.auto_sync_tenants()
	}

	fn update_tenant(&self, record: TenantRecord) -> StoreFuture<'_, ()> {
		self.inner.update_tenant(record)
	}

	fn upsert_users<'a>(
		&'a self,
		tenant: &'a TenantId,
		chunk: Vec<DirectoryUserRecord>,
	) -> StoreFuture<'a, UpsertReport> {
		if self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_on {
			return Box::pin(async {
				Err(StoreError::Backend { message: "connection reset".into() })
			});
		}

		self.inner.upsert_users(tenant, chunk)
	}

	fn list_users<'a>(&'a self, tenant: &'a TenantId) -> StoreFuture<'a, Vec<StoredUser>> {
		self.inner.list_users(tenant)
	}

	fn count_users<'a>(&'a self, tenant: &'a TenantId) -> StoreFuture<'a, usize> {
		self.inner.count_users(tenant)
	}

	fn append_summary(&self, summary: TenantSyncSummary) -> StoreFuture<'_, ()> {
		self.inner.append_summary(summary)
	}

	fn summaries<'a>(&'a self, tenant: &'a TenantId) -> StoreFuture<'a, Vec<TenantSyncSummary>> {
		self.inner.summaries(tenant)
	}
}
