//! Per-tenant sync orchestration.
//!
//! A run resolves tenant details, pages through the provider's users, and reconciles them into
//! the store in chunks. Every started run ends in `Completed` or `Failed` and appends exactly one
//! summary; ineligible tenants are rejected before a run starts.

pub mod pool;
pub mod reconcile;
pub mod state;

pub use pool::*;
pub use reconcile::*;
pub use state::*;

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	config::EngineConfig,
	details::TenantDetailsResolver,
	graph::{GraphClient, schema::GraphUser},
	license::LicenseCatalog,
	model::{DirectoryUserRecord, SyncSource, TenantCredential, TenantId, TenantSyncSummary},
	obs::{self, OpSpan, Operation, Outcome},
	store::{DirectoryStore, TenantRecord},
};

/// Result of the work done between `Resolving` and `Completed`.
#[derive(Debug)]
struct RunOutput {
	records: usize,
	pages_fetched: usize,
	truncated: bool,
}

/// Drives tenant sync runs against a [`DirectoryStore`].
pub struct SyncOrchestrator {
	config: Arc<EngineConfig>,
	store: Arc<dyn DirectoryStore>,
	graph: Arc<GraphClient>,
	resolver: Arc<TenantDetailsResolver>,
	licenses: Arc<LicenseCatalog>,
}
impl SyncOrchestrator {
	/// Creates an orchestrator over shared engine components.
	pub fn new(
		config: Arc<EngineConfig>,
		store: Arc<dyn DirectoryStore>,
		graph: Arc<GraphClient>,
		resolver: Arc<TenantDetailsResolver>,
		licenses: Arc<LicenseCatalog>,
	) -> Self {
		Self { config, store, graph, resolver, licenses }
	}

	/// Store the orchestrator writes through.
	pub fn store(&self) -> &Arc<dyn DirectoryStore> {
		&self.store
	}

	/// Runs one sync for `tenant_id`.
	///
	/// Returns [`Error::NotEligible`] without writing anything when the tenant is unknown, has an
	/// incomplete credential, or has fetching disabled. A started run that fails appends a
	/// failure summary and then returns the error.
	pub async fn sync_tenant(
		&self,
		tenant_id: &TenantId,
		source: SyncSource,
		cancel: &CancellationToken,
	) -> Result<TenantSyncSummary> {
		let tenant = self.eligible_tenant(tenant_id).await?;
		let span = OpSpan::for_tenant(Operation::Sync, "sync_tenant", tenant_id);

		obs::record_operation(Operation::Sync, Outcome::Attempt);

		let result = span.instrument(self.run(tenant, source, cancel)).await;

		obs::record_operation(
			Operation::Sync,
			if result.is_ok() { Outcome::Success } else { Outcome::Failure },
		);

		result
	}

	async fn eligible_tenant(&self, tenant_id: &TenantId) -> Result<TenantRecord> {
		let not_eligible =
			|reason| Error::NotEligible { tenant: tenant_id.to_string(), reason };
		let Some(tenant) = self.store.tenant(tenant_id).await? else {
			return Err(not_eligible("unknown tenant"));
		};
		let Some(credential) = tenant.credential.as_ref() else {
			return Err(not_eligible("no credential"));
		};

		if !credential.is_complete() {
			return Err(not_eligible("credential incomplete"));
		}
		if !credential.flags.fetch_enabled {
			return Err(not_eligible("fetching disabled"));
		}

		Ok(tenant)
	}

	async fn run(
		&self,
		tenant: TenantRecord,
		source: SyncSource,
		cancel: &CancellationToken,
	) -> Result<TenantSyncSummary> {
		let tenant_id = tenant.id.clone();
		let mut run = SyncRun::start();

		run.advance(SyncState::Resolving)?;

		let budget = self.config.sync_budget;
		let result = tokio::select! {
			_ = cancel.cancelled() => Err(Error::Cancelled),
			timed = tokio::time::timeout(
				self.config.sync_budget_std(),
				self.execute(&mut run, tenant),
			) => timed.unwrap_or(Err(Error::BudgetExceeded { budget })),
		};

		match result {
			Ok(output) => {
				run.advance(SyncState::Completed)?;

				if output.truncated {
					tracing::warn!(
						tenant = %tenant_id,
						pages = output.pages_fetched,
						"User listing stopped at the page ceiling; results are truncated."
					);
				}

				let summary = TenantSyncSummary::success(
					tenant_id,
					source,
					output.records,
					run.elapsed(),
					output.pages_fetched,
					output.truncated,
				);

				self.store.append_summary(summary.clone()).await?;
				obs::record_records_synced(output.records);
				tracing::info!(
					tenant = %summary.tenant_id,
					records = summary.records_synced,
					pages = summary.pages_fetched,
					"Tenant sync completed."
				);

				Ok(summary)
			},
			Err(e) => {
				if let Err(illegal) = run.advance(SyncState::Failed) {
					tracing::error!(error = %illegal, "Failed run could not enter the failed state.");
				}

				tracing::warn!(
					tenant = %tenant_id,
					kind = e.kind().as_str(),
					error = %e,
					"Tenant sync failed."
				);

				let summary = TenantSyncSummary::failure(tenant_id, source, &e);

				if let Err(store_error) = self.store.append_summary(summary).await {
					tracing::error!(error = %store_error, "Failure summary could not be recorded.");
				}

				Err(e)
			},
		}
	}

	async fn execute(&self, run: &mut SyncRun, mut tenant: TenantRecord) -> Result<RunOutput> {
		let Some(credential) = tenant.credential.clone() else {
			return Err(Error::NotEligible { tenant: tenant.id.to_string(), reason: "no credential" });
		};
		let details = self.resolver.resolve(&credential).await?;

		tenant.apply_details(&details);
		run.advance(SyncState::Fetching)?;

		let mut pager = self.graph.paginate::<GraphUser>(
			&credential,
			self.graph.url(&format!(
				"/users?$top={}&$select={}",
				self.config.user_page_size,
				GraphUser::SELECT
			)),
		);
		let mut records = Vec::new();

		while let Some(page) = pager.next_page().await {
			for user in page? {
				let raw_id = user.id.clone();

				match reconcile::map_user(user, &tenant.id, &details.sku_index, &self.licenses) {
					Some(record) => records.push(record),
					None => tracing::warn!(
						tenant = %tenant.id,
						id = ?raw_id,
						"Skipping provider user without a usable id."
					),
				}
			}
		}

		let pages_fetched = pager.pages_fetched();
		let truncated = pager.ceiling_reached();

		if self.config.fetch_photos {
			self.attach_photos(&credential, &mut records).await;
		}

		run.advance(SyncState::Reconciling)?;

		let report = reconcile::reconcile(
			&*self.store,
			&tenant.id,
			records,
			self.config.reconcile_chunk_size,
		)
		.await?;

		tenant.local_user_count = self.store.count_users(&tenant.id).await?;
		tenant.last_synced_at = Some(OffsetDateTime::now_utc());

		self.store.update_tenant(tenant).await?;

		Ok(RunOutput { records: report.records, pages_fetched, truncated })
	}

	async fn attach_photos(
		&self,
		credential: &TenantCredential,
		records: &mut [DirectoryUserRecord],
	) {
		for record in records {
			let url = self.graph.url(&format!("/users/{}/photo/$value", record.external_id));

			match self.graph.get_bytes(credential, &url).await {
				Ok(Some(bytes)) if !bytes.is_empty() => {
					record.avatar_reference =
						Some(format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes)));
				},
				Ok(_) => {},
				Err(e) => {
					tracing::debug!(user = %record.external_id, error = %e, "Photo fetch failed.");
				},
			}
		}
	}
}
impl Debug for SyncOrchestrator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SyncOrchestrator")
			.field("config", &self.config)
			.field("graph", &self.graph)
			.finish_non_exhaustive()
	}
}
