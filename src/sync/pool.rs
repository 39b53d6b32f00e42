//! Bounded multi-tenant sync pool.

// crates.io
use tokio::{sync::Semaphore, task::JoinSet};
// self
use crate::{
	_prelude::*,
	model::{SyncSource, TenantId, TenantSyncSummary},
	obs::{self, OpSpan, Operation, Outcome},
	sync::SyncOrchestrator,
};

/// Per-tenant outcome of a pool run.
pub type TenantOutcome = (TenantId, Result<TenantSyncSummary>);

impl SyncOrchestrator {
	/// Syncs every tenant eligible for automatic sync, at most `max_concurrent_tenants` at once.
	///
	/// Each tenant runs on its own task with a child of `cancel`; cancelling the parent stops
	/// running tenants and prevents queued ones from starting. Outcomes are sorted by tenant id.
	pub async fn sync_all(
		self: &Arc<Self>,
		source: SyncSource,
		cancel: &CancellationToken,
	) -> Result<Vec<TenantOutcome>> {
		let span = OpSpan::new(Operation::SyncAll, "sync_all");

		obs::record_operation(Operation::SyncAll, Outcome::Attempt);

		let tenants = self
			.store()
			.auto_sync_tenants()
			.await?
			.into_iter()
			.filter(|tenant| tenant.is_auto_sync_eligible())
			.map(|tenant| tenant.id)
			.collect::<Vec<_>>();
		let limit = self.config.max_concurrent_tenants;
		let outcomes = span.instrument(run_bounded(self.clone(), tenants, source, cancel, limit)).await;
		let failed = outcomes.iter().filter(|(_, result)| result.is_err()).count();

		tracing::info!(tenants = outcomes.len(), failed, "Pool run finished.");
		obs::record_operation(
			Operation::SyncAll,
			if failed == 0 { Outcome::Success } else { Outcome::Degraded },
		);

		Ok(outcomes)
	}
}

async fn run_bounded(
	orchestrator: Arc<SyncOrchestrator>,
	tenants: Vec<TenantId>,
	source: SyncSource,
	cancel: &CancellationToken,
	limit: usize,
) -> Vec<TenantOutcome> {
	let semaphore = Arc::new(Semaphore::new(limit.max(1)));
	let mut pending = tenants.iter().cloned().collect::<BTreeSet<_>>();
	let mut tasks = JoinSet::new();
	let mut outcomes = Vec::with_capacity(tenants.len());

	for tenant_id in tenants {
		let orchestrator = orchestrator.clone();
		let semaphore = semaphore.clone();
		let token = cancel.child_token();

		tasks.spawn(async move {
			let result = tokio::select! {
				_ = token.cancelled() => Err(Error::Cancelled),
				permit = semaphore.acquire_owned() => match permit {
					Ok(_permit) => orchestrator.sync_tenant(&tenant_id, source, &token).await,
					Err(_) => Err(Error::Cancelled),
				},
			};

			(tenant_id, result)
		});
	}

	while let Some(joined) = tasks.join_next().await {
		match joined {
			Ok((tenant_id, result)) => {
				pending.remove(&tenant_id);
				outcomes.push((tenant_id, result));
			},
			Err(e) => tracing::error!(error = %e, "Tenant sync task aborted."),
		}
	}

	outcomes.extend(pending.into_iter().map(|tenant_id| {
		(tenant_id, Err(Error::Internal { message: "tenant sync task aborted".into() }))
	}));
	outcomes.sort_by(|(a, _), (b, _)| a.cmp(b));

	outcomes
}
