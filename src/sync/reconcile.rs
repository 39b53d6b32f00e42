//! Mapping provider users into records and writing them in atomic chunks.

// self
use crate::{
	_prelude::*,
	graph::schema::GraphUser,
	license::LicenseCatalog,
	model::{DirectoryUserRecord, TenantId, UserId},
	store::{DirectoryStore, UpsertReport},
};

/// Totals of one reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
	/// Records written (inserted plus updated).
	pub records: usize,
	/// Newly inserted rows.
	pub inserted: usize,
	/// Existing rows whose sync-owned fields were replaced.
	pub updated: usize,
	/// Chunks committed.
	pub chunks: usize,
}
impl ReconcileReport {
	fn absorb(&mut self, report: UpsertReport) {
		self.records += report.total();
		self.inserted += report.inserted;
		self.updated += report.updated;
		self.chunks += 1;
	}
}

/// Maps one provider user; returns `None` when the user carries no usable id.
///
/// `sku_index` maps SKU ids to part numbers; ids missing from it contribute no license name.
pub fn map_user(
	user: GraphUser,
	tenant_id: &TenantId,
	sku_index: &BTreeMap<String, String>,
	licenses: &LicenseCatalog,
) -> Option<DirectoryUserRecord> {
	let external_id = user.id.as_deref().and_then(|id| UserId::new(id).ok())?;
	let display_name = user
		.display_name
		.clone()
		.or_else(|| user.user_principal_name.clone())
		.unwrap_or_else(|| external_id.to_string());
	let license_display_name = licenses.display_names(
		user.assigned_licenses.iter().filter_map(|l| sku_index.get(&l.sku_id).map(String::as_str)),
	);
	let mut record = DirectoryUserRecord::new(external_id, tenant_id.clone(), display_name);

	record.email = user.mail.or(user.user_principal_name);
	record.phone = user.business_phones.into_iter().find(|phone| !phone.trim().is_empty());
	record.mobile_phone = user.mobile_phone;
	record.department = user.department;
	record.office_location = user.office_location;
	record.job_title = user.job_title;
	record.license_display_name = license_display_name;
	record.enabled = user.account_enabled.unwrap_or(true);

	Some(record)
}

/// Upserts `records` in fetch order, `chunk_size` at a time.
///
/// Chunks committed before a failure stay committed; the failing chunk's index is reported in
/// [`Error::Reconciliation`].
pub async fn reconcile(
	store: &dyn DirectoryStore,
	tenant_id: &TenantId,
	records: Vec<DirectoryUserRecord>,
	chunk_size: usize,
) -> Result<ReconcileReport> {
	let chunk_size = chunk_size.max(1);
	let mut report = ReconcileReport::default();
	let mut remaining = records.into_iter().peekable();
	let mut chunk_index = 0;

	while remaining.peek().is_some() {
		let chunk = remaining.by_ref().take(chunk_size).collect::<Vec<_>>();
		let written = store
			.upsert_users(tenant_id, chunk)
			.await
			.map_err(|source| Error::Reconciliation { chunk: chunk_index, source })?;

		tracing::debug!(
			tenant = %tenant_id,
			chunk = chunk_index,
			inserted = written.inserted,
			updated = written.updated,
			"Reconciliation chunk committed."
		);
		report.absorb(written);

		chunk_index += 1;
	}

	Ok(report)
}
