//! Thread-safe in-memory [`DirectoryStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	model::{DirectoryUserRecord, TenantId, TenantSyncSummary, UserKey},
	store::{DirectoryStore, StoreError, StoreFuture, StoredUser, TenantRecord, UpsertReport},
};

#[derive(Debug, Default)]
struct MemoryState {
	tenants: BTreeMap<TenantId, TenantRecord>,
	users: BTreeMap<UserKey, StoredUser>,
	summaries: Vec<TenantSyncSummary>,
	next_local_id: u64,
}

type StateMap = Arc<RwLock<MemoryState>>;

/// Thread-safe storage backend that keeps everything in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StateMap);
impl MemoryStore {
	/// Inserts or replaces a tenant.
	pub fn insert_tenant(&self, record: TenantRecord) {
		self.0.write().tenants.insert(record.id.clone(), record);
	}

	/// Snapshot of a tenant's users, ordered by key.
	pub fn users(&self, tenant: &TenantId) -> Vec<StoredUser> {
		Self::users_now(&self.0, tenant)
	}

	/// Snapshot of a tenant's summaries, oldest first.
	pub fn summaries_for(&self, tenant: &TenantId) -> Vec<TenantSyncSummary> {
		Self::summaries_now(&self.0, tenant)
	}

	/// Snapshot of a tenant record.
	pub fn tenant_now(&self, tenant: &TenantId) -> Option<TenantRecord> {
		self.0.read().tenants.get(tenant).cloned()
	}

	/// Sets the locally-owned notes of a user; returns `false` when the user is unknown.
	pub fn set_notes(&self, key: &UserKey, notes: impl Into<String>) -> bool {
		match self.0.write().users.get_mut(key) {
			Some(user) => {
				user.notes = Some(notes.into());

				true
			},
			None => false,
		}
	}

	fn users_now(map: &StateMap, tenant: &TenantId) -> Vec<StoredUser> {
		map.read()
			.users
			.values()
			.filter(|user| &user.record.tenant_id == tenant)
			.cloned()
			.collect()
	}

	fn summaries_now(map: &StateMap, tenant: &TenantId) -> Vec<TenantSyncSummary> {
		map.read()
			.summaries
			.iter()
			.filter(|summary| &summary.tenant_id == tenant)
			.cloned()
			.collect()
	}

	fn upsert_now(
		map: &StateMap,
		tenant: &TenantId,
		chunk: Vec<DirectoryUserRecord>,
	) -> Result<UpsertReport, StoreError> {
		if let Some(stray) = chunk.iter().find(|record| &record.tenant_id != tenant) {
			return Err(StoreError::Backend {
				message: format!(
					"user {} belongs to tenant {}, not {tenant}",
					stray.external_id, stray.tenant_id
				),
			});
		}

		let now = OffsetDateTime::now_utc();
		let mut state = map.write();
		let mut report = UpsertReport::default();

		for record in chunk {
			let key = record.key();

			if let Some(existing) = state.users.get_mut(&key) {
				existing.record.absorb(record);
				existing.updated_at = now;
				report.updated += 1;

				continue;
			}

			state.next_local_id += 1;

			let local_id = state.next_local_id;

			state.users.insert(
				key,
				StoredUser { local_id, record, notes: None, created_at: now, updated_at: now },
			);
			report.inserted += 1;
		}

		Ok(report)
	}
}
impl DirectoryStore for MemoryStore {
	fn tenant<'a>(&'a self, id: &'a TenantId) -> StoreFuture<'a, Option<TenantRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().tenants.get(id).cloned()) })
	}

	fn auto_sync_tenants(&self) -> StoreFuture<'_, Vec<TenantRecord>> {
		let map = self.0.clone();

		Box::pin(async move {
			Ok(map
				.read()
				.tenants
				.values()
				.filter(|tenant| tenant.is_auto_sync_eligible())
				.cloned()
				.collect())
		})
	}

	fn update_tenant(&self, record: TenantRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			let mut state = map.write();

			if !state.tenants.contains_key(&record.id) {
				let message = format!("tenant {} is unknown", record.id);

				return Err(StoreError::Backend { message });
			}

			state.tenants.insert(record.id.clone(), record);

			Ok(())
		})
	}

	fn upsert_users<'a>(
		&'a self,
		tenant: &'a TenantId,
		chunk: Vec<DirectoryUserRecord>,
	) -> StoreFuture<'a, UpsertReport> {
		let map = self.0.clone();

		Box::pin(async move { Self::upsert_now(&map, tenant, chunk) })
	}

	fn list_users<'a>(&'a self, tenant: &'a TenantId) -> StoreFuture<'a, Vec<StoredUser>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::users_now(&map, tenant)) })
	}

	fn count_users<'a>(&'a self, tenant: &'a TenantId) -> StoreFuture<'a, usize> {
		let map = self.0.clone();

		Box::pin(async move {
			Ok(map.read().users.values().filter(|user| &user.record.tenant_id == tenant).count())
		})
	}

	fn append_summary(&self, summary: TenantSyncSummary) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().summaries.push(summary);

			Ok(())
		})
	}

	fn summaries<'a>(
		&'a self,
		tenant: &'a TenantId,
	) -> StoreFuture<'a, Vec<TenantSyncSummary>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::summaries_now(&map, tenant)) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::model::UserId;

	fn tenant_id(value: &str) -> TenantId {
		TenantId::new(value).expect("Tenant fixture should be valid.")
	}

	fn user(tenant: &TenantId, id: &str, name: &str) -> DirectoryUserRecord {
		DirectoryUserRecord::new(
			UserId::new(id).expect("User fixture should be valid."),
			tenant.clone(),
			name,
		)
	}

	#[tokio::test]
	async fn chunk_with_foreign_user_writes_nothing() {
		let store = MemoryStore::default();
		let tenant = tenant_id("tenant-a");
		let other = tenant_id("tenant-b");
		let chunk = vec![user(&tenant, "u1", "Ada"), user(&other, "u2", "Grace")];
		let err = store
			.upsert_users(&tenant, chunk)
			.await
			.expect_err("Chunk containing another tenant's user should be rejected.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert!(store.users(&tenant).is_empty());
	}

	#[tokio::test]
	async fn local_ids_are_stable_across_upserts() {
		let store = MemoryStore::default();
		let tenant = tenant_id("tenant-a");
		let first = store
			.upsert_users(&tenant, vec![user(&tenant, "u1", "Ada")])
			.await
			.expect("First upsert should succeed.");
		let second = store
			.upsert_users(
				&tenant,
				vec![user(&tenant, "u1", "Ada L."), user(&tenant, "u2", "Grace")],
			)
			.await
			.expect("Second upsert should succeed.");
		let users = store.users(&tenant);

		assert_eq!(first, UpsertReport { inserted: 1, updated: 0 });
		assert_eq!(second, UpsertReport { inserted: 1, updated: 1 });
		assert_eq!(users.len(), 2);
		assert_eq!(users[0].local_id, 1);
		assert_eq!(users[0].record.display_name, "Ada L.");
		assert_eq!(users[1].local_id, 2);
	}
}
