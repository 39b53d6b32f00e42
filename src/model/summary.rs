//! Append-only records describing each tenant sync attempt.

// self
use crate::{_prelude::*, error::FailureKind, model::TenantId};

/// Terminal outcome of a sync attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
	/// Run reached `Completed`.
	Success,
	/// Run reached `Failed`.
	Failure,
}
impl SyncOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}
}
impl Display for SyncOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// What triggered a sync attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
	/// Scheduled pool run.
	Scheduled,
	/// "Sync now" from the console.
	Manual,
	/// Command-line trigger.
	Cli,
}
impl SyncSource {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Scheduled => "scheduled",
			Self::Manual => "manual",
			Self::Cli => "cli",
		}
	}
}
impl Display for SyncSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Classified cause attached to failed summaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
	/// Stable failure classification.
	pub kind: FailureKind,
	/// Rendered error message.
	pub message: String,
}
impl From<&Error> for SyncFailure {
	fn from(error: &Error) -> Self {
		Self { kind: error.kind(), message: error.to_string() }
	}
}

/// One immutable record per sync attempt, used for dashboards and freshness decisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSyncSummary {
	/// Local tenant identifier.
	pub tenant_id: TenantId,
	/// Terminal outcome.
	pub outcome: SyncOutcome,
	/// Records reconciled (0 on failure).
	pub records_synced: usize,
	/// Elapsed run time (zero on failure).
	pub duration: Duration,
	/// Trigger label.
	pub source: SyncSource,
	/// Instant the summary was written.
	pub recorded_at: OffsetDateTime,
	/// Pages fetched from the user listing.
	pub pages_fetched: usize,
	/// `true` when the page ceiling cut pagination short.
	pub truncated: bool,
	/// Failure cause for failed runs.
	pub failure: Option<SyncFailure>,
}
impl TenantSyncSummary {
	/// Builds a success summary.
	pub fn success(
		tenant_id: TenantId,
		source: SyncSource,
		records_synced: usize,
		duration: Duration,
		pages_fetched: usize,
		truncated: bool,
	) -> Self {
		Self {
			tenant_id,
			outcome: SyncOutcome::Success,
			records_synced,
			duration,
			source,
			recorded_at: OffsetDateTime::now_utc(),
			pages_fetched,
			truncated,
			failure: None,
		}
	}

	/// Builds a failure summary with zero records and zero duration.
	pub fn failure(tenant_id: TenantId, source: SyncSource, error: &Error) -> Self {
		Self {
			tenant_id,
			outcome: SyncOutcome::Failure,
			records_synced: 0,
			duration: Duration::ZERO,
			source,
			recorded_at: OffsetDateTime::now_utc(),
			pages_fetched: 0,
			truncated: false,
			failure: Some(error.into()),
		}
	}

	/// Returns `true` for successful runs.
	pub fn is_success(&self) -> bool {
		matches!(self.outcome, SyncOutcome::Success)
	}
}
