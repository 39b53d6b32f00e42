//! Observability helpers for engine operations.
//!
//! # Feature Flags
//!
//! - Spans named `directory_sync.op` carry the `op` (operation) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `directory_sync_operation_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`, and `directory_sync_records_total`
//!   for reconciled user records.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Engine operations observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Token acquisition.
	Token,
	/// Tenant details resolution.
	Details,
	/// Paginated Graph listing.
	Paginate,
	/// `$batch` execution.
	Batch,
	/// Identity-signal aggregation.
	Profile,
	/// Single-tenant sync run.
	Sync,
	/// Multi-tenant pool run.
	SyncAll,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Token => "token",
			Operation::Details => "details",
			Operation::Paginate => "paginate",
			Operation::Batch => "batch",
			Operation::Profile => "profile",
			Operation::Sync => "sync",
			Operation::SyncAll => "sync_all",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Completion with degraded facets.
	Degraded,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Degraded => "degraded",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
