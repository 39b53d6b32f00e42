//! Per-tenant run state machine.

// std
use std::time::Instant;
// self
use crate::_prelude::*;

/// Lifecycle states of one tenant sync run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
	/// Created, guards not yet evaluated.
	Idle,
	/// Resolving tenant details.
	Resolving,
	/// Paging through provider users.
	Fetching,
	/// Writing users in chunks.
	Reconciling,
	/// Terminal success.
	Completed,
	/// Terminal failure.
	Failed,
}
impl SyncState {
	/// Returns `true` when the transition `self → next` is allowed.
	pub const fn can_transition_to(self, next: SyncState) -> bool {
		matches!(
			(self, next),
			(Self::Idle, Self::Resolving)
				| (Self::Resolving, Self::Fetching)
				| (Self::Fetching, Self::Reconciling)
				| (Self::Reconciling, Self::Completed)
				| (Self::Resolving | Self::Fetching | Self::Reconciling, Self::Failed)
		)
	}

	/// Returns `true` for `Completed` and `Failed`.
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Completed | Self::Failed)
	}

	/// Returns a stable label suitable for span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Resolving => "resolving",
			Self::Fetching => "fetching",
			Self::Reconciling => "reconciling",
			Self::Completed => "completed",
			Self::Failed => "failed",
		}
	}
}
impl Display for SyncState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Rejected state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Illegal sync transition from {from} to {to}.")]
pub struct IllegalTransition {
	/// State the run was in.
	pub from: SyncState,
	/// Requested state.
	pub to: SyncState,
}
impl From<IllegalTransition> for Error {
	fn from(e: IllegalTransition) -> Self {
		Self::Internal { message: e.to_string() }
	}
}

/// Tracks the current state and elapsed time of one run.
#[derive(Debug)]
pub struct SyncRun {
	state: SyncState,
	started_at: Instant,
}
impl SyncRun {
	/// Starts a run in [`SyncState::Idle`].
	pub fn start() -> Self {
		Self { state: SyncState::Idle, started_at: Instant::now() }
	}

	/// Current state.
	pub fn state(&self) -> SyncState {
		self.state
	}

	/// Moves to `next`, refusing moves the transition table does not list.
	pub fn advance(&mut self, next: SyncState) -> Result<(), IllegalTransition> {
		if !self.state.can_transition_to(next) {
			return Err(IllegalTransition { from: self.state, to: next });
		}

		tracing::debug!(from = self.state.as_str(), to = next.as_str(), "Sync state changed.");

		self.state = next;

		Ok(())
	}

	/// Wall-clock time since [`SyncRun::start`].
	pub fn elapsed(&self) -> Duration {
		Duration::try_from(self.started_at.elapsed()).unwrap_or(Duration::MAX)
	}
}
