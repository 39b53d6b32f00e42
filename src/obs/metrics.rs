// self
use crate::obs::{Operation, Outcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation(op: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"directory_sync_operation_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, outcome);
	}
}

/// Adds reconciled user records to the records counter (when enabled).
pub fn record_records_synced(count: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("directory_sync_records_total").increment(count as u64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = count;
	}
}
