// crates.io
use tracing::{Instrument, Span, instrument::Instrumented};
// self
use crate::{_prelude::*, obs::Operation};

/// Span wrapper used by engine operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	span: Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(op: Operation, stage: &'static str) -> Self {
		Self { span: tracing::info_span!("directory_sync.op", op = op.as_str(), stage) }
	}

	/// Creates a span that also records the local tenant identifier.
	pub fn for_tenant(op: Operation, stage: &'static str, tenant: &str) -> Self {
		Self {
			span: tracing::info_span!("directory_sync.op", op = op.as_str(), stage, tenant),
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}

	/// Underlying span.
	pub fn span(&self) -> &Span {
		&self.span
	}
}
