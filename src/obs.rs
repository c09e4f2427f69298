//! Observability helpers for the launch flow.
//!
//! Every outbound step runs inside a `smart_launch.flow` span carrying a `stage` field. With
//! the `metrics` feature enabled, each attempt/success/failure also increments the
//! `smart_launch_flow_total` counter, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Outbound steps of the launch flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowStage {
	/// `.well-known/smart-configuration` fetch.
	Discovery,
	/// Authorization URL composition and pending-launch bookkeeping.
	Authorization,
	/// Authorization-code exchange.
	TokenExchange,
	/// Encounter read.
	ResourceFetch,
}
impl FlowStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowStage::Discovery => "discovery",
			FlowStage::Authorization => "authorization",
			FlowStage::TokenExchange => "token_exchange",
			FlowStage::ResourceFetch => "resource_fetch",
		}
	}
}
impl Display for FlowStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside the span for `stage`, recording attempt and outcome.
pub async fn observe<T, E, Fut>(stage: FlowStage, fut: Fut) -> Result<T, E>
where
	E: Display,
	Fut: Future<Output = Result<T, E>>,
{
	let span = FlowSpan::new(stage);

	record_flow_outcome(stage, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => {
			record_flow_outcome(stage, FlowOutcome::Success);
			::tracing::debug!(stage = stage.as_str(), "flow stage succeeded");
		},
		Err(e) => {
			record_flow_outcome(stage, FlowOutcome::Failure);
			::tracing::warn!(stage = stage.as_str(), error = %e, "flow stage failed");
		},
	}

	result
}
