// self
use crate::obs::{FlowOutcome, FlowStage};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(stage: FlowStage, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"smart_launch_flow_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}
