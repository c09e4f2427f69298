// crates.io
use tracing::{Instrument, instrument::Instrumented};
use tracing_subscriber::EnvFilter;
// self
use crate::{_prelude::*, obs::FlowStage};

/// Filter applied when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// A span builder used by flow stages.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided stage.
	pub fn new(stage: FlowStage) -> Self {
		Self { span: tracing::info_span!("smart_launch.flow", stage = stage.as_str()) }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}

/// Installs the global `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

	tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok()
}

#[cfg(test)]
mod tests {
	// self
	use super::{FlowSpan, FlowStage, init_tracing};

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowStage::TokenExchange);
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn init_is_idempotent() {
		init_tracing();

		assert!(!init_tracing());
	}
}
