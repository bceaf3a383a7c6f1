// self
use crate::{
	_prelude::*,
	obs::{FlowKind, RefreshEvent},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("ledger_auth.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a structured event for a refresh coordinator transition (when enabled).
pub fn trace_refresh(event: RefreshEvent) {
	#[cfg(feature = "tracing")]
	match event {
		RefreshEvent::Started => tracing::debug!("credential refresh started"),
		RefreshEvent::Queued { pending } =>
			tracing::debug!(pending, "request queued behind in-flight refresh"),
		RefreshEvent::Drained { resumed } =>
			tracing::debug!(resumed, "credential refresh succeeded; queue drained"),
		RefreshEvent::Failed { rejected, left_pending } =>
			tracing::warn!(rejected, left_pending, "credential refresh failed"),
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = event;
	}
}
