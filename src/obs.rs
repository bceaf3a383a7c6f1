//! Optional observability helpers for façade operations and refresh cycles.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `ledger_auth.flow` with the `flow`
//!   (operation) and `stage` (call site) fields, plus debug/warn events for every refresh
//!   coordinator transition.
//! - Enable `metrics` to increment the `ledger_auth_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Account creation.
	Register,
	/// Credential login.
	Login,
	/// Session probe or startup restore.
	Session,
	/// Logout with local cleanup.
	Logout,
	/// Password reset request.
	ResetPassword,
	/// Coordinated access credential refresh.
	Refresh,
	/// Generic authenticated request.
	Request,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Register => "register",
			FlowKind::Login => "login",
			FlowKind::Session => "session",
			FlowKind::Logout => "logout",
			FlowKind::ResetPassword => "reset_password",
			FlowKind::Refresh => "refresh",
			FlowKind::Request => "request",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an operation.
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

/// Refresh coordinator transitions reported through [`trace_refresh`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshEvent {
	/// IDLE -> REFRESHING; this caller issues the refresh call.
	Started,
	/// A caller joined the in-flight refresh.
	Queued {
		/// Queue length after the caller joined.
		pending: usize,
	},
	/// Refresh succeeded and the queue was drained.
	Drained {
		/// Number of callers resumed.
		resumed: usize,
	},
	/// Refresh failed.
	Failed {
		/// Number of callers rejected.
		rejected: usize,
		/// Number of callers left queued for a later refresh.
		left_pending: usize,
	},
}

/// Runs `fut` inside a flow span and records attempt/success/failure outcomes around it.
pub async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => record_flow_outcome(kind, FlowOutcome::Failure),
	}

	result
}
