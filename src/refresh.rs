//! Refresh coordination: at most one refresh call in flight, FIFO hand-off to waiting callers.
//!
//! [`RefreshCoordinator::refresh_or_wait`] is the only entry point. The first caller to arrive
//! while the coordinator is [`CoordinatorState::Idle`] becomes the initiator: it flips the state
//! to [`CoordinatorState::Refreshing`] and runs the refresh future it was given. Every caller
//! arriving while a refresh is in flight is parked in the [`PendingQueue`] and never runs its
//! own refresh future. When the refresh settles, the queue is drained in arrival order and the
//! state returns to idle, whatever the outcome.
//!
//! The initiator takes the head of the queue, so on success it resumes first. On failure it
//! observes the refresh error directly; what queued callers observe depends on
//! [`RefreshFailurePolicy`]. Timeouts and a cancelled initiator always reject the whole queue.

pub mod queue;

mod metrics;

pub use metrics::RefreshMetrics;
pub use queue::{PendingQueue, RefreshOutcome, Ticket};

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::RefreshFailurePolicy,
	error::RefreshError,
	obs::{self, RefreshEvent},
};

/// Observable coordinator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinatorState {
	/// No refresh call outstanding.
	Idle,
	/// Exactly one refresh call outstanding.
	Refreshing,
}

#[derive(Debug, Default)]
struct Inner {
	refreshing: bool,
	queue: PendingQueue,
}

/// Single-flight refresh guard plus the queue of callers waiting on it.
#[derive(Debug)]
pub struct RefreshCoordinator {
	inner: Mutex<Inner>,
	timeout: Option<Duration>,
	policy: RefreshFailurePolicy,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator.
	///
	/// A bounded `timeout` needs a Tokio runtime with the time driver enabled.
	pub fn new(timeout: Option<Duration>, policy: RefreshFailurePolicy) -> Self {
		Self { inner: Mutex::default(), timeout, policy, metrics: Default::default() }
	}

	/// Current state.
	pub fn state(&self) -> CoordinatorState {
		if self.inner.lock().refreshing {
			CoordinatorState::Refreshing
		} else {
			CoordinatorState::Idle
		}
	}

	/// Number of callers currently waiting, the initiator included.
	pub fn pending(&self) -> usize {
		self.inner.lock().queue.len()
	}

	/// Shared refresh counters.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		&self.metrics
	}

	/// Starts a refresh with `refresh`, or joins the one already in flight.
	///
	/// `refresh` runs only when this caller becomes the initiator. The returned access
	/// credential is the one every caller of the same refresh window receives.
	pub async fn refresh_or_wait<F, Fut>(&self, refresh: F) -> Result<TokenSecret, RefreshError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = RefreshOutcome>,
	{
		let (ticket, receiver, initiator) = {
			let mut inner = self.inner.lock();
			let (ticket, receiver) = inner.queue.enqueue();
			let initiator = !inner.refreshing;

			if initiator {
				inner.refreshing = true;
			} else {
				obs::trace_refresh(RefreshEvent::Queued { pending: inner.queue.len() });
			}

			(ticket, receiver, initiator)
		};

		if !initiator {
			self.metrics.record_coalesced();

			return Self::wait(receiver).await;
		}

		self.metrics.record_attempt();
		obs::trace_refresh(RefreshEvent::Started);

		let mut cycle = CycleGuard { coordinator: self, ticket, armed: true };
		let outcome = match self.timeout {
			Some(after) => tokio::time::timeout(after.unsigned_abs(), refresh())
				.await
				.unwrap_or(Err(RefreshError::TimedOut { after })),
			None => refresh().await,
		};

		cycle.armed = false;

		match outcome {
			Ok(access_token) => {
				self.settle_success(&access_token);

				Self::wait(receiver).await
			},
			Err(error) => {
				self.settle_failure(ticket, &error);

				Err(error)
			},
		}
	}

	async fn wait(receiver: oneshot::Receiver<RefreshOutcome>) -> RefreshOutcome {
		receiver.await.unwrap_or(Err(RefreshError::Aborted))
	}

	fn settle_success(&self, access_token: &TokenSecret) {
		let mut inner = self.inner.lock();

		inner.refreshing = false;

		let resumed = inner.queue.resolve_all(access_token).len();

		drop(inner);

		self.metrics.record_success();
		self.metrics.record_resumed(resumed);
		obs::trace_refresh(RefreshEvent::Drained { resumed });
	}

	fn settle_failure(&self, initiator: Ticket, error: &RefreshError) {
		let reject_queued = match error {
			RefreshError::TimedOut { .. } | RefreshError::Aborted => true,
			_ => self.policy == RefreshFailurePolicy::RejectQueued,
		};
		let mut inner = self.inner.lock();

		inner.refreshing = false;
		inner.queue.remove(initiator);

		let rejected = if reject_queued { inner.queue.reject_all(error).len() } else { 0 };
		let left_pending = inner.queue.len();

		drop(inner);

		self.metrics.record_failure();
		obs::trace_refresh(RefreshEvent::Failed { rejected, left_pending });
	}
}
impl Default for RefreshCoordinator {
	fn default() -> Self {
		Self::new(None, RefreshFailurePolicy::default())
	}
}

// Returns the coordinator to idle if the initiator's future is dropped mid-refresh.
struct CycleGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	ticket: Ticket,
	armed: bool,
}
impl Drop for CycleGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			self.coordinator.settle_failure(self.ticket, &RefreshError::Aborted);
		}
	}
}
