//! FIFO queue of callers waiting on the in-flight refresh.

// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret, error::RefreshError};

/// Value delivered to each queued caller once the refresh settles.
pub type RefreshOutcome = Result<TokenSecret, RefreshError>;

/// Arrival-order position of a queued caller; strictly increasing per queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);
impl Ticket {
	/// Returns the raw sequence number.
	pub fn get(self) -> u64 {
		self.0
	}
}

/// Deferred continuation for a request that failed with 401 during a refresh window.
#[derive(Debug)]
struct PendingRequest {
	ticket: Ticket,
	sender: oneshot::Sender<RefreshOutcome>,
}

/// Ordered collection of waiting callers.
///
/// Entries leave the queue only by being resolved, rejected, or removed by ticket; there is no
/// priority and no reordering.
#[derive(Debug, Default)]
pub struct PendingQueue {
	next: u64,
	entries: VecDeque<PendingRequest>,
}
impl PendingQueue {
	/// Appends a caller and returns its ticket plus the receiver it should await.
	pub fn enqueue(&mut self) -> (Ticket, oneshot::Receiver<RefreshOutcome>) {
		let ticket = Ticket(self.next);
		let (sender, receiver) = oneshot::channel();

		self.next += 1;
		self.entries.push_back(PendingRequest { ticket, sender });

		(ticket, receiver)
	}

	/// Number of queued callers.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// True when nobody is waiting.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Tickets in drain order.
	pub fn tickets(&self) -> Vec<Ticket> {
		self.entries.iter().map(|entry| entry.ticket).collect()
	}

	/// Removes a single caller without notifying it.
	pub fn remove(&mut self, ticket: Ticket) -> bool {
		let before = self.entries.len();

		self.entries.retain(|entry| entry.ticket != ticket);

		before != self.entries.len()
	}

	/// Drains the queue in arrival order, handing each caller the new access credential.
	///
	/// Returns the tickets of the callers that were still listening, in delivery order.
	pub fn resolve_all(&mut self, access_token: &TokenSecret) -> Vec<Ticket> {
		self.settle_all(|| Ok(access_token.clone()))
	}

	/// Drains the queue in arrival order, rejecting each caller with `error`.
	pub fn reject_all(&mut self, error: &RefreshError) -> Vec<Ticket> {
		self.settle_all(|| Err(error.clone()))
	}

	fn settle_all(&mut self, outcome: impl Fn() -> RefreshOutcome) -> Vec<Ticket> {
		self.entries
			.drain(..)
			.filter_map(|entry| entry.sender.send(outcome()).ok().map(|()| entry.ticket))
			.collect()
	}
}
