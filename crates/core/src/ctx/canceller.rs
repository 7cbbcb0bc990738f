use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A handle which cancels the context it was created from, and every context
/// derived from it.
#[derive(Clone, Debug, Default)]
pub struct Canceller {
	/// A reference to the cancellation flag of the context.
	cancellations: Arc<AtomicBool>,
}

impl Canceller {
	pub(crate) fn new(cancelled: Arc<AtomicBool>) -> Canceller {
		Canceller {
			cancellations: cancelled,
		}
	}

	/// Cancel the context.
	pub fn cancel(&self) {
		self.cancellations.store(true, Ordering::Relaxed);
	}
}
