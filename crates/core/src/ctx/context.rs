use std::fmt::{self, Debug};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::ctx::canceller::Canceller;
use crate::ctx::reason::Reason;
use crate::err::Error;
use crate::iam::Authorizer;

pub type Context = Arc<MutableContext>;

/// The context of one inbound operation.
///
/// A context is built mutably, then frozen and shared with every layer the
/// operation passes through. Derived contexts inherit the deadline, the
/// cancellation and the principal of their parent.
#[non_exhaustive]
pub struct MutableContext {
	// An optional parent context.
	parent: Option<Context>,
	// An optional deadline.
	deadline: Option<Instant>,
	// Whether or not this context is cancelled.
	cancelled: Arc<AtomicBool>,
	// The principal performing the operation.
	authorizer: Option<Arc<dyn Authorizer>>,
}

impl Default for MutableContext {
	fn default() -> Self {
		MutableContext::background()
	}
}

impl Debug for MutableContext {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Context")
			.field("parent", &self.parent)
			.field("deadline", &self.deadline)
			.field("cancelled", &self.cancelled)
			.field("authorizer", &self.authorizer.as_ref().map(|a| a.identity()))
			.finish()
	}
}

impl MutableContext {
	/// Creates a new empty background context.
	pub fn background() -> Self {
		Self {
			parent: None,
			deadline: None,
			cancelled: Arc::new(AtomicBool::new(false)),
			authorizer: None,
		}
	}

	/// Creates a new context from a frozen parent context.
	pub fn new(parent: &Context) -> Self {
		MutableContext {
			parent: Some(parent.clone()),
			deadline: parent.deadline,
			cancelled: Arc::new(AtomicBool::new(false)),
			authorizer: None,
		}
	}

	/// Creates a background context acting as the given principal.
	pub fn with_authorizer(authorizer: Arc<dyn Authorizer>) -> Self {
		let mut ctx = Self::background();
		ctx.set_authorizer(authorizer);
		ctx
	}

	/// Freezes this context, allowing it to be shared.
	pub fn freeze(self) -> Context {
		Arc::new(self)
	}

	/// Add cancellation to the context. The value that is returned will cancel
	/// the context and its children once called.
	pub fn add_cancel(&mut self) -> Canceller {
		Canceller::new(self.cancelled.clone())
	}

	/// Add a deadline to the context. If the current deadline is sooner than
	/// the provided deadline, this method does nothing.
	pub fn add_deadline(&mut self, deadline: Instant) {
		match self.deadline {
			Some(current) if current < deadline => (),
			_ => self.deadline = Some(deadline),
		}
	}

	/// Add a timeout to the context. If the current timeout is sooner than
	/// the provided timeout, this method does nothing.
	pub fn add_timeout(&mut self, timeout: Duration) -> Result<(), Error> {
		match Instant::now().checked_add(timeout) {
			Some(deadline) => {
				self.add_deadline(deadline);
				Ok(())
			}
			None => Err(Error::Internal(format!("Invalid timeout: {timeout:?}"))),
		}
	}

	/// Set the principal performing this operation.
	pub fn set_authorizer(&mut self, authorizer: Arc<dyn Authorizer>) {
		self.authorizer = Some(authorizer);
	}

	/// Get the principal performing this operation, searching parent contexts.
	pub fn authorizer(&self) -> Result<&Arc<dyn Authorizer>, Error> {
		match (&self.authorizer, &self.parent) {
			(Some(auth), _) => Ok(auth),
			(None, Some(parent)) => parent.authorizer(),
			(None, None) => Err(Error::NoAuthorizer),
		}
	}

	/// Check if the context is done. If it returns `None` the operation may
	/// proceed, otherwise the operation should be stopped.
	pub fn done(&self) -> Option<Reason> {
		match self.deadline {
			Some(deadline) if deadline <= Instant::now() => Some(Reason::Timedout),
			_ if self.cancelled.load(Ordering::Relaxed) => Some(Reason::Canceled),
			_ => match &self.parent {
				Some(ctx) => ctx.done(),
				_ => None,
			},
		}
	}

	/// Check if the context is ok to continue.
	pub fn is_ok(&self) -> bool {
		self.done().is_none()
	}

	/// Check if the context is not ok to continue.
	pub fn is_done(&self) -> bool {
		self.done().is_some()
	}
}
