use std::fmt;

use crate::err::Error;

/// Why a context stopped an operation.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Reason {
	/// The deadline of the context passed
	Timedout,
	/// The context or one of its parents was cancelled
	Canceled,
}

impl fmt::Display for Reason {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Timedout => f.write_str("context deadline exceeded"),
			Self::Canceled => f.write_str("context canceled"),
		}
	}
}

impl From<Reason> for Error {
	fn from(reason: Reason) -> Self {
		match reason {
			Reason::Timedout => Error::QueryTimedout,
			Reason::Canceled => Error::QueryCancelled,
		}
	}
}
