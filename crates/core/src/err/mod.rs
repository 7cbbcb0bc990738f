use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::iam::Error as IamError;
use crate::iam::{Action, Id};

/// The class of an error, as reported to callers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
	/// Permission denied
	Unauthorized,
	/// The request, or the script it carries, is not acceptable
	Invalid,
	/// A resource lookup failed
	NotFound,
	/// The operation was cancelled or timed out
	Canceled,
	/// A collaborator failed unexpectedly, or a panic was recovered
	Internal,
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Unauthorized => write!(f, "unauthorized"),
			Self::Invalid => write!(f, "invalid"),
			Self::NotFound => write!(f, "not found"),
			Self::Canceled => write!(f, "canceled"),
			Self::Internal => write!(f, "internal error"),
		}
	}
}

#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
	/// A permission check failed, or an identifier was malformed
	#[error("{0}")]
	Iam(#[from] IamError),

	/// The request context carries no principal
	#[error("No authorizer found on the request context")]
	NoAuthorizer,

	/// The principal may not access the requested resource
	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	/// A compiled query references a bucket the principal may not access
	#[error("No {action} permission for bucket {bucket:?} in organization {org_id}")]
	BucketNotAllowed {
		action: Action,
		bucket: String,
		org_id: Id,
	},

	/// A bucket referenced by a compiled query could not be resolved
	#[error("Could not find bucket {filter}: {source}")]
	BucketLookup {
		filter: String,
		source: Box<Error>,
	},

	/// The script could not be compiled
	#[error("Failed to compile script: {0}")]
	Compile(String),

	/// The request was rejected, wrapping the underlying failure
	#[error("{message}: {source}")]
	Invalid {
		message: String,
		source: Box<Error>,
	},

	/// The query compiler type is not supported by a query service
	#[error("Compiler type not supported: {0}")]
	UnsupportedCompiler(String),

	/// A resource lookup failed in a persistence collaborator
	#[error("{0} not found")]
	NotFound(String),

	/// The query was cancelled through its context
	#[error("The query was cancelled")]
	QueryCancelled,

	/// The query exceeded its deadline
	#[error("The query was not completed because it exceeded the timeout")]
	QueryTimedout,

	/// Writing the encoded results failed
	#[error("Failed to write query results: {0}")]
	Io(String),

	/// A panic was recovered, or a collaborator failed unexpectedly
	#[error("Internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Classifies this error for reporting
	pub fn code(&self) -> ErrorCode {
		match self {
			Error::Iam(IamError::NotAllowed {
				..
			}) => ErrorCode::Unauthorized,
			Error::Iam(_) => ErrorCode::Invalid,
			Error::NoAuthorizer => ErrorCode::Unauthorized,
			Error::Unauthorized(_) => ErrorCode::Unauthorized,
			Error::BucketNotAllowed {
				..
			} => ErrorCode::Unauthorized,
			Error::BucketLookup {
				source,
				..
			} => source.code(),
			Error::Compile(_) => ErrorCode::Invalid,
			Error::Invalid {
				..
			} => ErrorCode::Invalid,
			Error::UnsupportedCompiler(_) => ErrorCode::Invalid,
			Error::NotFound(_) => ErrorCode::NotFound,
			Error::QueryCancelled | Error::QueryTimedout => ErrorCode::Canceled,
			Error::Io(_) | Error::Internal(_) => ErrorCode::Internal,
		}
	}

	/// Wraps an error as an invalid request with a user facing message
	pub fn invalid(message: impl Into<String>, source: Error) -> Self {
		Error::Invalid {
			message: message.into(),
			source: Box::new(source),
		}
	}

	/// Converts a recovered panic payload into an error
	pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
		let message = match payload.downcast::<String>() {
			Ok(s) => *s,
			Err(payload) => match payload.downcast::<&'static str>() {
				Ok(s) => (*s).to_owned(),
				Err(_) => "unknown panic payload".to_owned(),
			},
		};
		Error::Internal(format!("panic: {message}"))
	}
}

impl From<std::io::Error> for Error {
	fn from(e: std::io::Error) -> Self {
		Error::Io(e.to_string())
	}
}

impl From<serde_json::Error> for Error {
	fn from(e: serde_json::Error) -> Self {
		Error::Internal(e.to_string())
	}
}

/// The body written in place of query results when a query fails before any
/// output was produced.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
	pub code: ErrorCode,
	pub message: String,
}

impl From<&Error> for ErrorBody {
	fn from(e: &Error) -> Self {
		Self {
			code: e.code(),
			message: e.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::iam::{Permission, ResourceType};

	#[test]
	fn codes() {
		let denied = Error::from(IamError::NotAllowed {
			identity: "authorization:0000000000000001".into(),
			permission: Permission::unscoped(Action::Read, ResourceType::Tasks),
		});
		assert_eq!(denied.code(), ErrorCode::Unauthorized);
		// Wrapping keeps the outer classification
		assert_eq!(Error::invalid("Failed to authorize.", denied).code(), ErrorCode::Invalid);
		// Lookup failures inherit from their cause
		let lookup = Error::BucketLookup {
			filter: "name: \"telegraf\"".into(),
			source: Box::new(Error::NotFound("bucket".into())),
		};
		assert_eq!(lookup.code(), ErrorCode::NotFound);
		assert_eq!(Error::QueryCancelled.code(), ErrorCode::Canceled);
	}

	#[test]
	fn panic_payloads() {
		let e = Error::from_panic(Box::new("boom"));
		assert_eq!(e.to_string(), "Internal error: panic: boom");
		let e = Error::from_panic(Box::new(String::from("bang")));
		assert_eq!(e.to_string(), "Internal error: panic: bang");
		let e = Error::from_panic(Box::new(7u8));
		assert_eq!(e.code(), ErrorCode::Internal);
	}

	#[test]
	fn error_body() {
		let body = ErrorBody::from(&Error::NotFound("task".into()));
		let json = serde_json::to_value(&body).unwrap();
		assert_eq!(json, serde_json::json!({"code": "not_found", "message": "task not found"}));
	}
}
