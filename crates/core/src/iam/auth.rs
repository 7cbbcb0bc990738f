use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Id, Permission, evaluate};

/// A principal able to evaluate whether it holds a given permission.
///
/// Every kind of principal implements this trait, and callers only ever go
/// through it, never through the concrete type behind it.
pub trait Authorizer: Debug + Send + Sync {
	/// Checks if the principal holds the given permission
	fn allowed(&self, permission: &Permission) -> bool;

	/// A description of the principal, recorded when a check fails
	fn identity(&self) -> String;

	/// The user acting through this principal
	fn user_id(&self) -> Id;

	/// Check if the principal can currently be used at all
	fn is_active(&self) -> bool {
		true
	}

	/// The explicit permissions carried by a token principal.
	///
	/// Principals whose access derives from organization membership return
	/// `None`, and are resolved through membership lookups instead.
	fn permissions(&self) -> Option<&[Permission]> {
		None
	}
}

#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
	#[default]
	Active,
	Inactive,
}

/// A token based authorization carrying an explicit list of permissions.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Authorization {
	pub id: Id,
	#[serde(rename = "orgID")]
	pub org_id: Id,
	#[serde(rename = "userID")]
	pub user_id: Id,
	#[serde(default)]
	pub status: Status,
	#[serde(default)]
	pub description: String,
	pub permissions: Vec<Permission>,
}

impl Authorization {
	pub fn new(id: Id, org_id: Id, user_id: Id, permissions: Vec<Permission>) -> Self {
		Self {
			id,
			org_id,
			user_id,
			status: Status::Active,
			description: String::new(),
			permissions,
		}
	}

	pub fn with_status(mut self, status: Status) -> Self {
		self.status = status;
		self
	}
}

impl Authorizer for Authorization {
	fn allowed(&self, permission: &Permission) -> bool {
		self.is_active() && evaluate(&self.permissions, permission)
	}

	fn identity(&self) -> String {
		format!("authorization:{}", self.id)
	}

	fn user_id(&self) -> Id {
		self.user_id
	}

	fn is_active(&self) -> bool {
		self.status == Status::Active
	}

	fn permissions(&self) -> Option<&[Permission]> {
		Some(&self.permissions)
	}
}

/// A user login session.
///
/// The permissions of a session are those the user held when it was created.
/// Once expired it allows nothing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Session {
	pub id: Id,
	#[serde(rename = "userID")]
	pub user_id: Id,
	pub permissions: Vec<Permission>,
	pub expires_at: DateTime<Utc>,
}

impl Session {
	pub fn new(id: Id, user_id: Id, permissions: Vec<Permission>, expires_at: DateTime<Utc>) -> Self {
		Self {
			id,
			user_id,
			permissions,
			expires_at,
		}
	}

	/// Check if the session has expired
	pub fn expired(&self) -> bool {
		self.expires_at <= Utc::now()
	}
}

impl Authorizer for Session {
	fn allowed(&self, permission: &Permission) -> bool {
		!self.expired() && evaluate(&self.permissions, permission)
	}

	fn identity(&self) -> String {
		format!("session:{}", self.id)
	}

	fn user_id(&self) -> Id {
		self.user_id
	}

	fn is_active(&self) -> bool {
		!self.expired()
	}
}
