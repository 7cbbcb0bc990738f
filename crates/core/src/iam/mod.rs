use thiserror::Error;

pub mod auth;
pub mod check;
pub mod entities;

pub use self::auth::*;
pub use self::check::evaluate;
pub use self::entities::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
	#[error("Invalid identifier '{0}'")]
	InvalidId(String),

	#[error("Invalid action '{0}'")]
	InvalidAction(String),

	#[error("Invalid resource type '{0}'")]
	InvalidResourceType(String),

	#[error("Permission failed for {identity}: {permission}")]
	NotAllowed {
		identity: String,
		permission: Permission,
	},
}

/// Checks whether the authorizer holds the required permission.
///
/// A denial carries the identity of the principal and the permission that was
/// required, so that callers can record an audit trail of the decision.
pub fn authorize(auth: &dyn Authorizer, permission: &Permission) -> Result<(), Error> {
	if auth.allowed(permission) {
		return Ok(());
	}
	let err = Error::NotAllowed {
		identity: auth.identity(),
		permission: permission.clone(),
	};
	trace!("{}", err);
	Err(err)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn id(v: u64) -> Id {
		Id::new(v).unwrap()
	}

	#[test]
	fn authorize_reports_identity_and_permission() {
		let auth = Authorization::new(
			id(1),
			id(10),
			id(100),
			vec![Permission::new(Action::Read, ResourceType::Tasks, id(10))],
		);
		// Reading a task in the organization is allowed
		let read = Permission::at_id(id(5), Action::Read, ResourceType::Tasks, id(10));
		assert!(authorize(&auth, &read).is_ok());
		// Writing it is not, and the denial names both sides
		let write = Permission::at_id(id(5), Action::Write, ResourceType::Tasks, id(10));
		let Err(Error::NotAllowed {
			identity,
			permission,
		}) = authorize(&auth, &write)
		else {
			panic!("expected a permission failure");
		};
		assert_eq!(identity, "authorization:0000000000000001");
		assert_eq!(permission, write);
	}
}
