use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Action, Id, Resource, ResourceType};

/// An action on a resource, or on a class of resources.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Permission {
	pub action: Action,
	pub resource: Resource,
}

impl Permission {
	/// A permission on every resource of a type in an organization
	pub fn new(action: Action, kind: ResourceType, org_id: Id) -> Self {
		Self {
			action,
			resource: Resource::in_org(kind, org_id),
		}
	}

	/// A permission on exactly one resource, owned by the given organization
	pub fn at_id(id: Id, action: Action, kind: ResourceType, org_id: Id) -> Self {
		Self {
			action,
			resource: Resource::at_id(kind, id, Some(org_id)),
		}
	}

	/// A permission on every resource of a type
	pub fn unscoped(action: Action, kind: ResourceType) -> Self {
		Self {
			action,
			resource: Resource::new(kind),
		}
	}

	/// Checks whether holding this permission satisfies the `required` one.
	///
	/// Actions and resource types must be equal. Beyond that an unscoped
	/// permission covers everything, an org-scoped permission covers any
	/// resource in the same organization, and an ID-scoped permission covers
	/// the resource with the same ID.
	pub fn matches(&self, required: &Permission) -> bool {
		if self.action != required.action {
			return false;
		}
		if self.resource.kind != required.resource.kind {
			return false;
		}
		if self.resource.is_unscoped() {
			return true;
		}
		if self.resource.is_org_scoped() && self.resource.org_id == required.resource.org_id {
			return true;
		}
		match (self.resource.id, required.resource.id) {
			(Some(held), Some(wanted)) => held == wanted,
			_ => false,
		}
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.action, self.resource)
	}
}
