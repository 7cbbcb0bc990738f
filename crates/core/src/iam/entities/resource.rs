use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Id;
use crate::iam::Error;

#[derive(Hash, Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ResourceType {
	Authorizations,
	Buckets,
	Dashboards,
	Documents,
	Labels,
	Orgs,
	Scrapers,
	Secrets,
	Sources,
	Tasks,
	Telegrafs,
	Users,
	Variables,
	Views,
}

impl ResourceType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Authorizations => "authorizations",
			Self::Buckets => "buckets",
			Self::Dashboards => "dashboards",
			Self::Documents => "documents",
			Self::Labels => "labels",
			Self::Orgs => "orgs",
			Self::Scrapers => "scrapers",
			Self::Secrets => "secrets",
			Self::Sources => "sources",
			Self::Tasks => "tasks",
			Self::Telegrafs => "telegrafs",
			Self::Users => "users",
			Self::Variables => "variables",
			Self::Views => "views",
		}
	}
}

impl fmt::Display for ResourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ResourceType {
	type Err = Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"authorizations" => Ok(Self::Authorizations),
			"buckets" => Ok(Self::Buckets),
			"dashboards" => Ok(Self::Dashboards),
			"documents" => Ok(Self::Documents),
			"labels" => Ok(Self::Labels),
			"orgs" => Ok(Self::Orgs),
			"scrapers" => Ok(Self::Scrapers),
			"secrets" => Ok(Self::Secrets),
			"sources" => Ok(Self::Sources),
			"tasks" => Ok(Self::Tasks),
			"telegrafs" => Ok(Self::Telegrafs),
			"users" => Ok(Self::Users),
			"variables" => Ok(Self::Variables),
			"views" => Ok(Self::Views),
			_ => Err(Error::InvalidResourceType(s.to_owned())),
		}
	}
}

/// A resource, or a class of resources, that a permission applies to.
///
/// Without an `id` or an `org_id` the resource stands for every resource of
/// its type. With only an `org_id` it stands for every resource of its type
/// within that organization. With an `id` it stands for exactly one resource.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Resource {
	#[serde(rename = "type")]
	pub kind: ResourceType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<Id>,
	#[serde(rename = "orgID", default, skip_serializing_if = "Option::is_none")]
	pub org_id: Option<Id>,
}

impl Resource {
	pub fn new(kind: ResourceType) -> Self {
		Self {
			kind,
			id: None,
			org_id: None,
		}
	}

	pub fn in_org(kind: ResourceType, org_id: Id) -> Self {
		Self {
			kind,
			id: None,
			org_id: Some(org_id),
		}
	}

	pub fn at_id(kind: ResourceType, id: Id, org_id: Option<Id>) -> Self {
		Self {
			kind,
			id: Some(id),
			org_id,
		}
	}

	/// Check if this resource covers every resource of its type
	pub fn is_unscoped(&self) -> bool {
		self.id.is_none() && self.org_id.is_none()
	}

	/// Check if this resource covers every resource of its type in one organization
	pub fn is_org_scoped(&self) -> bool {
		self.id.is_none() && self.org_id.is_some()
	}
}

impl fmt::Display for Resource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (&self.org_id, &self.id) {
			(Some(org), Some(id)) => write!(f, "orgs/{org}/{}/{id}", self.kind),
			(Some(org), None) => write!(f, "orgs/{org}/{}", self.kind),
			(None, Some(id)) => write!(f, "{}/{id}", self.kind),
			(None, None) => write!(f, "{}", self.kind),
		}
	}
}
