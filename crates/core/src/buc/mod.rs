use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ctx::Context;
use crate::err::Error;
use crate::iam::Id;

/// A named, organization scoped unit of storage.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
	pub id: Id,
	#[serde(rename = "orgID")]
	pub org_id: Id,
	pub name: String,
}

/// Identifies a single bucket, either by its ID or by its name within an
/// organization given by ID or by name.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BucketFilter {
	pub id: Option<Id>,
	pub name: Option<String>,
	pub org_id: Option<Id>,
	pub org: Option<String>,
}

impl BucketFilter {
	pub fn by_id(id: Id) -> Self {
		Self {
			id: Some(id),
			..Default::default()
		}
	}

	pub fn by_name(name: impl Into<String>, org_id: Id) -> Self {
		Self {
			name: Some(name.into()),
			org_id: Some(org_id),
			..Default::default()
		}
	}
}

impl fmt::Display for BucketFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut parts = Vec::with_capacity(4);
		if let Some(id) = &self.id {
			parts.push(format!("id: {id}"));
		}
		if let Some(name) = &self.name {
			parts.push(format!("name: {name:?}"));
		}
		if let Some(org_id) = &self.org_id {
			parts.push(format!("orgID: {org_id}"));
		}
		if let Some(org) = &self.org {
			parts.push(format!("org: {org:?}"));
		}
		write!(f, "{{{}}}", parts.join(", "))
	}
}

/// Resolves bucket references to buckets.
///
/// Lookups are unauthenticated; callers decide what the principal may do
/// with the bucket once it is resolved.
#[async_trait]
pub trait BucketService: Send + Sync {
	/// Find the single bucket matching the filter
	async fn find_bucket(&self, ctx: &Context, filter: &BucketFilter) -> Result<Bucket, Error>;
}
